use crate::crypto::{self, CryptoError};
use crate::db::Database;
use crate::envelope;
use crate::ideas::{Idea, Theme};
use serde::{Deserialize, Serialize};
use std::fmt;

/// File name offered for a share export.
pub const EXPORT_FILE_NAME: &str = "tablero_grupales.lock";

const LOAD_PROMPT: &str = "Protected board. Enter the password to restore the session:";
const EXPORT_PROMPT: &str = "Choose a password for the shared file:";
const IMPORT_PROMPT: &str = "Enter the password for the shared file:";

#[derive(Debug)]
pub enum SessionError {
    Format(String),
    Authentication,
    Precondition(String),
    Encrypt,
    Store(rusqlite::Error),
}

impl From<CryptoError> for SessionError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Format(message) => Self::Format(message),
            CryptoError::Authentication => Self::Authentication,
            CryptoError::Encrypt => Self::Encrypt,
        }
    }
}

impl From<rusqlite::Error> for SessionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(message) => write!(f, "corrupt data: {message}"),
            Self::Authentication => f.write_str("incorrect password or corrupted file"),
            Self::Precondition(message) => f.write_str(message),
            Self::Encrypt => f.write_str("encryption failed"),
            Self::Store(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Source of passwords. `None` or an empty answer means the user dismissed it.
pub trait PasswordPrompt {
    fn ask(&mut self, message: &str) -> Option<String>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn ask(&mut self, message: &str) -> Option<String> {
        self(message)
    }
}

/// Password of a Shared-Protected session. Only ever held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionPassword(String);

impl SessionPassword {
    pub fn from_input(input: Option<String>) -> Option<Self> {
        input.filter(|value| !value.is_empty()).map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionPassword(<redacted>)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Normal,
    SharedProtected,
}

/// What the store holds under the board key.
#[derive(Clone, Debug, PartialEq)]
pub enum PersistedRoot {
    Normal { ideas: Vec<Idea>, theme: Theme },
    Protected { theme: Theme, envelope: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRoot {
    #[serde(default)]
    ideas: Option<Vec<Idea>>,
    #[serde(default)]
    theme: Option<String>,
    #[serde(default)]
    is_shared_session: Option<bool>,
    #[serde(default)]
    encrypted_data: Option<String>,
}

#[derive(Serialize)]
struct NormalDocument<'a> {
    ideas: &'a [Idea],
    theme: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedDocument<'a> {
    theme: &'a str,
    is_shared_session: bool,
    encrypted_data: &'a str,
}

impl PersistedRoot {
    /// Decodes a stored document, choosing the variant from `isSharedSession`.
    pub fn parse(document: &str) -> Result<Self, SessionError> {
        let raw: RawRoot = serde_json::from_str(document)?;
        let theme = raw.theme.as_deref().map(Theme::parse).unwrap_or_default();
        match (raw.is_shared_session, raw.encrypted_data) {
            (Some(true), Some(envelope)) => Ok(Self::Protected { theme, envelope }),
            _ => Ok(Self::Normal {
                ideas: raw.ideas.unwrap_or_default(),
                theme,
            }),
        }
    }

    pub fn to_document(&self) -> Result<String, SessionError> {
        let document = match self {
            Self::Normal { ideas, theme } => serde_json::to_string(&NormalDocument {
                ideas,
                theme: theme.as_str(),
            })?,
            Self::Protected { theme, envelope } => serde_json::to_string(&ProtectedDocument {
                theme: theme.as_str(),
                is_shared_session: true,
                encrypted_data: envelope,
            })?,
        };
        Ok(document)
    }

    pub fn theme(&self) -> Theme {
        match self {
            Self::Normal { theme, .. } | Self::Protected { theme, .. } => *theme,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet.
    Fresh,
    /// Plain board restored.
    Restored,
    /// Protected board unsealed with the entered password.
    Unsealed,
    /// Password prompt dismissed; board left empty and locked.
    Cancelled,
    /// Wrong password (or tampered data); board left empty and locked.
    Rejected,
    /// Stored document or envelope could not be read; the board is left
    /// empty and will not overwrite what is stored.
    Corrupt(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Locked or unreadable board: nothing written.
    Skipped,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    Sealed { envelope: String, count: usize },
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { count: usize },
    Cancelled,
}

/// The working board: ideas, theme and how it must be persisted.
#[derive(Debug)]
pub struct Session {
    pub(crate) ideas: Vec<Idea>,
    pub(crate) theme: Theme,
    mode: SessionMode,
    password: Option<SessionPassword>,
    unreadable: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_ideas(Vec::new(), Theme::default())
    }

    pub fn with_ideas(ideas: Vec<Idea>, theme: Theme) -> Self {
        Self {
            ideas,
            theme,
            mode: SessionMode::Normal,
            password: None,
            unreadable: false,
        }
    }

    fn locked(theme: Theme) -> Self {
        Self {
            ideas: Vec::new(),
            theme,
            mode: SessionMode::SharedProtected,
            password: None,
            unreadable: false,
        }
    }

    fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::new()
        }
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_protected(&self) -> bool {
        self.mode == SessionMode::SharedProtected
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// False for a locked protected board and for one whose stored root
    /// could not be read. Saves from such a session are skipped.
    pub fn is_writable(&self) -> bool {
        !self.unreadable && !(self.is_protected() && self.password.is_none())
    }

    /// Restores the board stored in `db`, asking for a password if it is sealed.
    ///
    /// Never fails: unreadable or unsealable data yields an empty, read-only
    /// board and the reason is reported in the outcome.
    pub fn load(db: &Database, prompt: &mut dyn PasswordPrompt) -> (Self, LoadOutcome) {
        let document = match db.read_board_root() {
            Ok(Some(document)) => document,
            Ok(None) => return (Self::new(), LoadOutcome::Fresh),
            Err(err) => {
                tracing::error!(error = %err, "failed to read board root");
                return (Self::unreadable(), LoadOutcome::Corrupt(err.to_string()));
            }
        };

        let root = match PersistedRoot::parse(&document) {
            Ok(root) => root,
            Err(err) => {
                tracing::error!(error = %err, "stored board is not readable");
                return (Self::unreadable(), LoadOutcome::Corrupt(err.to_string()));
            }
        };

        match root {
            PersistedRoot::Normal { ideas, theme } => {
                tracing::debug!(ideas = ideas.len(), "restored board");
                (Self::with_ideas(ideas, theme), LoadOutcome::Restored)
            }
            PersistedRoot::Protected { theme, envelope: sealed } => {
                Self::unlock(theme, &sealed, prompt)
            }
        }
    }

    fn unlock(
        theme: Theme,
        sealed: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> (Self, LoadOutcome) {
        let Some(password) = SessionPassword::from_input(prompt.ask(LOAD_PROMPT)) else {
            tracing::info!("password prompt dismissed; protected board stays locked");
            return (Self::locked(theme), LoadOutcome::Cancelled);
        };

        match crypto::unseal::<Vec<Idea>>(sealed, password.expose()) {
            Ok(ideas) => {
                tracing::info!(
                    ideas = ideas.len(),
                    fingerprint = %envelope::fingerprint(sealed),
                    "unsealed protected board"
                );
                let session = Self {
                    ideas,
                    theme,
                    mode: SessionMode::SharedProtected,
                    password: Some(password),
                    unreadable: false,
                };
                (session, LoadOutcome::Unsealed)
            }
            Err(CryptoError::Authentication) => {
                tracing::warn!("incorrect password for protected board");
                (Self::locked(theme), LoadOutcome::Rejected)
            }
            Err(err) => {
                tracing::error!(error = %err, "protected board is corrupt");
                (Self::locked(theme), LoadOutcome::Corrupt(err.to_string()))
            }
        }
    }

    /// The root this session would write right now, if any.
    pub fn to_root(&self) -> Result<Option<PersistedRoot>, SessionError> {
        if self.unreadable {
            return Ok(None);
        }
        match self.mode {
            SessionMode::Normal => Ok(Some(PersistedRoot::Normal {
                ideas: self.ideas.clone(),
                theme: self.theme,
            })),
            SessionMode::SharedProtected => {
                let Some(password) = self.password.as_ref() else {
                    return Ok(None);
                };
                let envelope = crypto::seal(&self.ideas, password.expose())?;
                Ok(Some(PersistedRoot::Protected {
                    theme: self.theme,
                    envelope,
                }))
            }
        }
    }

    pub fn try_save(&self, db: &Database) -> Result<SaveOutcome, SessionError> {
        let Some(root) = self.to_root()? else {
            return Ok(SaveOutcome::Skipped);
        };
        db.write_board_root(&root.to_document()?)?;
        Ok(SaveOutcome::Written)
    }

    /// Persists the whole board, overwriting the stored root.
    ///
    /// Failures are logged and reported; the in-memory board stays as is.
    pub fn save(&self, db: &Database) -> SaveOutcome {
        match self.try_save(db) {
            Ok(SaveOutcome::Skipped) => {
                tracing::warn!("board is locked or unreadable; save skipped");
                SaveOutcome::Skipped
            }
            Ok(outcome) => {
                tracing::debug!(ideas = self.ideas.len(), mode = ?self.mode, "saved board");
                outcome
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to save board");
                SaveOutcome::Failed(err.to_string())
            }
        }
    }

    /// Ideas a share export would carry.
    pub fn shared_ideas(&self) -> Vec<Idea> {
        self.ideas
            .iter()
            .filter(|idea| idea.is_shared())
            .cloned()
            .collect()
    }

    /// Seals the shared-category ideas under a newly prompted password.
    ///
    /// Leaves the session mode untouched.
    pub fn export_shared(
        &self,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<ExportOutcome, SessionError> {
        let shared = self.shared_ideas();
        if shared.is_empty() {
            return Err(SessionError::Precondition(format!(
                "no ideas in the \"{}\" category",
                crate::ideas::SHARED_CATEGORY
            )));
        }

        let Some(password) = SessionPassword::from_input(prompt.ask(EXPORT_PROMPT)) else {
            return Ok(ExportOutcome::Cancelled);
        };

        let sealed = crypto::seal(&shared, password.expose())?;
        tracing::info!(
            ideas = shared.len(),
            fingerprint = %envelope::fingerprint(&sealed),
            "sealed shared ideas"
        );
        Ok(ExportOutcome::Sealed {
            envelope: sealed,
            count: shared.len(),
        })
    }

    /// Replaces the board with the ideas sealed in `envelope_text` and turns
    /// the session Shared-Protected under the entered password.
    ///
    /// On any failure the current board is left untouched.
    pub fn import_shared(
        &mut self,
        envelope_text: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<ImportOutcome, SessionError> {
        envelope::decode(envelope_text).map_err(|err| SessionError::Format(err.to_string()))?;

        let Some(password) = SessionPassword::from_input(prompt.ask(IMPORT_PROMPT)) else {
            return Ok(ImportOutcome::Cancelled);
        };

        let ideas: Vec<Idea> = crypto::unseal(envelope_text, password.expose())?;
        let count = ideas.len();
        tracing::info!(
            ideas = count,
            fingerprint = %envelope::fingerprint(envelope_text),
            "imported shared board"
        );

        self.ideas = ideas;
        self.mode = SessionMode::SharedProtected;
        self.password = Some(password);
        self.unreadable = false;
        Ok(ImportOutcome::Imported { count })
    }
}
