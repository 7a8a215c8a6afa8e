use crate::db::Database;
use crate::ideas::{Idea, IdeaStatus, Theme, DEFAULT_CATEGORY, NOTIFY_ON};
use crate::session::{PersistedRoot, Session, SessionError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use uuid::Uuid;

const ALL_CATEGORIES: &str = "all";

/// Form values for creating or editing an idea.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub status: IdeaStatus,
    pub category: Option<String>,
    /// New image as a data URL. `None` keeps the current one on edit.
    pub image: Option<String>,
    pub date: Option<String>,
    pub notify: bool,
}

impl IdeaDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            notify: true,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.title.trim().is_empty() {
            return Err(SessionError::Precondition("title is required".to_string()));
        }
        Ok(())
    }

    fn category(&self) -> String {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string()
    }

    fn date(&self) -> Option<String> {
        self.date
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn notify_flag(&self) -> String {
        if self.notify {
            NOTIFY_ON.to_string()
        } else {
            "false".to_string()
        }
    }

    fn into_idea(self, id: String, created_at: String) -> Idea {
        Idea {
            id,
            title: self.title.trim().to_string(),
            category: self.category(),
            date: self.date(),
            notify: Some(self.notify_flag()),
            description: self.description,
            status: self.status,
            image: self.image,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_CATEGORIES) {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    pub fn matches(&self, idea: &Idea) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => &idea.category == category,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub progress: usize,
    pub paused: usize,
}

pub fn status_counts<'a>(ideas: impl IntoIterator<Item = &'a Idea>) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for idea in ideas {
        match idea.status {
            IdeaStatus::Progress => counts.progress += 1,
            IdeaStatus::Paused => counts.paused += 1,
        }
    }
    counts
}

/// Picks an id above every numeric id on the board and no lower than `now`.
///
/// When the highest id is already `u64::MAX` the first unused number from
/// `now` on is taken instead.
pub fn next_idea_id(ideas: &[Idea], now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis().max(0) as u64;
    let highest = ideas
        .iter()
        .filter_map(|idea| idea.id.parse::<u64>().ok())
        .max();
    match highest {
        Some(highest) if highest >= now_ms => match highest.checked_add(1) {
            Some(next) => next.to_string(),
            None => unused_id(ideas, now_ms),
        },
        _ => now_ms.to_string(),
    }
}

fn unused_id(ideas: &[Idea], from: u64) -> String {
    let taken: HashSet<&str> = ideas.iter().map(|idea| idea.id.as_str()).collect();
    (from..=u64::MAX)
        .map(|candidate| candidate.to_string())
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn not_found(id: &str) -> SessionError {
    SessionError::Precondition(format!("idea {id} not found"))
}

impl Session {
    pub fn idea(&self, id: &str) -> Option<&Idea> {
        self.ideas.iter().find(|idea| idea.id == id)
    }

    pub fn add_idea(&mut self, draft: IdeaDraft, now: DateTime<Utc>) -> Result<&Idea, SessionError> {
        draft.validate()?;
        let id = next_idea_id(&self.ideas, now);
        self.ideas.push(draft.into_idea(id, timestamp(now)));
        let index = self.ideas.len() - 1;
        Ok(&self.ideas[index])
    }

    /// Rewrites an idea from `draft`, keeping its id, creation time and, when
    /// the draft carries none, its image.
    pub fn update_idea(&mut self, id: &str, draft: IdeaDraft) -> Result<&Idea, SessionError> {
        draft.validate()?;
        let index = self
            .ideas
            .iter()
            .position(|idea| idea.id == id)
            .ok_or_else(|| not_found(id))?;

        let existing = &self.ideas[index];
        let image = draft.image.clone().or_else(|| existing.image.clone());
        let mut updated = draft.into_idea(existing.id.clone(), existing.created_at.clone());
        updated.image = image;
        self.ideas[index] = updated;
        Ok(&self.ideas[index])
    }

    pub fn delete_idea(&mut self, id: &str) -> Result<Idea, SessionError> {
        let index = self
            .ideas
            .iter()
            .position(|idea| idea.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.ideas.remove(index))
    }

    pub fn toggle_status(&mut self, id: &str) -> Result<IdeaStatus, SessionError> {
        let idea = self
            .ideas
            .iter_mut()
            .find(|idea| idea.id == id)
            .ok_or_else(|| not_found(id))?;
        idea.status = idea.status.toggled();
        Ok(idea.status)
    }

    pub fn set_notify(&mut self, id: &str, enabled: bool) -> Result<(), SessionError> {
        let idea = self
            .ideas
            .iter_mut()
            .find(|idea| idea.id == id)
            .ok_or_else(|| not_found(id))?;
        idea.notify = Some(if enabled { NOTIFY_ON } else { "false" }.to_string());
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn filtered_ideas(&self, filter: &CategoryFilter) -> Vec<&Idea> {
        self.ideas.iter().filter(|idea| filter.matches(idea)).collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for idea in &self.ideas {
            if !seen.contains(&idea.category.as_str()) {
                seen.push(idea.category.as_str());
            }
        }
        seen
    }
}

/// Appends an idea straight to the stored board without a running session.
///
/// Used by the quick-add entry point. Protected and unreadable roots are
/// refused and left exactly as stored.
pub fn append_idea_to_store(
    db: &Database,
    draft: IdeaDraft,
    now: DateTime<Utc>,
) -> Result<Idea, SessionError> {
    draft.validate()?;
    let (mut ideas, theme) = match db.read_board_root()? {
        None => (Vec::new(), Theme::default()),
        Some(document) => match PersistedRoot::parse(&document)? {
            PersistedRoot::Normal { ideas, theme } => (ideas, theme),
            PersistedRoot::Protected { .. } => {
                return Err(SessionError::Precondition(
                    "board is password protected; open it to add ideas".to_string(),
                ))
            }
        },
    };

    let id = next_idea_id(&ideas, now);
    let idea = draft.into_idea(id, timestamp(now));
    ideas.push(idea.clone());
    let root = PersistedRoot::Normal { ideas, theme };
    db.write_board_root(&root.to_document()?)?;
    tracing::info!(id = %idea.id, "appended idea to stored board");
    Ok(idea)
}
