use crate::config::{default_data_dir, AppConfig, ConfigError};
use crate::db::Database;
use crate::reminders::SchedulerError;
use crate::session::SessionError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "ideaboard.db";
const BACKUP_PREFIX: &str = "ideaboard-";
const BACKUPS_KEPT: usize = 3;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Db(rusqlite::Error),
    Io(std::io::Error),
    Session(SessionError),
    Scheduler(SchedulerError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
            Self::Session(err) => write!(f, "{err}"),
            Self::Scheduler(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

/// Picks the data directory: env override, then config, then platform default.
pub fn resolve_data_dir(
    config: &AppConfig,
    env_override: Option<PathBuf>,
) -> Result<PathBuf, AppError> {
    if let Some(dir) = env_override.filter(|dir| !dir.as_os_str().is_empty()) {
        return Ok(dir);
    }
    if let Some(dir) = config.data_dir.clone() {
        return Ok(dir);
    }
    Ok(default_data_dir()?)
}

pub fn open_board_database(data_dir: &Path) -> Result<Database, AppError> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join(DB_FILE_NAME);
    let db = Database::open(&db_path)?;
    backup_before_migration(data_dir, &db_path, &db)?;
    db.run_migrations()?;
    Ok(db)
}

pub fn backup_before_migration(
    data_dir: &Path,
    db_path: &Path,
    db: &Database,
) -> Result<Option<PathBuf>, AppError> {
    backup_before_migration_at(data_dir, db_path, db, Utc::now())
}

/// Copies an existing database aside before a pending migration runs.
/// A brand new database has nothing worth keeping.
pub fn backup_before_migration_at(
    data_dir: &Path,
    db_path: &Path,
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, AppError> {
    let current_version = db.current_schema_version()?;
    let latest_version = Database::latest_migration_version();
    if current_version == 0 || current_version >= latest_version {
        return Ok(None);
    }

    let backup_dir = data_dir.join("backups");
    std::fs::create_dir_all(&backup_dir)?;
    let stamp = now.format("%Y%m%d%H%M%S").to_string();
    let backup_path = backup_dir.join(format!("{BACKUP_PREFIX}{stamp}.db"));
    std::fs::copy(db_path, &backup_path)?;
    tracing::info!(path = %backup_path.display(), "backed up database before migration");
    rotate_backups(&backup_dir, BACKUPS_KEPT)?;
    Ok(Some(backup_path))
}

pub fn rotate_backups(backup_dir: &Path, keep: usize) -> Result<(), AppError> {
    let mut backups: Vec<PathBuf> = std::fs::read_dir(backup_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy())
                .is_some_and(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(".db"))
        })
        .collect();

    if backups.len() <= keep {
        return Ok(());
    }

    // Stamps sort lexically in time order.
    backups.sort();
    for path in backups.iter().take(backups.len() - keep) {
        std::fs::remove_file(path)?;
    }

    Ok(())
}
