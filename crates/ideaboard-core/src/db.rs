use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Key of the single slot that holds the persisted board root.
pub const BOARD_KEY: &str = "ideaBoardData";

pub struct Database {
    conn: Connection,
}

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "init",
    up: "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER DEFAULT (strftime('%s','now'))
        );",
}];

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA synchronous = NORMAL;
     PRAGMA temp_store = MEMORY;
     PRAGMA busy_timeout = 5000;";

impl Database {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(PRAGMAS)?;
        Ok(Self { conn })
    }

    pub fn new_in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(PRAGMAS)?;
        Ok(Self { conn })
    }

    pub fn latest_migration_version() -> i64 {
        MIGRATIONS
            .iter()
            .map(|migration| migration.version)
            .max()
            .unwrap_or(0)
    }

    pub fn current_schema_version(&self) -> rusqlite::Result<i64> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
            [],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(0);
        }
        self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
    }

    pub fn run_migrations(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT DEFAULT CURRENT_TIMESTAMP
            );",
        )?;

        let current_version = self.current_schema_version()?;

        for migration in MIGRATIONS {
            if migration.version > current_version {
                let tx = self.conn.unchecked_transaction()?;
                tx.execute_batch(migration.up)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )?;
                tx.commit()?;
                tracing::debug!(version = migration.version, name = migration.name, "applied migration");
            }
        }

        Ok(())
    }

    pub fn get_kv(&self, key: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
    }

    /// Replaces the whole value stored under `key`.
    pub fn set_kv(&self, key: &str, value: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = strftime('%s','now')",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn read_board_root(&self) -> rusqlite::Result<Option<String>> {
        self.get_kv(BOARD_KEY)
    }

    pub fn write_board_root(&self, document: &str) -> rusqlite::Result<()> {
        self.set_kv(BOARD_KEY, document)
    }
}

#[cfg(test)]
mod tests {
    use super::{Database, BOARD_KEY};
    use tempfile::tempdir;

    fn setup_db() -> Database {
        let db = Database::new_in_memory().expect("db init");
        db.run_migrations().expect("migrations");
        db
    }

    fn table_exists(db: &Database, name: &str) -> bool {
        db.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_row| Ok(1),
            )
            .is_ok()
    }

    #[test]
    fn migrations_create_schema() {
        let db = setup_db();
        assert!(table_exists(&db, "kv"));
        assert!(table_exists(&db, "schema_migrations"));
        assert_eq!(
            db.current_schema_version().expect("version"),
            Database::latest_migration_version()
        );
    }

    #[test]
    fn migrations_are_idempotent() {
        let db = setup_db();
        db.run_migrations().expect("second run");
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn fresh_database_reports_version_zero() {
        let db = Database::new_in_memory().expect("db init");
        assert_eq!(db.current_schema_version().expect("version"), 0);
    }

    #[test]
    fn kv_set_overwrites_previous_value() {
        let db = setup_db();
        assert_eq!(db.get_kv("theme").expect("get"), None);

        db.set_kv("theme", "dark").expect("set");
        db.set_kv("theme", "light").expect("overwrite");
        assert_eq!(db.get_kv("theme").expect("get").as_deref(), Some("light"));
    }

    #[test]
    fn board_root_lives_under_fixed_key() {
        let db = setup_db();
        db.write_board_root("{\"ideas\":[]}").expect("write");
        assert_eq!(
            db.get_kv(BOARD_KEY).expect("get").as_deref(),
            Some("{\"ideas\":[]}")
        );
        assert_eq!(
            db.read_board_root().expect("read").as_deref(),
            Some("{\"ideas\":[]}")
        );
    }

    #[test]
    fn file_database_persists_across_connections() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("ideaboard.db");
        {
            let db = Database::open(&path).expect("open");
            db.run_migrations().expect("migrations");
            db.write_board_root("{\"theme\":\"light\"}").expect("write");
        }
        let db = Database::open(&path).expect("reopen");
        db.run_migrations().expect("migrations");
        assert_eq!(
            db.read_board_root().expect("read").as_deref(),
            Some("{\"theme\":\"light\"}")
        );
    }
}
