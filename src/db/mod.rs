use rusqlite::{Connection, Result};
use std::path::{Path, PathBuf};

pub mod attempt;

pub const DB_FILE_NAME: &str = "hackquiz.db";

pub fn get_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

pub fn init_db(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir).ok();

    let conn = Connection::open(get_db_path(data_dir))?;

    run_migrations(&conn)?;

    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quiz_id TEXT NOT NULL,
            quiz_title TEXT NOT NULL,
            started_at INTEGER,
            finished_at INTEGER NOT NULL,
            answered INTEGER NOT NULL,
            questions_total INTEGER NOT NULL,
            outcome TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attempts_finished ON attempts(finished_at)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn open_test_db(dir: &Path) -> Connection {
    let conn = Connection::open(dir.join("test.db")).unwrap();
    run_migrations(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_directory_and_tables() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("nested").join("data");
        let conn = init_db(&data_dir).unwrap();
        assert!(get_db_path(&data_dir).exists());

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(tables.contains(&"attempts".to_string()));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let conn = open_test_db(temp_dir.path());
        run_migrations(&conn).unwrap();
        drop(conn);
        init_db(temp_dir.path()).unwrap();
    }
}
