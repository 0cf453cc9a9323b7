use crate::Result;
use rusqlite::Connection;
use std::path::Path;

/// A SQLite connection with the Linkdeck schema applied.
///
/// `Storage` owns the raw connection; all domain logic lives in
/// [`Library`](crate::Library). Foreign keys are enabled on every
/// connection so that deleting a parent row cascades through the hierarchy
/// and the tag join table.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Creates (or opens) a database file at `path` and applies the schema.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens an existing database file and validates that it is a Linkdeck store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LinkdeckError::InvalidDatabase`] if the expected
    /// tables are missing, or [`crate::LinkdeckError::Database`] for any
    /// SQLite failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('users', 'workspaces', 'folders', 'groups', 'bookmarks', 'tags')",
            [],
            |row| row.get(0),
        )?;

        if table_count != 6 {
            return Err(crate::LinkdeckError::InvalidDatabase(
                "Not a valid Linkdeck database".to_string(),
            ));
        }

        Self::init(conn)
    }

    /// Opens an in-memory database. Used by tests and the demo tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
