use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

/// Owner of the SQLite connection backing the catalog. The store is opened
/// once at start-up and handed to the provider; there is no global instance.
#[derive(Debug)]
pub struct BookStore {
    conn: Connection,
}

impl BookStore {
    /// Ensure the database file exists, create the `books` table if needed,
    /// and return the live store. A failure here leaves the application
    /// without storage, so callers are expected to abort start-up with it.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }

        let conn = Connection::open(path).context("failed to open SQLite database")?;
        debug!(path = %path.display(), "opened book database");
        Self::with_schema(conn)
    }

    /// Same schema on a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS books (
                _id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                price INTEGER NOT NULL,
                quantity INTEGER,
                supplier_name TEXT NOT NULL,
                supplier_phone_number TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create books table")?;

        Ok(Self { conn })
    }

    /// Handle for queries.
    pub fn readable(&self) -> &Connection {
        &self.conn
    }

    /// Handle for inserts, updates and deletes. SQLite serializes writers on
    /// the one connection, so this is the same handle as `readable`.
    pub fn writable(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, reporting anything SQLite refuses to flush.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| err)
            .context("failed to close SQLite database")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(store: &BookStore) -> Vec<(String, bool)> {
        let mut stmt = store
            .readable()
            .prepare("SELECT name, \"notnull\" FROM pragma_table_info('books') ORDER BY cid")
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? == 1)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn creates_the_books_table() {
        let store = BookStore::open_in_memory().unwrap();
        assert_eq!(
            column_names(&store),
            vec![
                ("_id".to_string(), false),
                ("title".to_string(), true),
                ("author".to_string(), true),
                ("price".to_string(), true),
                ("quantity".to_string(), false),
                ("supplier_name".to_string(), true),
                ("supplier_phone_number".to_string(), true),
            ]
        );
    }

    #[test]
    fn reopening_keeps_existing_rows() {
        let dir = std::env::temp_dir().join(format!("book-inventory-{}", std::process::id()));
        let path = dir.join("nested").join("books.sqlite");
        let _ = fs::remove_dir_all(&dir);

        let store = BookStore::open(&path).unwrap();
        store
            .writable()
            .execute(
                "INSERT INTO books (title, author, price, supplier_name, supplier_phone_number)
                 VALUES ('Matilda', 'Roald Dahl', 12, 'Puffin', '555')",
                [],
            )
            .unwrap();
        store.close().unwrap();

        let reopened = BookStore::open(&path).unwrap();
        let count: i64 = reopened
            .readable()
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        reopened.close().unwrap();
        let _ = fs::remove_dir_all(&dir);
    }
}
