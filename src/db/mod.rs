//! Persistence module: the SQLite-backed store that owns the `books` table.

mod connection;

pub use connection::BookStore;
