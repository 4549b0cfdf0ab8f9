//! Core library surface for the book inventory: the identifier contract, the
//! SQLite-backed store, the provider that routes CRUD calls between them, and
//! the terminal front-end built on top.
pub mod config;
pub mod contract;
pub mod db;
pub mod logging;
pub mod models;
pub mod provider;
pub mod ui;

pub use config::Config;
pub use contract::{BookUri, Column};
pub use db::BookStore;
pub use models::{Book, BookValues, ValidationError};
pub use provider::{BookProvider, ErrorKind, ProviderError};
pub use ui::{run_app, App};
