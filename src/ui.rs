//! Terminal front-end for the inventory: a catalog screen listing every book
//! and an editor screen for adding, changing, and deleting one. Both talk to
//! the catalog only through `BookProvider`.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
