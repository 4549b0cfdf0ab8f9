//! Binary entry point: load configuration, start logging, open the catalog
//! database, and drive the terminal UI until the user exits.
use anyhow::Result;
use book_inventory::{logging, run_app, App, BookProvider, BookStore, Config};
use tracing::info;

fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config)?;

    let store = BookStore::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "catalog opened");

    let mut app = App::new(BookProvider::new(store))?;
    let result = run_app(&mut app);

    app.into_provider().close()?;
    info!("catalog closed");
    result
}
