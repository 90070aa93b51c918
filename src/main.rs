use std::env;

use tracing::info;

use group_warden::{AppContext, DocumentStore, Error, commands, lifecycle, logging};

/// Default document path when GROUP_WARDEN_DB is unset.
const DEFAULT_DB_PATH: &str = "data/db.json";

async fn async_main() -> Result<(), Error> {
    // Initialize logging
    logging::init()?;

    let db_path = env::var("GROUP_WARDEN_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let store = DocumentStore::open(db_path).await?;

    let ctx = AppContext::new(store);
    lifecycle::register(&ctx);
    commands::register_all(&ctx);

    info!("Engine running, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    // Commit any coalesced state before exiting
    ctx.store.flush().await?;
    info!("Shutdown complete");
    Ok(())
}

fn main() {
    // Run the async main function
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async_main());

    // Handle any errors that occurred during execution
    if let Err(err) = result {
        eprintln!("Error: {err}");
    }
}
