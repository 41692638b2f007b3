mod handlers;
mod routes;

use std::env;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use handlers::AppState;
use storage::repository::Stores;
use storage::{NotionConfig, NotionStore};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

fn init_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("app=info,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Pick the store backend from the environment. Without remote-store
/// credentials the server still runs against the in-memory backend,
/// which is enough for local development.
fn select_stores() -> Stores {
    match NotionConfig::from_env() {
        Some(config) => {
            info!(flashcards_db = %config.flashcards_db, "using remote document store");
            NotionStore::new(config).into_stores()
        }
        None => {
            warn!("NOTION_TOKEN not set; falling back to in-memory store");
            Stores::in_memory()
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let bind_addr = env::var("STUDY_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
    let state = AppState::new(select_stores());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
