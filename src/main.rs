// Pavilion entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config (copying defaults/ into config/ on first run)
// 3. Open the SQLite store/registry scoped to the active season
// 4. Build the router and serve

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use pavilion::config;
use pavilion::db::SqliteStore;
use pavilion::server::{self, AppState, StaffCredentials};
use pavilion::store::{DrawRegistry, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Pavilion starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: season={}, db={}, port={}",
        config.season, config.db_path, config.server_port
    );

    let store = Arc::new(
        SqliteStore::open(&config.db_path, &config.season)
            .context("failed to open database")?,
    );
    info!("Database opened at {}", config.db_path);

    let auth = match (
        config.credentials.auction_username,
        config.credentials.auction_password,
    ) {
        (Some(username), Some(password)) => Some(StaffCredentials { username, password }),
        _ => {
            info!("No staff credentials configured; auction login will reject all attempts");
            None
        }
    };

    let record_store: Arc<dyn RecordStore> = store.clone();
    let registry: Arc<dyn DrawRegistry> = store;
    let state = Arc::new(AppState {
        store: record_store,
        registry,
        auth,
    });

    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pavilion=info,warn")),
        )
        .with_target(true)
        .init();
}
