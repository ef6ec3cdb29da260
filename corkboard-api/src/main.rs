//! # Corkboard API Server
//!
//! The HTTP entry point for Corkboard, a collaborative Kanban backend.
//! It serves:
//! - Session authentication (login, logout, password change)
//! - Membership management on lists and cards
//! - Public-access token management and anonymous board resolution
//! - The projects index
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p corkboard-api
//! ```

use corkboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use corkboard_shared::{db::pool, realtime::Broadcaster};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Corkboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db = pool::create_pool(config.database_config()).await?;

    let broadcaster = Broadcaster::new(&config.redis.url)?;

    let bind_address = config.bind_address();
    let state = AppState::new(db, config, broadcaster);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
