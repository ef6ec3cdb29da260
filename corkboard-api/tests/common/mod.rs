/// Common test utilities for integration tests
///
/// The context builds the full router with a lazy database pool and an
/// unconnected broadcaster, so tests can exercise routing, middleware,
/// and credential rejection without external services. Handlers that
/// would touch the database are only driven down paths that fail before
/// the first query.

use corkboard_api::app::{build_router, AppState};
use corkboard_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, RedisConfig};
use corkboard_shared::realtime::Broadcaster;
use sqlx::PgPool;

/// Test context wrapping a fully-built router
pub struct TestContext {
    pub app: axum::Router,
}

impl TestContext {
    /// Builds an app against unreachable backends
    pub fn new() -> anyhow::Result<Self> {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost:1/corkboard_test".to_string(),
                max_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:1".to_string(),
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                internal_access_token: None,
            },
        };

        let db = PgPool::connect_lazy(&config.database.url)?;
        let broadcaster = Broadcaster::new(&config.redis.url)?;
        let state = AppState::new(db, config, broadcaster);

        Ok(TestContext {
            app: build_router(state),
        })
    }
}
