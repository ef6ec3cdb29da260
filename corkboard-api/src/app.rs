/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use corkboard_api::{app::AppState, config::Config};
/// use corkboard_shared::realtime::Broadcaster;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let broadcaster = Broadcaster::new(&config.redis.url)?;
/// let state = AppState::new(pool, config, broadcaster);
/// let app = corkboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use corkboard_shared::auth::resolver::ResolverConfig;
use corkboard_shared::realtime::Broadcaster;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Realtime event publisher
    pub broadcaster: Broadcaster,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, broadcaster: Broadcaster) -> Self {
        Self {
            db,
            config: Arc::new(config),
            broadcaster,
        }
    }

    /// Gets the token-signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Configuration slice the identity resolver needs
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            token_secret: self.config.jwt.secret.clone(),
            internal_access_token: self.config.jwt.internal_access_token.clone(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// └── /api/
///     ├── POST   /access-tokens            # Login (public)
///     ├── DELETE /access-tokens/me         # Logout
///     ├── POST   /users/me/password        # Password change
///     ├── GET    /projects                 # Accessible projects
///     ├── POST   /lists/:listId/memberships
///     ├── PATCH  /list-memberships/:id
///     ├── DELETE /list-memberships/:id
///     ├── POST   /cards/:cardId/memberships
///     ├── PATCH  /card-memberships/:id
///     ├── DELETE /card-memberships/:id
///     ├── POST/GET/DELETE /boards/:boardId/public-token
///     ├── POST/GET/DELETE /lists/:listId/public-token
///     ├── POST/GET/DELETE /cards/:cardId/public-token
///     ├── GET    /public/:token            # Anonymous resolution
///     └── PATCH  /public/:token/tasks/:taskId
/// ```
///
/// # Middleware Stack
///
/// The identity-resolution layer wraps every `/api` route, including the
/// public ones (so an anonymous viewer with a stray cookie doesn't error);
/// individual handlers opt in to authentication via the `CurrentUser`
/// extractor.
pub fn build_router(state: AppState) -> Router {
    use crate::middleware::current_user::current_user_layer;
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/access-tokens", post(routes::auth::login))
        .route("/access-tokens/me", delete(routes::auth::logout))
        .route("/users/me/password", post(routes::auth::update_password));

    let project_routes = Router::new().route("/projects", get(routes::projects::index));

    let list_membership_routes = Router::new()
        .route(
            "/lists/:list_id/memberships",
            post(routes::list_memberships::create),
        )
        .route(
            "/list-memberships/:id",
            patch(routes::list_memberships::update).delete(routes::list_memberships::destroy),
        );

    let card_membership_routes = Router::new()
        .route(
            "/cards/:card_id/memberships",
            post(routes::card_memberships::create),
        )
        .route(
            "/card-memberships/:id",
            patch(routes::card_memberships::update).delete(routes::card_memberships::destroy),
        );

    let public_token_routes = Router::new()
        .route(
            "/boards/:board_id/public-token",
            post(routes::public_tokens::create_for_board)
                .get(routes::public_tokens::show_for_board)
                .delete(routes::public_tokens::delete_for_board),
        )
        .route(
            "/lists/:list_id/public-token",
            post(routes::public_tokens::create_for_list)
                .get(routes::public_tokens::show_for_list)
                .delete(routes::public_tokens::delete_for_list),
        )
        .route(
            "/cards/:card_id/public-token",
            post(routes::public_tokens::create_for_card)
                .get(routes::public_tokens::show_for_card)
                .delete(routes::public_tokens::delete_for_card),
        );

    // Anonymous resolution; no identity needed, the token is the credential
    let public_routes = Router::new()
        .route("/public/:token", get(routes::public::show))
        .route(
            "/public/:token/tasks/:task_id",
            patch(routes::public::update_task),
        );

    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(project_routes)
        .merge(list_membership_routes)
        .merge(card_membership_routes)
        .merge(public_token_routes)
        .merge(public_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            current_user_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::COOKIE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
