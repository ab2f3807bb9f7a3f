/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use bouwdesk_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = bouwdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```
use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use bouwdesk_shared::auth::middleware::{create_api_key_middleware, create_jwt_middleware};
use bouwdesk_shared::billing::processor::{
    HttpPaymentProcessor, NoopProcessor, PaymentProcessor,
};
use bouwdesk_shared::gateway::rate_limit::{MemoryCounterStore, RateLimiter};
use bouwdesk_shared::quota::QuotaEnforcer;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request by Axum's `State` extractor; everything inside is
/// either a pool handle or an Arc, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub quota: Arc<QuotaEnforcer>,
    pub processor: Arc<dyn PaymentProcessor>,
}

impl AppState {
    /// Creates application state with in-process rate limit counters
    ///
    /// Production setups pass a Redis-backed limiter via
    /// [`AppState::with_rate_limiter`] instead.
    pub fn new(db: PgPool, config: Config) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(Arc::new(MemoryCounterStore::new())));
        Self::with_rate_limiter(db, config, rate_limiter)
    }

    pub fn with_rate_limiter(db: PgPool, config: Config, rate_limiter: Arc<RateLimiter>) -> Self {
        let processor: Arc<dyn PaymentProcessor> = match &config.billing.api_key {
            Some(api_key) => Arc::new(HttpPaymentProcessor::new(
                config.billing.api_url.clone(),
                api_key.clone(),
                config.billing.webhook_secret.clone().unwrap_or_default(),
            )),
            None => Arc::new(NoopProcessor),
        };

        Self {
            quota: Arc::new(QuotaEnforcer::new(db.clone())),
            db,
            config: Arc::new(config),
            rate_limiter,
            processor,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router
///
/// # Route map
///
/// ```text
/// /
/// ├── /health                       # public, no rate limit
/// ├── /stripe/webhook               # signature-guarded, no rate limit
/// └── /v1/
///     ├── /auth/                    # register/login/refresh public,
///     │                             # logout-all/change-password JWT
///     ├── /users/                   # JWT
///     ├── /projects/                # JWT; team/tasks/documents/
///     │                             # calculations nested per project
///     ├── /billing/                 # plans public, rest JWT
///     ├── /api-keys/                # JWT, company admin
///     ├── /usage/                   # JWT
///     └── /api/                     # X-Api-Key, read-only
/// ```
///
/// # Middleware
///
/// Authenticated groups run auth first and rate limiting second, so the
/// limiter sees the actor and its plan. Request logging, tracing, CORS
/// and security headers wrap everything.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let jwt_auth = axum::middleware::from_fn(create_jwt_middleware(state.jwt_secret().to_string()));
    let api_key_auth = axum::middleware::from_fn(create_api_key_middleware(state.db.clone()));
    let rate_limit = axum::middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::rate_limit::rate_limit_layer,
    );

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let webhook_routes = Router::new().route("/stripe/webhook", post(routes::webhooks::handle));

    // Token issuance cannot require a token.
    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout));

    let protected_auth_routes = Router::new()
        .route("/logout-all", post(routes::auth::logout_all))
        .route("/change-password", post(routes::auth::change_password))
        .layer(rate_limit.clone())
        .layer(jwt_auth.clone());

    let user_routes = Router::new()
        .route("/me", get(routes::users::me).patch(routes::users::update_me))
        .route("/", get(routes::users::list))
        .route("/:id", delete(routes::users::deactivate))
        .route("/:id/role", patch(routes::users::update_role))
        .route("/:id/activate", post(routes::users::activate))
        .layer(rate_limit.clone())
        .layer(jwt_auth.clone());

    let project_routes = Router::new()
        .route("/", post(routes::projects::create).get(routes::projects::list))
        .route(
            "/:id",
            get(routes::projects::get)
                .patch(routes::projects::update)
                .delete(routes::projects::delete),
        )
        .route("/:id/archive", post(routes::projects::archive))
        .route("/:id/complete", post(routes::projects::complete))
        .route("/:id/stats", get(routes::projects::stats))
        .route("/:id/team", get(routes::team::list).post(routes::team::add))
        .route(
            "/:id/team/:member_id",
            patch(routes::team::update_role).delete(routes::team::remove),
        )
        .route(
            "/:id/tasks",
            get(routes::tasks::list).post(routes::tasks::create),
        )
        .route(
            "/:id/tasks/:task_id",
            patch(routes::tasks::update).delete(routes::tasks::delete),
        )
        .route(
            "/:id/documents",
            get(routes::documents::list).post(routes::documents::create),
        )
        .route(
            "/:id/documents/:document_id",
            get(routes::documents::get).delete(routes::documents::delete),
        )
        .route(
            "/:id/calculations",
            get(routes::calculations::list).post(routes::calculations::create),
        )
        .route(
            "/:id/calculations/:calculation_id",
            get(routes::calculations::get).delete(routes::calculations::delete),
        )
        .layer(rate_limit.clone())
        .layer(jwt_auth.clone());

    let billing_public_routes = Router::new().route("/plans", get(routes::billing::plans));

    let billing_routes = Router::new()
        .route(
            "/subscription",
            get(routes::billing::get_subscription)
                .post(routes::billing::change_plan)
                .delete(routes::billing::cancel_subscription),
        )
        .layer(rate_limit.clone())
        .layer(jwt_auth.clone());

    let api_key_routes = Router::new()
        .route(
            "/",
            post(routes::api_keys::create).get(routes::api_keys::list),
        )
        .route("/:id", delete(routes::api_keys::revoke))
        .layer(rate_limit.clone())
        .layer(jwt_auth.clone());

    let usage_routes = Router::new()
        .route("/quota", get(routes::usage::quota))
        .route("/metrics", get(routes::usage::metrics))
        .layer(rate_limit.clone())
        .layer(jwt_auth);

    // Programmatic surface: API key auth instead of JWT. Per-key minute
    // overrides apply inside the rate limiter.
    let programmatic_routes = Router::new()
        .route("/projects", get(routes::api::list_projects))
        .route("/projects/:id", get(routes::api::get_project))
        .route("/projects/:id/documents", get(routes::api::list_documents))
        .layer(rate_limit)
        .layer(api_key_auth);

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/billing", billing_public_routes.merge(billing_routes))
        .nest("/api-keys", api_key_routes)
        .nest("/usage", usage_routes)
        .nest("/api", programmatic_routes);

    let cors = build_cors(&state.config);

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .nest("/v1", v1_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::analytics::request_log_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn build_cors(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
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
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
