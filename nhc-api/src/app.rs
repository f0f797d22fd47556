/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use nhc_api::{app::AppState, config::Config};
/// use nhc_shared::mail::{LogMailer, dispatcher::MailDispatcher};
/// use nhc_shared::models::globals::{Globals, GlobalsCache};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let globals = GlobalsCache::new(Globals::load(&pool).await?);
/// let (mailer, _worker) = MailDispatcher::start(Arc::new(LogMailer), config.mail.dispatcher.clone());
///
/// let state = AppState::new(pool, config, globals, mailer)?;
/// let app = nhc_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use nhc_shared::{
    auth::middleware::create_session_middleware,
    identity::{facebook::FacebookProvider, google::GoogleProvider, IdentityProvider},
    mail::{dispatcher::MailDispatcher, templates::MailTemplates, OutgoingMail},
    models::globals::GlobalsCache,
    profanity::{DisabledProfanityFilter, HttpProfanityFilter, ProfanityFilter},
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Timeout for calls to identity providers and the profanity service
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is a handle, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// In-memory copy of the campaign settings
    pub globals: GlobalsCache,

    /// Background mail delivery
    pub mailer: MailDispatcher,

    pub templates: Arc<MailTemplates>,

    pub profanity: Arc<dyn ProfanityFilter>,

    pub facebook: Arc<dyn IdentityProvider>,

    pub google: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Creates application state with providers built from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built
    pub fn new(
        db: PgPool,
        config: Config,
        globals: GlobalsCache,
        mailer: MailDispatcher,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(OUTBOUND_TIMEOUT)
            .user_agent(concat!("nhc-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let profanity: Arc<dyn ProfanityFilter> = match &config.profanity_url {
            Some(url) => Arc::new(HttpProfanityFilter::new(client.clone(), url.clone())),
            None => Arc::new(DisabledProfanityFilter),
        };

        let oauth = &config.oauth;
        let facebook = Arc::new(FacebookProvider::new(
            client.clone(),
            oauth.facebook_graph_url.clone(),
            oauth.facebook_secret.clone(),
        ));
        let google = Arc::new(GoogleProvider::new(
            client,
            oauth.google_token_url.clone(),
            oauth.google_userinfo_url.clone(),
            oauth.google_secret.clone(),
        ));

        Ok(Self {
            db,
            templates: Arc::new(MailTemplates::new(config.api.site_url.clone())),
            config: Arc::new(config),
            globals,
            mailer,
            profanity,
            facebook,
            google,
        })
    }

    /// Replaces the profanity filter
    pub fn with_profanity_filter(mut self, filter: Arc<dyn ProfanityFilter>) -> Self {
        self.profanity = filter;
        self
    }

    /// Replaces the identity providers
    pub fn with_identity_providers(
        mut self,
        facebook: Arc<dyn IdentityProvider>,
        google: Arc<dyn IdentityProvider>,
    ) -> Self {
        self.facebook = facebook;
        self.google = google;
        self
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Queues a transactional e-mail
    ///
    /// Delivery problems never fail the request; a rejected job is logged.
    pub fn send_mail(&self, mail: OutgoingMail) {
        let to = mail.to.clone();
        if let Err(err) = self.mailer.send(mail) {
            tracing::error!(to = %to, error = %err, "Failed to queue e-mail");
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check
/// ├── /auth/                           # Accounts and sessions
/// │   ├── GET  /                       # Current user
/// │   ├── POST /login, /signup
/// │   ├── GET|POST /verify
/// │   ├── POST /facebook, /google
/// │   └── POST /password/forgot, /password/reset
/// └── /api/                            # Campaign
///     ├── /globals, /commitments, /organizations, /faq   (public)
///     ├── /registration, /user, /news, /bonus-question, /participant
///     └── /admin/...                   (role guarded)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. Session (resolves `Authorization: Bearer` into an `AuthContext`)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
///
/// Role checks happen in the handlers through `require_role`.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/signup", post(routes::auth::signup))
        .route(
            "/verify",
            post(routes::auth::verify).get(routes::auth::resend_verification),
        )
        .route("/facebook", post(routes::oauth::facebook))
        .route("/google", post(routes::oauth::google))
        .route("/password/forgot", post(routes::auth::forgot_password))
        .route("/password/reset", post(routes::auth::reset_password));

    let admin_routes = Router::new()
        .route(
            "/organizations",
            post(routes::organizations::create).put(routes::organizations::rename),
        )
        .route("/organizations/merge", post(routes::organizations::merge))
        .route("/organizations/:id", delete(routes::organizations::delete))
        .route(
            "/user",
            get(routes::users::list).put(routes::users::edit),
        )
        .route("/message", post(routes::messages::send))
        .route(
            "/news",
            get(routes::news::list_all).post(routes::news::create),
        )
        .route("/news/:id", delete(routes::news::delete))
        .route("/news/:id/publish", put(routes::news::publish))
        .route("/news/:id/unpublish", put(routes::news::unpublish))
        .route(
            "/bonus-question",
            get(routes::questions::list).post(routes::questions::create),
        )
        .route("/bonus-question/disable", put(routes::questions::disable))
        .route("/bonus-question/:id", delete(routes::questions::delete))
        .route("/bonus-question/:id/enable", put(routes::questions::enable))
        .route("/participant", get(routes::participants::list_registered))
        .route(
            "/faq",
            post(routes::faq::create).put(routes::faq::update),
        )
        .route("/faq/:id", delete(routes::faq::delete));

    let api_routes = Router::new()
        .route(
            "/globals",
            get(routes::globals::get_globals).post(routes::globals::update_globals),
        )
        .route("/commitments", get(routes::globals::list_commitments))
        .route("/organizations", get(routes::organizations::list))
        .route("/registration", post(routes::registration::register))
        .route("/user", put(routes::users::update_self))
        .route("/news", get(routes::news::list_published))
        .route(
            "/bonus-question",
            get(routes::questions::current).post(routes::questions::answer),
        )
        .route("/participant", get(routes::participants::list_own))
        .route("/participant/scorecard", put(routes::participants::update_scorecard))
        .route("/faq", get(routes::faq::list))
        .nest("/admin", admin_routes);

    let session = axum::middleware::from_fn(create_session_middleware(state.jwt_secret().to_owned()));
    let cors = cors_layer(&state.config.api.cors_origins);
    let production = state.config.api.environment.is_production();

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth", get(routes::auth::current))
        .route("/auth/", get(routes::auth::current))
        .nest("/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(session)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_origin_lists() {
        // Invalid header values are skipped rather than rejected
        let _ = cors_layer(&["https://nutritionhabitchallenge.com".to_string(), "\n".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }
}
