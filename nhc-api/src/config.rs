/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8443)
/// - `APP_ENV`: `prod`, `test` or `dev` (default: prod)
/// - `CORS_ORIGINS`: Comma separated allowed origins, `*` for any
/// - `SITE_URL`: Public site used in e-mail links
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for session tokens (required, at least 32 characters)
/// - `FACEBOOK_SECRET`, `GOOGLE_SECRET`: OAuth2 client secrets
/// - `FACEBOOK_GRAPH_URL`, `GOOGLE_TOKEN_URL`, `GOOGLE_USERINFO_URL`: Provider endpoints
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM`: Mail relay;
///   without `SMTP_HOST` mail is only logged
/// - `MAIL_QUEUE_CAPACITY`, `MAIL_MAX_RETRIES`, `MAIL_BULK_DELAY_MS`: Delivery queue tuning
/// - `MAIL_DRAIN_TIMEOUT_SECS`: Longest wait for queued mail at shutdown (default: 30)
/// - `PROFANITY_URL`: Profanity filter service; disabled when unset
/// - `APP_INIT`: Reload seed data on startup (default: false)
/// - `APP_DIR`: Directory holding the seed files (default: /etc/nhc-api/)
/// - `RUST_LOG`, `LOG_FORMAT`: Log filter and `json` output
///
/// # Example
///
/// ```no_run
/// use nhc_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use nhc_shared::identity::{facebook, google};
use nhc_shared::mail::dispatcher::DispatcherConfig;
use nhc_shared::mail::smtp::{SmtpConfig, DEFAULT_FROM};
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Identity provider configuration
    pub oauth: OAuthConfig,

    /// Outgoing mail configuration
    pub mail: MailConfig,

    /// Profanity filter service, disabled when `None`
    pub profanity_url: Option<String>,

    /// Seed data configuration
    pub seed: SeedConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Test,
    Development,
}

impl Environment {
    /// HSTS and strict defaults apply in production only
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    fn default_site_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://www.nutritionhabitchallenge.com",
            Environment::Test => "https://test.nutritionhabitchallenge.com",
            Environment::Development => "http://localhost:8081",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            "dev" => Ok(Environment::Development),
            other => anyhow::bail!("APP_ENV must be one of prod, test or dev, got {:?}", other),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Production => "prod",
            Environment::Test => "test",
            Environment::Development => "dev",
        })
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    pub environment: Environment,

    /// Allowed CORS origins, `*` allows any
    pub cors_origins: Vec<String>,

    /// Public site URL used in e-mail links
    pub site_url: String,
}

/// Origins allowed when `CORS_ORIGINS` is not set
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:8081",
    "https://nutritionhabitchallenge.com",
    "https://www.nutritionhabitchallenge.com",
    "https://test.nutritionhabitchallenge.com",
];

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for session token signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig").field("secret", &"<redacted>").finish()
    }
}

/// Identity provider configuration
#[derive(Clone)]
pub struct OAuthConfig {
    pub facebook_secret: String,
    pub google_secret: String,
    pub facebook_graph_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("facebook_graph_url", &self.facebook_graph_url)
            .field("google_token_url", &self.google_token_url)
            .field("google_userinfo_url", &self.google_userinfo_url)
            .finish_non_exhaustive()
    }
}

/// Outgoing mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP relay, `None` logs mail instead of sending it
    pub smtp: Option<SmtpConfig>,

    pub dispatcher: DispatcherConfig,
}

/// Seed data configuration
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Reload organizations, commitments and globals on startup
    pub initialize: bool,

    /// Directory holding `organizations.json` and `commitments.json`
    pub app_dir: PathBuf,
}

/// Reads variables through `lookup`, treating empty values as unset
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn get_or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, name: &str) -> anyhow::Result<String> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
    }

    fn parse_or<T>(&self, name: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(name) {
            Some(value) => value
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value {:?}", name, value)),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str) -> anyhow::Result<bool> {
        match self.get(name).as_deref() {
            None => Ok(false),
            Some("1") | Some("true") | Some("yes") => Ok(true),
            Some("0") | Some("false") | Some("no") => Ok(false),
            Some(other) => anyhow::bail!("{} must be a boolean, got {:?}", name, other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let environment: Environment = vars.get_or("APP_ENV", "prod").parse()?;

        let cors_origins = match vars.get("CORS_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let api = ApiConfig {
            host: vars.get_or("API_HOST", "0.0.0.0"),
            port: vars.parse_or("API_PORT", 8443u16)?,
            environment,
            cors_origins,
            site_url: vars.get_or("SITE_URL", environment.default_site_url()),
        };

        let database = DatabaseConfig {
            url: vars.require("DATABASE_URL")?,
            max_connections: vars.parse_or("DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let jwt_secret = vars.require("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let oauth = OAuthConfig {
            facebook_secret: vars.get_or("FACEBOOK_SECRET", ""),
            google_secret: vars.get_or("GOOGLE_SECRET", ""),
            facebook_graph_url: vars.get_or("FACEBOOK_GRAPH_URL", facebook::GRAPH_URL),
            google_token_url: vars.get_or("GOOGLE_TOKEN_URL", google::TOKEN_URL),
            google_userinfo_url: vars.get_or("GOOGLE_USERINFO_URL", google::USERINFO_URL),
        };

        let smtp = match vars.get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: vars.parse_or("SMTP_PORT", 25u16)?,
                username: vars.get("SMTP_USERNAME"),
                password: vars.get("SMTP_PASSWORD"),
                from: vars.get_or("MAIL_FROM", DEFAULT_FROM),
            }),
            None => None,
        };

        let defaults = DispatcherConfig::default();
        let mail = MailConfig {
            smtp,
            dispatcher: DispatcherConfig {
                queue_capacity: vars.parse_or("MAIL_QUEUE_CAPACITY", defaults.queue_capacity)?,
                max_attempts: vars.parse_or("MAIL_MAX_RETRIES", defaults.max_attempts)?,
                bulk_delay: Duration::from_millis(vars.parse_or("MAIL_BULK_DELAY_MS", 250u64)?),
                drain_timeout: Duration::from_secs(vars.parse_or("MAIL_DRAIN_TIMEOUT_SECS", 30u64)?),
                ..defaults
            },
        };

        let seed = SeedConfig {
            initialize: vars.flag("APP_INIT")?,
            app_dir: PathBuf::from(vars.get_or("APP_DIR", "/etc/nhc-api/")),
        };

        Ok(Self {
            api,
            database,
            jwt: JwtConfig { secret: jwt_secret },
            oauth,
            mail,
            profanity_url: vars.get("PROFANITY_URL"),
            seed,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
