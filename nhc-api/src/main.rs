//! # NHC API Server
//!
//! Backend for the Nutrition Habit Challenge: accounts, challenge
//! registration, daily scorecards and campaign administration.
//!
//! ## Startup
//!
//! 1. Configuration from the environment (and `.env`)
//! 2. Database pool and migrations
//! 3. Initial data when `APP_INIT` is set, then the integrity check
//! 4. Mail dispatcher (SMTP when `SMTP_HOST` is set, otherwise logged)
//! 5. HTTP server until SIGINT or SIGTERM
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... JWT_SECRET=... cargo run -p nhc-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines and `RUST_LOG` to adjust levels.

use nhc_api::{
    app::{build_router, AppState},
    config::Config,
};
use nhc_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
        seed,
    },
    mail::{
        dispatcher::MailDispatcher,
        smtp::SmtpMailer,
        LogMailer, Mailer,
    },
    models::globals::{Globals, GlobalsCache},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nhc_api=debug,nhc_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("NHC API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(
        environment = ?config.api.environment,
        site_url = %config.api.site_url,
        "Configuration loaded"
    );

    let pool = create_pool(DatabaseConfig::from_url(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;
    run_migrations(&pool).await?;

    if config.seed.initialize {
        seed::initialize(&pool, &config.seed.app_dir).await?;
    }

    let globals = Globals::load(&pool).await?;
    seed::check_integrity(&pool, globals.length_days()).await?;
    let globals = GlobalsCache::new(globals);

    let mailer: Arc<dyn Mailer> = match &config.mail.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Sending mail through SMTP");
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };
    let (dispatcher, mail_worker) = MailDispatcher::start(mailer, config.mail.dispatcher.clone());

    let address = config.bind_address();
    let state = AppState::new(pool.clone(), config, globals, dispatcher.clone())?;
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain queued mail before the pool goes away
    dispatcher.shutdown_and_drain(mail_worker).await;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
