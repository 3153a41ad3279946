use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rsvp_server::api::router;
use rsvp_server::config::Config;
use rsvp_server::{
    AppState, Clock, LogNotifier, Notifier, ReminderScheduler, RsvpRepository, RsvpService,
    SmtpNotifier, SqliteRepository, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting RSVP server {}", rsvp_server::get_service_version());

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    let policy = config.reminder_policy()?;

    let db_path = config.database_path();
    info!("Using state database: {}", db_path.display());
    let repo: Arc<dyn RsvpRepository> = Arc::new(
        SqliteRepository::new(&db_path).context("Failed to initialize SQLite database")?,
    );

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            info!("Sending email via {}:{} as {}", smtp.host, smtp.port, smtp.from);
            Arc::new(SmtpNotifier::new(smtp).context("Failed to configure SMTP")?)
        }
        None => {
            info!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let service = RsvpService::new(
        repo.clone(),
        notifier.clone(),
        clock.clone(),
        config.public_base_url.clone(),
    );
    let app_state = Arc::new(AppState::new(service));

    let scheduler = Arc::new(ReminderScheduler::new(
        repo,
        notifier,
        clock,
        policy,
        config.public_base_url.clone(),
        config.reminder_interval,
    ));
    let scheduler_handle = scheduler.start();

    let app = router(app_state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);
    info!("RSVP links point at {}", config.public_base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, waiting for reminder scheduler");
    scheduler_handle.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
