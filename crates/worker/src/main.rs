//! Directory notification worker.
//!
//! Reads newline-delimited JSON directory events from stdin (as emitted by
//! the directory watcher) and mails the resulting notifications.

use std::sync::Arc;

use anyhow::Context;
use dirnotify_core::config::NotifierConfig;
use dirnotify_events::templates::TEMPLATE_NAMES;
use dirnotify_events::{DirectoryEvent, EventBus, Notifier, PgDirectoryStore, SmtpConfig, SmtpMailer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dirnotify_worker=debug,dirnotify_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = NotifierConfig::from_env().context("Invalid notifier configuration")?;
    tracing::info!(
        deployment = %config.deployment_name,
        initial_sync = config.initial_sync,
        whitelist = config.whitelist.len(),
        "Loaded notifier configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = dirnotify_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    dirnotify_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    dirnotify_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Mail ---
    let smtp = SmtpConfig::from_env().context("SMTP_HOST must be set")?;
    let mailer = SmtpMailer::new(&smtp).context("Failed to build SMTP transport")?;
    tracing::info!(host = %smtp.smtp_host, port = smtp.smtp_port, "SMTP transport configured");

    // --- Notifier ---
    let notifier = Arc::new(Notifier::new(config, PgDirectoryStore::new(pool), mailer));
    notifier
        .templates()
        .verify(TEMPLATE_NAMES)
        .context("Template check failed")?;
    tracing::info!(dir = %notifier.templates().dir().display(), "Templates loaded");

    let bus = EventBus::default();
    let run_handle = tokio::spawn(Arc::clone(&notifier).run(bus.subscribe()));

    // --- Event intake ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<DirectoryEvent>(line) {
            Ok(event) => bus.publish(event),
            Err(e) => tracing::warn!(error = %e, "Skipping malformed event"),
        }
    }

    tracing::info!("Input closed, waiting for pending notifications");
    drop(bus);
    run_handle.await.context("Notifier task panicked")?;
    Ok(())
}
