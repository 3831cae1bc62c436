//! SQLite persistence and command-line report for the recall review core.

pub mod config;
pub mod db;
pub mod report;

use std::sync::Arc;

use anyhow::Context;
use recall_core::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StoreConfig;
use crate::db::SqliteStore;

pub use db::DbError;

/// Load the configured store and print due cards per deck.
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StoreConfig::from_env();
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    tracing::info!(
        path = %config.db_path.display(),
        namespace = %config.namespace,
        "Opening store..."
    );
    let store = SqliteStore::open(&config.db_path, config.namespace.as_str())
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let repo = store.load_repository(Arc::new(SystemClock))?;

    let now = repo.now();
    for line in report::due_report(&repo, now)? {
        println!("{line}");
    }
    let loose = report::unassigned_due(&repo, now);
    if loose > 0 {
        println!("(no deck): {loose} due");
    }
    Ok(())
}
