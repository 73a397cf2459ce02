use std::sync::Arc;

use botcrawler::config::Config;
use botcrawler::crawler::Crawler;
use botcrawler::db::Database;
use botcrawler::metrics;
use botcrawler::notify::Notifier;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    metrics::register_metrics();
    let notifier = Arc::new(Notifier::from_config(&config.notify));

    let db = match Database::connect(&config.database.url, config.database.max_connections).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            notifier.notify(&format!("Error initializing database: {e}")).await;
            std::process::exit(1);
        }
    };
    notifier.notify("Successfully connected to the database!").await;

    match db.run_migrations(&config.migrations.folder).await {
        Ok(files) => {
            for file in files {
                notifier
                    .notify(&format!("Executed migration file: {}", file.display()))
                    .await;
            }
            notifier.notify("All migrations executed successfully.").await;
        }
        Err(e) => {
            notifier.notify(&format!("SQL migration error: {e}")).await;
            db.close().await;
            std::process::exit(1);
        }
    }

    match db.count_players().await {
        Ok(n) => notifier.notify(&format!("Tracking {n} known players.")).await,
        Err(e) => notifier.notify(&format!("Error counting known players: {e}")).await,
    }

    let crawler = match Crawler::new(&config, db.clone(), notifier.clone()) {
        Ok(c) => c,
        Err(e) => {
            notifier.notify(&format!("Invalid configuration: {e}")).await;
            db.close().await;
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = crawler.run() => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
        }
    }

    db.close().await;
    notifier.notify("Database connection closed.").await;
}
