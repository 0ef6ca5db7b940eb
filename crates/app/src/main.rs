use std::{sync::Arc, time::Duration};

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "caravan={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no [server] section configured, nothing to run");
        return Ok(());
    };

    let fees = engine::FeePolicy::new(
        settings.fees.platform_fee_bps,
        settings.fees.operator_fee_bps,
    )?;
    let db = parse_database(&server.database).await?;
    let engine = Arc::new(
        engine::Engine::builder()
            .database(db.clone())
            .fee_policy(fees)
            .build()
            .await?,
    );

    let mut tasks = tokio::task::JoinSet::new();

    let sweeper = Arc::clone(&engine);
    let interval = Duration::from_secs(settings.sweep.interval_secs.max(1));
    let listing_ttl = settings
        .sweep
        .listing_ttl()
        .ok_or("sweep.listing_ttl_secs is out of range")?;
    tasks.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = sweeper.sweep(chrono::Utc::now(), listing_ttl).await {
                tracing::error!("sweep failed: {err}");
            }
        }
    });

    tasks.spawn(async move {
        tracing::info!("Found server settings...");
        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        server::run(engine, db, &bind, server.port).await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
