use restaurant_management::{
    types::{self, Config},
    utils::database,
};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    init_tracing();

    if let Err(err) = dotenv {
        tracing::debug!("No .env file loaded: {}", err);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let ctx = match types::bootstrap_with_retry(config).await {
        Ok(ctx) => ctx,
        Err(_) => return ExitCode::FAILURE,
    };

    let report = database::verify(&ctx.db.conn.pool).await;
    ctx.close().await;

    match report {
        Ok(report) if report.is_complete() => {
            tracing::info!(
                "Database is ready: {} tables present",
                database::schema::SCHEMA.tables.len()
            );
            ExitCode::SUCCESS
        }
        Ok(report) => {
            for table in &report.missing_tables {
                tracing::error!("Missing table {}", table);
            }
            for column in &report.missing_columns {
                tracing::error!("Missing column {}", column);
            }
            ExitCode::FAILURE
        }
        Err(_) => ExitCode::FAILURE,
    }
}
