pub mod ddl;
pub mod models;
pub mod query;
pub mod schema;

pub use query::Database;

use schema::{Schema, SchemaError, SCHEMA};
use sqlx::{postgres::PgPoolOptions, PgConnection, PgExecutor, PgPool};
use std::collections::HashSet;

use crate::types::DatabaseConfig;

#[derive(Clone)]
pub struct DatabaseConnection {
    pub pool: PgPool,
    pub log_queries: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection was already attempted (state: {0:?})")]
    AlreadyAttempted(ConnectionState),

    #[error("Error connecting to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to run database migrations: {0}")]
    Migrate(#[source] sqlx::Error),

    #[error("Failed to verify database schema: {0}")]
    Verify(#[source] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Connected,
    Failed(String),
}

/// Makes exactly one connection attempt. Retrying means building a new
/// connector.
pub struct Connector {
    config: DatabaseConfig,
    state: ConnectionState,
}

impl Connector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Uninitialized,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub async fn connect(&mut self) -> Result<DatabaseConnection, Error> {
        if self.state != ConnectionState::Uninitialized {
            return Err(Error::AlreadyAttempted(self.state.clone()));
        }

        self.state = ConnectionState::Connecting;
        tracing::debug!(
            max_connections = self.config.max_connections,
            "Connecting to database"
        );

        match PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.connect_timeout)
            .connect(self.config.url.as_str())
            .await
        {
            Ok(pool) => {
                self.state = ConnectionState::Connected;
                tracing::info!("Connected to database");
                Ok(DatabaseConnection {
                    pool,
                    log_queries: self.config.log_queries,
                })
            }
            Err(err) => {
                tracing::error!("Error connecting to database: {}", err);
                self.state = ConnectionState::Failed(err.to_string());
                Err(Error::Connect(err))
            }
        }
    }
}

pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, Error> {
    Connector::new(config.clone()).connect().await
}

/// Creates every table that does not exist yet, parents first, on the given
/// connection. Runs inside whatever transaction the caller holds.
pub async fn apply_schema(conn: &mut PgConnection) -> Result<(), Error> {
    for statement in ddl::render_schema(&SCHEMA)? {
        sqlx::query(&statement)
            .execute(&mut *conn)
            .await
            .map_err(|err| {
                tracing::error!("Failed to apply schema statement: {}\n{}", err, statement);
                Error::Migrate(err)
            })?;
    }

    Ok(())
}

pub async fn migrate(db_conn: &DatabaseConnection) -> Result<(), Error> {
    let mut tx = db_conn.pool.begin().await.map_err(|err| {
        tracing::error!("Failed to start transaction: {}", err);
        Error::Migrate(err)
    })?;

    apply_schema(&mut tx).await?;

    tx.commit().await.map_err(|err| {
        tracing::error!("Failed to commit transaction: {}", err);
        Error::Migrate(err)
    })?;

    tracing::info!("Database schema is up to date");
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub missing_tables: Vec<String>,
    pub missing_columns: Vec<String>,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.missing_tables.is_empty() && self.missing_columns.is_empty()
    }
}

fn compare(schema: &Schema, existing: &[(String, String)]) -> VerifyReport {
    let tables: HashSet<&str> = existing.iter().map(|(t, _)| t.as_str()).collect();
    let columns: HashSet<(&str, &str)> = existing
        .iter()
        .map(|(t, c)| (t.as_str(), c.as_str()))
        .collect();

    let mut report = VerifyReport::default();
    for table in schema.tables {
        if !tables.contains(table.name) {
            report.missing_tables.push(table.name.to_string());
            continue;
        }
        for column in table.columns {
            if !columns.contains(&(table.name, column.name)) {
                report
                    .missing_columns
                    .push(format!("{}.{}", table.name, column.name));
            }
        }
    }

    report
}

/// Compares the live database against the descriptors.
pub async fn verify<'e, E: PgExecutor<'e>>(e: E) -> Result<VerifyReport, Error> {
    let existing: Vec<(String, String)> = sqlx::query_as(
        "
        SELECT table_name::text, column_name::text
        FROM information_schema.columns
        WHERE table_schema = current_schema()
        ",
    )
    .fetch_all(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while reading information_schema: {}", err);
        Error::Verify(err)
    })?;

    Ok(compare(&SCHEMA, &existing))
}
