use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{
    error::ErrorKind,
    postgres::{PgRow, Postgres},
    FromRow, PgConnection, PgExecutor, QueryBuilder, Transaction,
};

use super::{
    ddl::quote_ident,
    schema::{ColumnType, Schema, Table, SCHEMA},
    DatabaseConnection,
};
use crate::utils::pagination::{Paginated, Pagination};

type Result<T> = std::result::Result<T, Error>;

/// Problems detected while composing a statement, before it reaches the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuery {
    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },

    #[error("Column {table}.{column} expects {expected}, got {got}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Column {table}.{column} must not be negative")]
    NegativeAmount { table: String, column: String },

    #[error("Nothing to write into {0}")]
    NothingToWrite(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Invalid(#[from] InvalidQuery),

    #[error("Foreign key violation ({constraint})")]
    ForeignKeyViolation { constraint: String },

    #[error("Unique violation ({constraint})")]
    UniqueViolation { constraint: String },

    #[error("Not null violation ({constraint})")]
    NotNullViolation { constraint: String },

    #[error("Unexpected database error: {0}")]
    Unexpected(sqlx::Error),
}

/// Translates a driver error into a typed variant where the failure is a
/// known constraint class.
pub fn translate(table: &str, err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        match db_err.kind() {
            ErrorKind::ForeignKeyViolation => return Error::ForeignKeyViolation { constraint },
            ErrorKind::UniqueViolation => return Error::UniqueViolation { constraint },
            ErrorKind::NotNullViolation => return Error::NotNullViolation { constraint },
            _ => (),
        }
    }

    tracing::error!("Error occurred while querying {}: {}", table, err);
    Error::Unexpected(err)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i32),
    Text(String),
    Boolean(bool),
    Decimal(BigDecimal),
    Date(NaiveDate),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => ColumnType::Integer.sql_name(),
            Value::Text(_) => ColumnType::Varchar.sql_name(),
            Value::Boolean(_) => ColumnType::Boolean.sql_name(),
            Value::Decimal(_) => ColumnType::Decimal.sql_name(),
            Value::Date(_) => ColumnType::Date.sql_name(),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Checks a value against the column descriptor, widening integers written
/// into decimal columns.
fn resolve(
    table: &'static Table,
    column: &str,
    value: Value,
) -> std::result::Result<(&'static str, ColumnType, Value), InvalidQuery> {
    let descriptor = table
        .columns
        .iter()
        .find(|c| c.name == column)
        .ok_or_else(|| InvalidQuery::UnknownColumn {
            table: table.name.to_string(),
            column: column.to_string(),
        })?;

    let value = match (descriptor.ty, value) {
        (ColumnType::Decimal, Value::Integer(v)) => Value::Decimal(BigDecimal::from(v)),
        (_, value) => value,
    };

    let accepted = matches!(
        (descriptor.ty, &value),
        (_, Value::Null)
            | (ColumnType::Integer, Value::Integer(_))
            | (ColumnType::Varchar, Value::Text(_))
            | (ColumnType::Boolean, Value::Boolean(_))
            | (ColumnType::Decimal, Value::Decimal(_))
            | (ColumnType::Date, Value::Date(_))
    );
    if !accepted {
        return Err(InvalidQuery::TypeMismatch {
            table: table.name.to_string(),
            column: column.to_string(),
            expected: descriptor.ty.sql_name(),
            got: value.kind(),
        });
    }

    // Every decimal column holds a price-family amount
    if let Value::Decimal(amount) = &value {
        if *amount < BigDecimal::from(0) {
            return Err(InvalidQuery::NegativeAmount {
                table: table.name.to_string(),
                column: column.to_string(),
            });
        }
    }

    Ok((descriptor.name, descriptor.ty, value))
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, ty: ColumnType, value: Value) {
    match value {
        Value::Null => match ty {
            ColumnType::Integer => qb.push_bind(None::<i32>),
            ColumnType::Varchar => qb.push_bind(None::<String>),
            ColumnType::Boolean => qb.push_bind(None::<bool>),
            ColumnType::Decimal => qb.push_bind(None::<BigDecimal>),
            ColumnType::Date => qb.push_bind(None::<NaiveDate>),
        },
        Value::Integer(v) => qb.push_bind(v),
        Value::Text(v) => qb.push_bind(v),
        Value::Boolean(v) => qb.push_bind(v),
        Value::Decimal(v) => qb.push_bind(v),
        Value::Date(v) => qb.push_bind(v),
    };
}

#[derive(Clone, Default)]
struct Filters {
    conditions: Vec<(&'static str, ColumnType, Value)>,
}

impl Filters {
    fn push(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        for (i, (column, ty, value)) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(quote_ident(column));
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                value => {
                    qb.push(" = ");
                    push_value(qb, *ty, value.clone());
                }
            }
        }
    }
}

fn log_statement(enabled: bool, table: &str, qb: &QueryBuilder<'static, Postgres>) {
    if enabled {
        tracing::debug!(table = table, "{}", qb.sql());
    }
}

fn has_column(table: &Table, name: &str) -> bool {
    table.column(name).is_some()
}

pub struct Insert {
    table: &'static Table,
    log: bool,
    values: Vec<(&'static str, ColumnType, Value)>,
    error: Option<InvalidQuery>,
}

impl Insert {
    fn new(table: &'static Table, log: bool) -> Self {
        Self {
            table,
            log,
            values: Vec::new(),
            error: None,
        }
    }

    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match resolve(self.table, column, value.into()) {
                Ok(resolved) => {
                    self.values.retain(|(name, _, _)| *name != resolved.0);
                    self.values.push(resolved);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    fn build(self) -> Result<QueryBuilder<'static, Postgres>> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        if self.values.is_empty() {
            return Err(InvalidQuery::NothingToWrite(self.table.name.to_string()).into());
        }

        let stamped: Vec<&'static str> = ["created_at", "updated_at"]
            .into_iter()
            .filter(|name| has_column(self.table, name))
            .filter(|name| !self.values.iter().any(|(c, _, _)| c == name))
            .collect();

        let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", quote_ident(self.table.name)));
        let names = self
            .values
            .iter()
            .map(|(name, _, _)| *name)
            .chain(stamped.iter().copied())
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        qb.push(names);
        qb.push(") VALUES (");

        let mut separated = false;
        for (_, ty, value) in self.values {
            if separated {
                qb.push(", ");
            }
            push_value(&mut qb, ty, value);
            separated = true;
        }
        for _ in stamped {
            qb.push(", CURRENT_DATE");
        }
        qb.push(")");

        Ok(qb)
    }

    pub fn to_sql(self) -> Result<String> {
        Ok(self.build()?.sql().to_string())
    }

    pub async fn execute<'e, E: PgExecutor<'e>>(self, e: E) -> Result<u64> {
        let (table, log) = (self.table.name, self.log);
        let mut qb = self.build()?;
        log_statement(log, table, &qb);

        qb.build()
            .execute(e)
            .await
            .map(|res| res.rows_affected())
            .map_err(|err| translate(table, err))
    }

    pub async fn returning<'e, T, E>(self, e: E) -> Result<T>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: PgExecutor<'e>,
    {
        let (table, log) = (self.table.name, self.log);
        let mut qb = self.build()?;
        qb.push(" RETURNING *");
        log_statement(log, table, &qb);

        qb.build_query_as::<T>()
            .fetch_one(e)
            .await
            .map_err(|err| translate(table, err))
    }
}

#[derive(Clone)]
pub struct Select {
    table: &'static Table,
    log: bool,
    filters: Filters,
    order_by: Vec<(&'static str, Direction)>,
    limit: Option<i64>,
    offset: Option<i64>,
    error: Option<InvalidQuery>,
}

impl Select {
    fn new(table: &'static Table, log: bool) -> Self {
        Self {
            table,
            log,
            filters: Filters::default(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            error: None,
        }
    }

    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match resolve(self.table, column, value.into()) {
                Ok(resolved) => self.filters.conditions.push(resolved),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        match self.table.column(column) {
            Some(descriptor) => self.order_by.push((descriptor.name, direction)),
            None if self.error.is_none() => {
                self.error = Some(InvalidQuery::UnknownColumn {
                    table: self.table.name.to_string(),
                    column: column.to_string(),
                })
            }
            None => (),
        }
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn paginate(self, pagination: &Pagination) -> Self {
        self.limit(pagination.per_page as i64)
            .offset(pagination.offset())
    }

    fn build(&self, projection: &str, paged: bool) -> Result<QueryBuilder<'static, Postgres>> {
        if let Some(err) = &self.error {
            return Err(err.clone().into());
        }

        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            projection,
            quote_ident(self.table.name)
        ));
        self.filters.push(&mut qb);

        if !paged {
            return Ok(qb);
        }

        if !self.order_by.is_empty() {
            qb.push(" ORDER BY ");
            qb.push(
                self.order_by
                    .iter()
                    .map(|(column, direction)| {
                        format!("{} {}", quote_ident(column), direction.sql())
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }
        if let Some(offset) = self.offset {
            qb.push(" OFFSET ");
            qb.push_bind(offset);
        }

        Ok(qb)
    }

    pub fn to_sql(&self) -> Result<String> {
        Ok(self.build("*", true)?.sql().to_string())
    }

    pub async fn fetch_all<'e, T, E>(self, e: E) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: PgExecutor<'e>,
    {
        let mut qb = self.build("*", true)?;
        log_statement(self.log, self.table.name, &qb);

        qb.build_query_as::<T>()
            .fetch_all(e)
            .await
            .map_err(|err| translate(self.table.name, err))
    }

    pub async fn fetch_optional<'e, T, E>(self, e: E) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        E: PgExecutor<'e>,
    {
        let mut qb = self.build("*", true)?;
        log_statement(self.log, self.table.name, &qb);

        qb.build_query_as::<T>()
            .fetch_optional(e)
            .await
            .map_err(|err| translate(self.table.name, err))
    }

    /// Counts the filtered rows, ignoring ordering and paging.
    pub async fn count<'e, E: PgExecutor<'e>>(self, e: E) -> Result<i64> {
        let mut qb = self.build("COUNT(*)", false)?;
        log_statement(self.log, self.table.name, &qb);

        qb.build_query_as::<(i64,)>()
            .fetch_one(e)
            .await
            .map(|(count,)| count)
            .map_err(|err| translate(self.table.name, err))
    }

    pub async fn fetch_page<T>(
        self,
        conn: &mut PgConnection,
        pagination: &Pagination,
    ) -> Result<Paginated<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let total = self.clone().count(&mut *conn).await?;
        let items = self.paginate(pagination).fetch_all(&mut *conn).await?;

        // COUNT(*) is never negative
        Ok(Paginated::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            pagination.page,
            pagination.per_page,
        ))
    }
}

pub struct Update {
    table: &'static Table,
    log: bool,
    assignments: Vec<(&'static str, ColumnType, Value)>,
    filters: Filters,
    error: Option<InvalidQuery>,
}

impl Update {
    fn new(table: &'static Table, log: bool) -> Self {
        Self {
            table,
            log,
            assignments: Vec::new(),
            filters: Filters::default(),
            error: None,
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match resolve(self.table, column, value.into()) {
                Ok(resolved) => {
                    self.assignments.retain(|(name, _, _)| *name != resolved.0);
                    self.assignments.push(resolved);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match resolve(self.table, column, value.into()) {
                Ok(resolved) => self.filters.conditions.push(resolved),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    fn build(self) -> Result<QueryBuilder<'static, Postgres>> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        if self.assignments.is_empty() {
            return Err(InvalidQuery::NothingToWrite(self.table.name.to_string()).into());
        }

        let touch = has_column(self.table, "updated_at")
            && !self.assignments.iter().any(|(c, _, _)| *c == "updated_at");

        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", quote_ident(self.table.name)));
        let mut separated = false;
        for (column, ty, value) in self.assignments {
            if separated {
                qb.push(", ");
            }
            qb.push(quote_ident(column));
            qb.push(" = ");
            push_value(&mut qb, ty, value);
            separated = true;
        }
        if touch {
            qb.push(", \"updated_at\" = CURRENT_DATE");
        }
        self.filters.push(&mut qb);

        Ok(qb)
    }

    pub fn to_sql(self) -> Result<String> {
        Ok(self.build()?.sql().to_string())
    }

    pub async fn execute<'e, E: PgExecutor<'e>>(self, e: E) -> Result<u64> {
        let (table, log) = (self.table.name, self.log);
        let mut qb = self.build()?;
        log_statement(log, table, &qb);

        qb.build()
            .execute(e)
            .await
            .map(|res| res.rows_affected())
            .map_err(|err| translate(table, err))
    }
}

pub struct Delete {
    table: &'static Table,
    log: bool,
    filters: Filters,
    error: Option<InvalidQuery>,
}

impl Delete {
    fn new(table: &'static Table, log: bool) -> Self {
        Self {
            table,
            log,
            filters: Filters::default(),
            error: None,
        }
    }

    pub fn filter(mut self, column: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none() {
            match resolve(self.table, column, value.into()) {
                Ok(resolved) => self.filters.conditions.push(resolved),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    fn build(self) -> Result<QueryBuilder<'static, Postgres>> {
        if let Some(err) = self.error {
            return Err(err.into());
        }

        let mut qb = QueryBuilder::new(format!("DELETE FROM {}", quote_ident(self.table.name)));
        self.filters.push(&mut qb);

        Ok(qb)
    }

    pub fn to_sql(self) -> Result<String> {
        Ok(self.build()?.sql().to_string())
    }

    pub async fn execute<'e, E: PgExecutor<'e>>(self, e: E) -> Result<u64> {
        let (table, log) = (self.table.name, self.log);
        let mut qb = self.build()?;
        log_statement(log, table, &qb);

        qb.build()
            .execute(e)
            .await
            .map(|res| res.rows_affected())
            .map_err(|err| translate(table, err))
    }
}

/// Query-builder handle bound to the restaurant schema.
#[derive(Clone)]
pub struct Database {
    pub conn: DatabaseConnection,
    pub schema: &'static Schema,
}

impl Database {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            schema: &SCHEMA,
        }
    }

    pub fn table(&self, name: &str) -> Result<&'static Table> {
        self.schema
            .table(name)
            .ok_or_else(|| InvalidQuery::UnknownTable(name.to_string()).into())
    }

    pub fn insert(&self, table: &'static Table) -> Insert {
        Insert::new(table, self.conn.log_queries)
    }

    pub fn select(&self, table: &'static Table) -> Select {
        Select::new(table, self.conn.log_queries)
    }

    pub fn update(&self, table: &'static Table) -> Update {
        Update::new(table, self.conn.log_queries)
    }

    pub fn delete(&self, table: &'static Table) -> Delete {
        Delete::new(table, self.conn.log_queries)
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        self.conn.pool.begin().await.map_err(|err| {
            tracing::error!("Failed to start transaction: {}", err);
            Error::Unexpected(err)
        })
    }
}
