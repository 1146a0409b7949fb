use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::{ColumnType, OnDelete, Schema, SchemaError, Table};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DdlError {
    #[error("Not a CREATE TABLE statement")]
    NotCreateTable,

    #[error("Could not parse table element: {0}")]
    InvalidElement(String),

    #[error("Unsupported type for column {column}: {ty}")]
    UnsupportedType { column: String, ty: String },

    #[error("Constraint references unknown column {0}")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub column: String,
    pub references: String,
    pub target_column: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    pub unique: Vec<String>,
}

impl From<&Table> for TableDefinition {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name.to_string(),
            columns: table
                .columns
                .iter()
                .map(|column| ColumnDefinition {
                    name: column.name.to_string(),
                    ty: column.ty,
                    nullable: column.nullable && !column.primary_key,
                    primary_key: column.primary_key,
                })
                .collect(),
            foreign_keys: table
                .foreign_keys
                .iter()
                .map(|fk| ForeignKeyDefinition {
                    column: fk.column.to_string(),
                    references: fk.references.to_string(),
                    target_column: fk.target_column.to_string(),
                    on_delete: fk.on_delete,
                })
                .collect(),
            unique: table.unique.iter().map(|c| c.to_string()).collect(),
        }
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn render_create_table(table: &Table) -> String {
    let mut elements: Vec<String> = Vec::new();

    for column in table.columns {
        let mut element = format!("{} {}", quote_ident(column.name), column.ty.sql_name());
        if column.primary_key {
            element.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            element.push_str(" NOT NULL");
        }
        elements.push(element);
    }

    for column in table.unique {
        elements.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_ident(&format!("{}_{}_unique", table.name, column)),
            quote_ident(column)
        ));
    }

    for fk in table.foreign_keys {
        elements.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quote_ident(&format!(
                "{}_{}_{}_{}_fk",
                table.name, fk.column, fk.references, fk.target_column
            )),
            quote_ident(fk.column),
            quote_ident(fk.references),
            quote_ident(fk.target_column),
            fk.on_delete.sql()
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quote_ident(table.name),
        elements.join(",\n    ")
    )
}

/// One statement per table, parents before children.
pub fn render_schema(schema: &Schema) -> Result<Vec<String>, SchemaError> {
    Ok(schema
        .creation_order()?
        .into_iter()
        .map(render_create_table)
        .collect())
}

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*").expect("comment regex"));

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:"?\w+"?\.)?"?(\w+)"?\s*\((.*)\)\s*;?\s*$"#,
    )
    .expect("create table regex")
});

static NAMED_CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^CONSTRAINT\s+"?\w+"?\s+(.*)$"#).expect("named constraint regex")
});

static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^PRIMARY\s+KEY\s*\(\s*"?(\w+)"?\s*\)$"#).expect("primary key regex")
});

static UNIQUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)^UNIQUE\s*\(\s*"?(\w+)"?\s*\)$"#).expect("unique regex"));

static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^FOREIGN\s+KEY\s*\(\s*"?(\w+)"?\s*\)\s*REFERENCES\s+"?(\w+)"?\s*\(\s*"?(\w+)"?\s*\)(.*)$"#,
    )
    .expect("foreign key regex")
});

static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bREFERENCES\s+"?(\w+)"?\s*\(\s*"?(\w+)"?\s*\)"#)
        .expect("inline references regex")
});

static ON_DELETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bON\s+DELETE\s+(CASCADE|RESTRICT|SET\s+NULL|NO\s+ACTION)")
        .expect("on delete regex")
});

static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)^"?(\w+)"?\s+(.+)$"#).expect("column regex"));

static COLUMN_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(integer|int4|int|serial|character\s+varying|varchar|text|boolean|bool|numeric|decimal|date)\b(?:\s*\([^)]*\))?",
    )
    .expect("column type regex")
});

static PRIMARY_KEY_FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("primary key flag regex"));

static NOT_NULL_FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").expect("not null flag regex"));

static UNIQUE_FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUNIQUE\b").expect("unique flag regex"));

fn parse_on_delete(rest: &str) -> OnDelete {
    match ON_DELETE_RE.captures(rest) {
        Some(caps) => {
            let action = caps[1].to_uppercase();
            match action.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
                "CASCADE" => OnDelete::Cascade,
                "RESTRICT" => OnDelete::Restrict,
                "SET NULL" => OnDelete::SetNull,
                _ => OnDelete::NoAction,
            }
        }
        None => OnDelete::NoAction,
    }
}

fn parse_column_type(column: &str, raw: &str) -> Result<(ColumnType, usize), DdlError> {
    let caps = COLUMN_TYPE_RE
        .captures(raw)
        .ok_or_else(|| DdlError::UnsupportedType {
            column: column.to_string(),
            ty: raw.split_whitespace().next().unwrap_or("").to_string(),
        })?;

    let name = caps[1].to_lowercase();
    let ty = match name.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
        "integer" | "int4" | "int" | "serial" => ColumnType::Integer,
        "character varying" | "varchar" | "text" => ColumnType::Varchar,
        "boolean" | "bool" => ColumnType::Boolean,
        "numeric" | "decimal" => ColumnType::Decimal,
        _ => ColumnType::Date,
    };

    Ok((ty, caps[0].len()))
}

#[derive(Default)]
struct Quoting {
    identifier: bool,
    literal: bool,
}

impl Quoting {
    /// Tracks `"identifier"` and `'literal'` quoting. Returns true while the
    /// character is quoted text or one of its delimiters.
    fn step(&mut self, ch: char) -> bool {
        match ch {
            '"' if !self.literal => {
                self.identifier = !self.identifier;
                true
            }
            '\'' if !self.identifier => {
                self.literal = !self.literal;
                true
            }
            _ => self.identifier || self.literal,
        }
    }
}

/// Splits on commas that are not nested inside parentheses or quotes.
fn split_elements(body: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quoting = Quoting::default();

    for ch in body.chars() {
        let quoted = quoting.step(ch);
        match ch {
            _ if quoted => (),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                elements.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => (),
        }
        current.push(ch);
    }

    if !current.trim().is_empty() {
        elements.push(current.trim().to_string());
    }

    elements.into_iter().filter(|e| !e.is_empty()).collect()
}

/// Column constraints with literals and parenthesized expressions blanked
/// out, so only top-level keywords remain.
fn top_level(flags: &str) -> String {
    let mut out = String::with_capacity(flags.len());
    let mut depth = 0usize;
    let mut quoting = Quoting::default();

    for ch in flags.chars() {
        let quoted = quoting.step(ch);
        match ch {
            _ if quoted => out.push(' '),
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' => {
                depth = depth.saturating_sub(1);
                out.push(' ');
            }
            _ if depth > 0 => out.push(' '),
            _ => out.push(ch),
        }
    }

    out
}

pub fn parse_create_table(sql: &str) -> Result<TableDefinition, DdlError> {
    let sql = COMMENT_RE.replace_all(sql, "");
    let caps = CREATE_TABLE_RE
        .captures(&sql)
        .ok_or(DdlError::NotCreateTable)?;

    let mut table = TableDefinition {
        name: caps[1].to_string(),
        columns: Vec::new(),
        foreign_keys: Vec::new(),
        unique: Vec::new(),
    };
    let mut table_primary_keys: Vec<String> = Vec::new();

    for element in split_elements(&caps[2]) {
        let element = match NAMED_CONSTRAINT_RE.captures(&element) {
            Some(c) => c[1].trim().to_string(),
            None => element,
        };

        if let Some(c) = PRIMARY_KEY_RE.captures(&element) {
            table_primary_keys.push(c[1].to_string());
            continue;
        }

        if let Some(c) = UNIQUE_RE.captures(&element) {
            table.unique.push(c[1].to_string());
            continue;
        }

        if let Some(c) = FOREIGN_KEY_RE.captures(&element) {
            table.foreign_keys.push(ForeignKeyDefinition {
                column: c[1].to_string(),
                references: c[2].to_string(),
                target_column: c[3].to_string(),
                on_delete: parse_on_delete(&c[4]),
            });
            continue;
        }

        let c = COLUMN_RE
            .captures(&element)
            .ok_or_else(|| DdlError::InvalidElement(element.clone()))?;
        let name = c[1].to_string();
        let (ty, consumed) = parse_column_type(&name, &c[2])?;
        let flags = &c[2][consumed..];
        let keywords = top_level(flags);

        let primary_key = PRIMARY_KEY_FLAG_RE.is_match(&keywords);
        let not_null = NOT_NULL_FLAG_RE.is_match(&keywords);

        if UNIQUE_FLAG_RE.is_match(&keywords) && !primary_key {
            table.unique.push(name.clone());
        }

        if let Some(r) = INLINE_REFERENCES_RE.captures(flags) {
            table.foreign_keys.push(ForeignKeyDefinition {
                column: name.clone(),
                references: r[1].to_string(),
                target_column: r[2].to_string(),
                on_delete: parse_on_delete(flags),
            });
        }

        table.columns.push(ColumnDefinition {
            name,
            ty,
            nullable: !(primary_key || not_null),
            primary_key,
        });
    }

    for pk in table_primary_keys {
        let column = table
            .columns
            .iter_mut()
            .find(|c| c.name == pk)
            .ok_or_else(|| DdlError::UnknownColumn(pk.clone()))?;
        column.primary_key = true;
        column.nullable = false;
    }

    for name in table
        .unique
        .iter()
        .chain(table.foreign_keys.iter().map(|fk| &fk.column))
    {
        if !table.columns.iter().any(|c| &c.name == name) {
            return Err(DdlError::UnknownColumn(name.clone()));
        }
    }

    Ok(table)
}
