//! Warehouse statement rendering.
//!
//! The destination table always has the same three columns: the worksheet
//! title (`source`), the time the insert ran (`imported_at`) and the row
//! itself as semi-structured JSON (`data`). Rows are inserted through a
//! `SELECT ... FROM VALUES` so each JSON literal can be passed to
//! `parse_json`.
//!
//! String literals are single-quoted with `'` doubled and `\` escaped, so no
//! cell content can terminate a literal early.

use std::{fmt, fmt::Write as _, sync::OnceLock};

use regex::Regex;

use crate::{
    data::Record,
    error::{LoadError, Result},
    records::SheetRecords,
};

/// Maximum rows per insert statement.
pub const DEFAULT_BATCH_SIZE: usize = 16_000;

static PLAIN_IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn plain_identifier() -> &'static Regex {
    PLAIN_IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("valid identifier pattern")
    })
}

/// Renders an identifier bare when the warehouse would accept it unquoted,
/// otherwise double-quoted.
pub fn quote_identifier(name: &str) -> String {
    if plain_identifier().is_match(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

pub fn string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => literal.push_str("''"),
            '\\' => literal.push_str("\\\\"),
            other => literal.push(other),
        }
    }
    literal.push('\'');
    literal
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub schema: String,
    pub table: String,
}

impl LoadTarget {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.table)
        )
    }
}

impl fmt::Display for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

pub fn build_create_table(target: &LoadTarget) -> String {
    format!(
        "CREATE OR REPLACE TABLE {} (\n    source string,\n    imported_at timestamp_tz,\n    data variant\n);\n",
        target.qualified_name()
    )
}

/// Renders one insert for `records`, or `None` when there is nothing to
/// insert since `FROM VALUES` cannot be empty.
pub fn build_insert_rows(
    target: &LoadTarget,
    title: &str,
    records: &[Record],
) -> Result<Option<String>> {
    if records.is_empty() {
        return Ok(None);
    }
    let source = string_literal(title);
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let json = serde_json::to_string(record).map_err(LoadError::Encode)?;
        rows.push(format!(
            "({source}, current_timestamp, {})",
            string_literal(&json)
        ));
    }

    let mut statement = String::new();
    let _ = writeln!(statement, "INSERT INTO {}", target.qualified_name());
    let _ = writeln!(statement, "SELECT column1, column2, parse_json(column3)");
    let _ = writeln!(statement, "FROM VALUES");
    let _ = writeln!(statement, "{}", rows.join(",\n"));
    Ok(Some(statement))
}

/// Statements for one load, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPlan {
    pub create_statement: String,
    pub insert_statements: Vec<String>,
}

impl StatementPlan {
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.create_statement.as_str())
            .chain(self.insert_statements.iter().map(String::as_str))
    }
}

pub fn plan_statements(
    target: &LoadTarget,
    records: &SheetRecords,
    batch_size: usize,
) -> Result<StatementPlan> {
    let batch_size = batch_size.max(1);
    let mut insert_statements = Vec::new();
    for chunk in records.data.chunks(batch_size) {
        if let Some(statement) = build_insert_rows(target, &records.title, chunk)? {
            insert_statements.push(statement);
        }
    }
    Ok(StatementPlan {
        create_statement: build_create_table(target),
        insert_statements,
    })
}
