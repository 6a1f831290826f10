//! INSERT statement parsing.
//!
//! A dump line is parsed with sqlparser's MySQL dialect and lowered to
//! per-row records: ordered column -> value maps ready for JSON encoding.
//! Lines that are not well-formed INSERTs produce no records.

use indexmap::IndexMap;
use serde_json::Value;
use sqlparser::ast::{Expr, SetExpr, Statement, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::decode::{self, ColumnDecoders};

/// One output record: insertion-ordered mapping from column name to value.
pub type Record = IndexMap<String, Value>;

/// Marker every convertible dump line starts with.
pub const INSERT_PREFIX: &str = "INSERT INTO";

/// A parsed multi-row INSERT: target table plus its raw value rows.
pub struct ParsedInsert {
    pub table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Expr>>,
}

/// Parse a single dump line. Returns `None` for anything that is not an
/// INSERT with a VALUES body.
pub fn parse_line(line: &str) -> Option<ParsedInsert> {
    if !line.starts_with(INSERT_PREFIX) {
        return None;
    }

    let dialect = MySqlDialect {};
    let statements = Parser::parse_sql(&dialect, line).ok()?;
    let insert = match statements.into_iter().next()? {
        Statement::Insert(insert) => insert,
        _ => return None,
    };

    // Strip any schema qualifier: `db`.`users` routes as "users".
    let table = insert.table_name.0.last()?.value.clone();

    let rows = match *insert.source?.body {
        SetExpr::Values(values) => values.rows,
        _ => return None,
    };

    // Dumps written without --complete-insert omit the column list;
    // synthesize positional names so records stay self-describing.
    let columns: Vec<String> = if insert.columns.is_empty() {
        let width = rows.first().map_or(0, Vec::len);
        (0..width).map(|i| format!("col_{i}")).collect()
    } else {
        insert.columns.into_iter().map(|c| c.value).collect()
    };

    Some(ParsedInsert {
        table,
        columns,
        rows,
    })
}

impl ParsedInsert {
    /// Lower the value rows to records, applying any configured column
    /// decoders. Rows whose arity differs from the column list are skipped.
    pub fn into_records(self, decoders: Option<&ColumnDecoders>) -> Vec<Record> {
        let ParsedInsert { table, columns, rows } = self;
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            if row.len() != columns.len() {
                debug!(
                    table = %table,
                    expected = columns.len(),
                    got = row.len(),
                    "skipping VALUES row with mismatched arity"
                );
                continue;
            }

            let mut record = Record::with_capacity(columns.len());
            for (column, expr) in columns.iter().zip(row) {
                let mut value = literal_value(expr);
                if let (Some(columns_config), Value::String(raw)) = (decoders, &value) {
                    if let Some(kinds) = columns_config.get(column) {
                        if let Some(decoded) = decode::reinterpret(kinds, raw) {
                            value = decoded;
                        }
                    }
                }
                record.insert(column.clone(), value);
            }
            records.push(record);
        }

        records
    }
}

/// Map a SQL literal expression to a JSON value.
fn literal_value(expr: Expr) -> Value {
    match expr {
        Expr::Value(value) => sql_value(value),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match *expr {
            Expr::Value(SqlValue::Number(digits, _)) => number_value(&format!("-{digits}")),
            other => Value::String(format!("-{other}")),
        },
        other => Value::String(other.to_string()),
    }
}

fn sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Value::String(s),
        SqlValue::Number(digits, _) => number_value(&digits),
        SqlValue::Boolean(b) => Value::Bool(b),
        SqlValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// Integer if it fits an i64, float otherwise; the raw digits as a string
/// when neither parse succeeds (e.g. a decimal wider than f64).
fn number_value(digits: &str) -> Value {
    if let Ok(i) = digits.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = digits.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(digits.to_string())
}
