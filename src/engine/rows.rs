//! Generic row accessor: create/list against the materialized shape of a
//! dynamic table. No per-model types exist; every row is an ordered
//! mapping of column name to scalar, checked against the shape at call
//! time.

use std::collections::BTreeMap;

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use super::ddl::quote;
use super::error::{EngineError, Result};
use super::registry::{Column, FieldKind};
use crate::storage::row::{Row, Value};

fn check_kind(column: &Column, value: &Value) -> Result<()> {
    let ok = match (column.kind, value) {
        (_, Value::Null) => true,
        (FieldKind::Character, Value::String(_)) => true,
        (FieldKind::Integer, Value::Integer(_)) => true,
        (FieldKind::Boolean, Value::Boolean(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::TypeMismatch {
            column: column.name.clone(),
            expected: column.kind,
        })
    }
}

fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Integer(i) => rusqlite::types::Value::Integer(*i),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Boolean(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Null => rusqlite::types::Value::Null,
    }
}

fn from_sql(kind: FieldKind, value: ValueRef<'_>) -> Value {
    match kind {
        FieldKind::Integer => match value {
            ValueRef::Integer(v) => Value::Integer(v),
            _ => Value::Null,
        },
        FieldKind::Boolean => match value {
            ValueRef::Integer(v) => Value::Boolean(v != 0),
            _ => Value::Null,
        },
        FieldKind::Character => match value {
            ValueRef::Text(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Integer(v) => Value::String(v.to_string()),
            ValueRef::Real(v) => Value::String(v.to_string()),
            _ => Value::Null,
        },
    }
}

/// Inserts one row. Every key must name a current column (unknown keys
/// are rejected, not ignored) and every scalar must match its column's
/// kind; omitted columns default to NULL. Returns the new row's identity.
pub fn insert_row(
    conn: &Connection,
    table: &str,
    shape: &[Column],
    values: &BTreeMap<String, Value>,
) -> Result<i64> {
    let mut names = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());

    for (name, value) in values {
        let column = shape
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| EngineError::UnknownColumn(name.clone()))?;
        check_kind(column, value)?;
        names.push(quote(name));
        params.push(to_sql(value));
    }

    if names.is_empty() {
        conn.execute(
            &format!("INSERT INTO {} DEFAULT VALUES", quote(table)),
            [],
        )?;
    } else {
        let placeholders: Vec<String> =
            (1..=names.len()).map(|i| format!("?{}", i)).collect();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                names.join(", "),
                placeholders.join(", ")
            ),
            params_from_iter(params),
        )?;
    }
    Ok(conn.last_insert_rowid())
}

/// Lists all rows in shape order, identity column included.
pub fn list_rows(conn: &Connection, table: &str, shape: &[Column]) -> Result<Vec<Row>> {
    let mut select = vec!["id".to_string()];
    select.extend(shape.iter().map(|c| quote(&c.name)));

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} ORDER BY id",
        select.join(", "),
        quote(table)
    ))?;

    let mut rows = Vec::new();
    let mut result = stmt.query([])?;
    while let Some(row) = result.next()? {
        let id: i64 = row.get(0)?;
        let mut values = Vec::with_capacity(shape.len());
        for (i, column) in shape.iter().enumerate() {
            values.push((column.name.clone(), from_sql(column.kind, row.get_ref(i + 1)?)));
        }
        rows.push(Row::new(id, values));
    }
    Ok(rows)
}
