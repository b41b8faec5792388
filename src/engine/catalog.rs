//! Durable catalog of logical tables and their columns.
//!
//! Two metadata tables back every dynamic model: `dynamic_table` carries
//! nothing but the identity that names the physical table, `dynamic_field`
//! carries one row per column. Every function takes the caller's
//! connection so catalog mutations can share a transaction with the
//! physical schema change they accompany.

use rusqlite::{params, Connection, OptionalExtension};

use super::error::{EngineError, Result};
use super::registry::{Column, FieldKind};

const CATALOG_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dynamic_table (
    id INTEGER PRIMARY KEY AUTOINCREMENT
);
CREATE TABLE IF NOT EXISTS dynamic_field (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name     TEXT NOT NULL,
    fld_type TEXT NOT NULL CHECK (fld_type IN ('c', 'i', 'b')),
    table_id INTEGER NOT NULL REFERENCES dynamic_table (id) ON DELETE CASCADE,
    UNIQUE (name, table_id)
);
";

/// Creates the catalog tables if they do not exist yet.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(CATALOG_SCHEMA)?;
    Ok(())
}

/// Allocates and persists a new logical table, returning its identifier.
pub fn create_table(conn: &Connection) -> Result<i64> {
    conn.execute("INSERT INTO dynamic_table DEFAULT VALUES", [])?;
    Ok(conn.last_insert_rowid())
}

pub fn table_exists(conn: &Connection, table_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM dynamic_table WHERE id = ?1",
            params![table_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Returns all columns of a logical table in catalog order.
///
/// Distinguishes "never created" (an error) from "exists with zero
/// columns" (an empty list), even though the latter is unreachable through
/// the public API since creation always writes the initial columns.
pub fn list_columns(conn: &Connection, table_id: i64) -> Result<Vec<Column>> {
    if !table_exists(conn, table_id)? {
        return Err(EngineError::TableNotFound(table_id));
    }

    let mut stmt = conn.prepare(
        "SELECT name, fld_type FROM dynamic_field WHERE table_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![table_id], |row| {
        let name: String = row.get(0)?;
        let code: String = row.get(1)?;
        Ok((name, code))
    })?;

    let mut columns = Vec::new();
    for row in rows {
        let (name, code) = row?;
        columns.push(Column::new(name, FieldKind::from_code(&code)?));
    }
    Ok(columns)
}

pub fn add_column(conn: &Connection, table_id: i64, name: &str, kind: FieldKind) -> Result<()> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO dynamic_field (name, fld_type, table_id) VALUES (?1, ?2, ?3)",
        params![name, kind.code(), table_id],
    )?;
    if inserted == 0 {
        return Err(EngineError::DuplicateColumn(name.to_string()));
    }
    Ok(())
}

pub fn remove_column(conn: &Connection, table_id: i64, name: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM dynamic_field WHERE table_id = ?1 AND name = ?2",
        params![table_id, name],
    )?;
    if deleted == 0 {
        return Err(EngineError::ColumnNotFound(name.to_string()));
    }
    Ok(())
}

pub fn update_column_kind(
    conn: &Connection,
    table_id: i64,
    name: &str,
    kind: FieldKind,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE dynamic_field SET fld_type = ?1 WHERE table_id = ?2 AND name = ?3",
        params![kind.code(), table_id, name],
    )?;
    if updated == 0 {
        return Err(EngineError::ColumnNotFound(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        conn
    }

    #[test]
    fn test_create_and_list() {
        let conn = test_conn();
        let id = create_table(&conn).unwrap();

        add_column(&conn, id, "make", FieldKind::Character).unwrap();
        add_column(&conn, id, "year", FieldKind::Integer).unwrap();

        let columns = list_columns(&conn, id).unwrap();
        assert_eq!(
            columns,
            vec![
                Column::new("make", FieldKind::Character),
                Column::new("year", FieldKind::Integer),
            ]
        );
    }

    #[test]
    fn test_missing_table() {
        let conn = test_conn();
        assert!(matches!(
            list_columns(&conn, 9999),
            Err(EngineError::TableNotFound(9999))
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let conn = test_conn();
        let id = create_table(&conn).unwrap();
        add_column(&conn, id, "make", FieldKind::Character).unwrap();
        assert!(matches!(
            add_column(&conn, id, "make", FieldKind::Integer),
            Err(EngineError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_same_name_on_different_tables() {
        let conn = test_conn();
        let a = create_table(&conn).unwrap();
        let b = create_table(&conn).unwrap();
        add_column(&conn, a, "make", FieldKind::Character).unwrap();
        add_column(&conn, b, "make", FieldKind::Character).unwrap();
        assert_eq!(list_columns(&conn, a).unwrap().len(), 1);
        assert_eq!(list_columns(&conn, b).unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_remove() {
        let conn = test_conn();
        let id = create_table(&conn).unwrap();
        add_column(&conn, id, "year", FieldKind::Character).unwrap();

        update_column_kind(&conn, id, "year", FieldKind::Integer).unwrap();
        let columns = list_columns(&conn, id).unwrap();
        assert_eq!(columns[0].kind, FieldKind::Integer);

        remove_column(&conn, id, "year").unwrap();
        assert!(list_columns(&conn, id).unwrap().is_empty());

        assert!(matches!(
            remove_column(&conn, id, "year"),
            Err(EngineError::ColumnNotFound(_))
        ));
        assert!(matches!(
            update_column_kind(&conn, id, "year", FieldKind::Boolean),
            Err(EngineError::ColumnNotFound(_))
        ));
    }
}
