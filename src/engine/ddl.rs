//! Schema alteration executor: the only component that issues structural
//! DDL against physical tables.
//!
//! SQLite supports `ADD COLUMN` and `DROP COLUMN` natively but has no
//! `ALTER COLUMN TYPE`, so a kind change rebuilds the column in place:
//! rename to a scratch name, add the new column, copy with a guarded CAST,
//! drop the scratch column. The guard makes data the target kind cannot
//! represent fail loudly instead of being coerced to garbage by SQLite's
//! flexible typing.

use rusqlite::Connection;
use tracing::debug;

use super::error::{EngineError, Result};
use super::registry::{ColumnSpec, FieldKind};

/// Quotes an identifier for use in generated SQL. Names are validated at
/// the engine boundary, so they never contain quotes themselves.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

fn column_def(name: &str, spec: &ColumnSpec) -> String {
    if spec.nullable {
        format!("{} {}", quote(name), spec.sql_type)
    } else {
        format!("{} {} NOT NULL", quote(name), spec.sql_type)
    }
}

/// Creates a physical table with the given columns plus the implicit
/// identity column.
pub fn create_physical_table(
    conn: &Connection,
    table: &str,
    columns: &[(String, ColumnSpec)],
) -> Result<()> {
    let mut defs = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    defs.extend(columns.iter().map(|(name, spec)| column_def(name, spec)));

    let sql = format!("CREATE TABLE {} ({})", quote(table), defs.join(", "));
    debug!(table, "creating physical table");
    conn.execute(&sql, [])?;
    Ok(())
}

pub fn add_column(conn: &Connection, table: &str, name: &str, spec: &ColumnSpec) -> Result<()> {
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote(table),
        column_def(name, spec)
    );
    debug!(table, column = name, "adding column");
    conn.execute(&sql, [])?;
    Ok(())
}

/// Drops a column. Any data in it is lost; this is intentional and
/// irreversible.
pub fn drop_column(conn: &Connection, table: &str, name: &str) -> Result<()> {
    let sql = format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(name));
    debug!(table, column = name, "dropping column");
    conn.execute(&sql, [])?;
    Ok(())
}

/// Changes a column's physical type by rebuilding it in place.
///
/// The coercion guard runs before any DDL, so data the new kind cannot
/// represent fails the whole step with a `Storage` error and leaves the
/// column untouched.
pub fn alter_column_type(
    conn: &Connection,
    table: &str,
    name: &str,
    old_kind: FieldKind,
    new_kind: FieldKind,
    new_spec: &ColumnSpec,
) -> Result<()> {
    debug!(
        table,
        column = name,
        from = old_kind.name(),
        to = new_kind.name(),
        "changing column type"
    );

    if let Some(predicate) = reject_predicate(name, new_kind) {
        let incompatible: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                quote(table),
                predicate
            ),
            [],
            |row| row.get(0),
        )?;
        if incompatible > 0 {
            return Err(EngineError::Storage(format!(
                "cannot change column {} to {}: {} existing value(s) are not coercible",
                name,
                new_kind.name(),
                incompatible
            )));
        }
    }

    let scratch = format!("{}__alter_tmp", name);
    conn.execute(
        &format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote(table),
            quote(name),
            quote(&scratch)
        ),
        [],
    )?;
    conn.execute(
        &format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote(table),
            column_def(name, new_spec)
        ),
        [],
    )?;
    conn.execute(
        &format!(
            "UPDATE {} SET {} = {}",
            quote(table),
            quote(name),
            copy_expr(&scratch, new_kind)
        ),
        [],
    )?;
    conn.execute(
        &format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote(table),
            quote(&scratch)
        ),
        [],
    )?;
    Ok(())
}

/// Expression that copies an old column's value into the new kind.
fn copy_expr(column: &str, target: FieldKind) -> String {
    match target {
        FieldKind::Character => format!("CAST({} AS TEXT)", quote(column)),
        FieldKind::Integer | FieldKind::Boolean => {
            format!("CAST({} AS INTEGER)", quote(column))
        }
    }
}

/// Predicate matching rows whose value the target kind cannot represent.
/// Widening to character always succeeds.
fn reject_predicate(column: &str, target: FieldKind) -> Option<String> {
    let col = quote(column);
    match target {
        FieldKind::Character => None,
        FieldKind::Integer => Some(format!(
            "{col} IS NOT NULL AND CAST(CAST({col} AS INTEGER) AS TEXT) <> CAST({col} AS TEXT)"
        )),
        FieldKind::Boolean => Some(format!(
            "{col} IS NOT NULL AND (CAST(CAST({col} AS INTEGER) AS TEXT) <> CAST({col} AS TEXT) \
             OR CAST({col} AS INTEGER) NOT IN (0, 1))"
        )),
    }
}
