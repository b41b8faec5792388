//! Model reconciler: brings a physical table's columns into agreement
//! with a desired column map.
//!
//! Each scheduled column operation commits its own transaction covering
//! the physical DDL and the matching catalog row, so catalog and physical
//! state converge column by column. Structural changes are rare, so there
//! is no cross-column batching: a failure mid-update leaves the already
//! applied columns in place and the error names the column that failed.

use std::collections::BTreeMap;

use rusqlite::Connection;
use tracing::info;

use super::catalog;
use super::ddl;
use super::error::Result;
use super::registry::{Column, FieldKind, TypeRegistry};

/// The three-way partition of existing columns against a desired map.
/// Recomputed fresh from the catalog on every update; never persisted.
#[derive(Debug, Default, PartialEq)]
pub struct SchemaDelta {
    pub changed: Vec<(String, FieldKind, FieldKind)>,
    pub added: Vec<(String, FieldKind)>,
    pub removed: Vec<String>,
}

impl SchemaDelta {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Partitions by column name: removed (existing, not desired), changed
/// (both, kind differs), added (desired, not existing). Columns present
/// in both with identical kind need no action. Ordering is deterministic:
/// catalog order for changed/removed, desired-map order for added.
pub fn partition(existing: &[Column], desired: &BTreeMap<String, FieldKind>) -> SchemaDelta {
    let mut delta = SchemaDelta::default();
    let mut remaining = desired.clone();

    for column in existing {
        match remaining.remove(&column.name) {
            None => delta.removed.push(column.name.clone()),
            Some(kind) if kind == column.kind => {}
            Some(kind) => delta.changed.push((column.name.clone(), column.kind, kind)),
        }
    }
    delta.added = remaining.into_iter().collect();
    delta
}

pub struct Reconciler {
    registry: TypeRegistry,
    table_prefix: String,
}

impl Reconciler {
    pub fn new(registry: TypeRegistry, table_prefix: impl Into<String>) -> Self {
        Self {
            registry,
            table_prefix: table_prefix.into(),
        }
    }

    /// Physical table name, derived solely from the table id.
    pub fn table_name(&self, table_id: i64) -> String {
        format!("{}{}", self.table_prefix, table_id)
    }

    /// Create path: allocates a logical table, catalogs every desired
    /// column, and creates the physical table — all in one transaction.
    pub fn create(
        &self,
        conn: &mut Connection,
        desired: &BTreeMap<String, FieldKind>,
    ) -> Result<i64> {
        let tx = conn.transaction()?;

        let table_id = catalog::create_table(&tx)?;
        let mut specs = Vec::with_capacity(desired.len());
        for (name, kind) in desired {
            catalog::add_column(&tx, table_id, name, *kind)?;
            specs.push((name.clone(), self.registry.resolve(*kind)));
        }
        ddl::create_physical_table(&tx, &self.table_name(table_id), &specs)?;

        tx.commit()?;
        info!(table_id, columns = desired.len(), "created dynamic table");
        Ok(table_id)
    }

    /// Update path: load, partition, apply type changes, then additions,
    /// then removals. One transaction per column; no rollback across
    /// columns.
    pub fn update(
        &self,
        conn: &mut Connection,
        table_id: i64,
        desired: &BTreeMap<String, FieldKind>,
    ) -> Result<()> {
        let existing = catalog::list_columns(conn, table_id)?;
        let delta = partition(&existing, desired);
        if delta.is_empty() {
            return Ok(());
        }

        let table = self.table_name(table_id);
        info!(
            table_id,
            changed = delta.changed.len(),
            added = delta.added.len(),
            removed = delta.removed.len(),
            "reconciling dynamic table"
        );

        for (name, old_kind, new_kind) in &delta.changed {
            let tx = conn.transaction()?;
            let spec = self.registry.resolve(*new_kind);
            ddl::alter_column_type(&tx, &table, name, *old_kind, *new_kind, &spec)?;
            catalog::update_column_kind(&tx, table_id, name, *new_kind)?;
            tx.commit()?;
        }

        for (name, kind) in &delta.added {
            let tx = conn.transaction()?;
            ddl::add_column(&tx, &table, name, &self.registry.resolve(*kind))?;
            catalog::add_column(&tx, table_id, name, *kind)?;
            tx.commit()?;
        }

        for name in &delta.removed {
            let tx = conn.transaction()?;
            ddl::drop_column(&tx, &table, name)?;
            catalog::remove_column(&tx, table_id, name)?;
            tx.commit()?;
        }

        Ok(())
    }

    /// Materialize path: the current logical shape, read-only.
    pub fn shape(&self, conn: &Connection, table_id: i64) -> Result<Vec<Column>> {
        catalog::list_columns(conn, table_id)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}
