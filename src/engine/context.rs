use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::catalog;
use super::error::{EngineError, Result};
use super::reconciler::Reconciler;
use super::registry::{Column, ColumnSpec, FieldKind, TypeRegistry};
use super::rows;
use crate::storage::row::{Row, Value};

/// Engine-wide configuration. No ambient globals: the table-name prefix
/// and the character column length are fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub table_prefix: String,
    pub default_char_length: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table_prefix: "dyntbl_".to_string(),
            default_char_length: 255,
        }
    }
}

/// One column of a materialized physical shape: logical kind plus the
/// physical spec it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalColumn {
    pub name: String,
    pub kind: FieldKind,
    pub spec: ColumnSpec,
}

type ChangeHook = Box<dyn Fn(i64) + Send + Sync>;

/// The engine facade: owns the catalog, the reconciler, the per-table
/// locks, and the cached shapes. All operations are synchronous and open
/// their own SQLite connection.
pub struct ModelEngine {
    db_path: PathBuf,
    reconciler: Reconciler,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    shapes: Mutex<HashMap<i64, Arc<Vec<Column>>>>,
    on_model_change: Option<ChangeHook>,
}

impl ModelEngine {
    pub fn new(db_path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let engine = Self {
            db_path: db_path.as_ref().to_path_buf(),
            reconciler: Reconciler::new(
                TypeRegistry::new(config.default_char_length),
                config.table_prefix,
            ),
            locks: Mutex::new(HashMap::new()),
            shapes: Mutex::new(HashMap::new()),
            on_model_change: None,
        };
        catalog::init(&engine.connect()?)?;
        Ok(engine)
    }

    /// Registers a callback invoked with the table id after a model is
    /// created or updated. The outer layer uses this for registration
    /// side effects; the engine itself never depends on it.
    pub fn with_change_hook(mut self, hook: impl Fn(i64) + Send + Sync + 'static) -> Self {
        self.on_model_change = Some(Box::new(hook));
        self
    }

    /// Defines a new dynamic model and returns its table id.
    pub fn create_model(&self, fields: &BTreeMap<String, String>) -> Result<i64> {
        let desired = parse_fields(fields)?;
        let mut conn = self.connect()?;
        let table_id = self.reconciler.create(&mut conn, &desired)?;
        self.notify(table_id);
        Ok(table_id)
    }

    /// Reconciles an existing model against the desired field map.
    pub fn update_model(&self, table_id: i64, fields: &BTreeMap<String, String>) -> Result<()> {
        let desired = parse_fields(fields)?;
        let lock = self.table_lock(table_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut conn = self.connect()?;
        let result = self.reconciler.update(&mut conn, table_id, &desired);

        // The physical shape may have moved even on a partial failure:
        // force the next access to recompute it from the catalog.
        self.invalidate_shape(table_id);
        result?;

        self.notify(table_id);
        Ok(())
    }

    /// Returns the materialized physical shape of a model.
    pub fn physical_shape(&self, table_id: i64) -> Result<Vec<PhysicalColumn>> {
        let lock = self.table_lock(table_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = self.connect()?;
        let shape = self.shape(&conn, table_id)?;
        Ok(shape
            .iter()
            .map(|column| PhysicalColumn {
                name: column.name.clone(),
                kind: column.kind,
                spec: self.reconciler.registry().resolve(column.kind),
            })
            .collect())
    }

    /// Inserts a row into a model's physical table, returning its id.
    pub fn insert_row(&self, table_id: i64, values: &BTreeMap<String, Value>) -> Result<i64> {
        let lock = self.table_lock(table_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = self.connect()?;
        let shape = self.shape(&conn, table_id)?;
        rows::insert_row(&conn, &self.reconciler.table_name(table_id), &shape, values)
    }

    /// Lists all rows of a model.
    pub fn list_rows(&self, table_id: i64) -> Result<Vec<Row>> {
        let lock = self.table_lock(table_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let conn = self.connect()?;
        let shape = self.shape(&conn, table_id)?;
        rows::list_rows(&conn, &self.reconciler.table_name(table_id), &shape)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Exclusive lock for one table id. Reconciliations hold it for the
    /// whole load-diff-apply; row operations queue behind it. Different
    /// ids proceed in parallel.
    fn table_lock(&self, table_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(table_id).or_default().clone()
    }

    fn shape(&self, conn: &Connection, table_id: i64) -> Result<Arc<Vec<Column>>> {
        {
            let shapes = self.shapes.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(shape) = shapes.get(&table_id) {
                return Ok(shape.clone());
            }
        }
        let shape = Arc::new(self.reconciler.shape(conn, table_id)?);
        debug!(table_id, columns = shape.len(), "materialized shape");
        self.shapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table_id, shape.clone());
        Ok(shape)
    }

    fn invalidate_shape(&self, table_id: i64) {
        self.shapes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&table_id);
    }

    fn notify(&self, table_id: i64) {
        if let Some(hook) = &self.on_model_change {
            hook(table_id);
        }
    }
}

/// Boundary validation: rejects empty field maps, unknown kind names and
/// unusable column names before any catalog or physical mutation.
fn parse_fields(fields: &BTreeMap<String, String>) -> Result<BTreeMap<String, FieldKind>> {
    if fields.is_empty() {
        return Err(EngineError::EmptyFields);
    }
    let mut desired = BTreeMap::new();
    for (name, kind_name) in fields {
        validate_column_name(name)?;
        desired.insert(name.clone(), FieldKind::from_name(kind_name)?);
    }
    Ok(desired)
}

fn validate_column_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    // "id" is the implicit identity column of every physical table
    if !valid || name == "id" {
        return Err(EngineError::InvalidColumnName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_validation() {
        assert!(matches!(
            parse_fields(&BTreeMap::new()),
            Err(EngineError::EmptyFields)
        ));

        let mut fields = BTreeMap::new();
        fields.insert("make".to_string(), "charcter".to_string());
        assert!(matches!(
            parse_fields(&fields),
            Err(EngineError::UnknownKind(_))
        ));

        let mut fields = BTreeMap::new();
        fields.insert("make".to_string(), "character".to_string());
        let desired = parse_fields(&fields).unwrap();
        assert_eq!(desired.get("make"), Some(&FieldKind::Character));
    }

    #[test]
    fn test_column_name_validation() {
        assert!(validate_column_name("make_year").is_ok());
        assert!(validate_column_name("_private").is_ok());
        assert!(validate_column_name("id").is_err());
        assert!(validate_column_name("").is_err());
        assert!(validate_column_name("1year").is_err());
        assert!(validate_column_name("bad name").is_err());
        assert!(validate_column_name("bad\"quote").is_err());
    }
}
