use thiserror::Error;

use super::registry::FieldKind;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown field type: {0}")]
    UnknownKind(String),

    #[error("table {0} not found")]
    TableNotFound(i64),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("value for column {column} is not a valid {expected}")]
    TypeMismatch { column: String, expected: FieldKind },

    #[error("field map must not be empty")]
    EmptyFields,

    #[error("invalid column name: {0}")]
    InvalidColumnName(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Client errors are caused by the request and never indicate a fault
    /// in the engine or the storage layer.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Sqlite(_) | EngineError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
