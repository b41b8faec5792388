use std::fmt;

use super::error::{EngineError, Result};

/// The closed set of column kinds a dynamic model may use.
///
/// External interfaces accept the human-readable names; the catalog stores
/// the one-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Integer,
    Boolean,
}

impl FieldKind {
    /// Parses an external type name ("character", "integer", "boolean").
    /// Case-sensitive; anything else is a client error.
    pub fn from_name(name: &str) -> Result<FieldKind> {
        match name {
            "character" => Ok(FieldKind::Character),
            "integer" => Ok(FieldKind::Integer),
            "boolean" => Ok(FieldKind::Boolean),
            _ => Err(EngineError::UnknownKind(name.to_string())),
        }
    }

    /// Parses the internal one-letter code used in the catalog.
    pub fn from_code(code: &str) -> Result<FieldKind> {
        match code {
            "c" => Ok(FieldKind::Character),
            "i" => Ok(FieldKind::Integer),
            "b" => Ok(FieldKind::Boolean),
            _ => Err(EngineError::UnknownKind(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            FieldKind::Character => "c",
            FieldKind::Integer => "i",
            FieldKind::Boolean => "b",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Character => "character",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical column specification derived from a kind: the SQL type plus
/// nullability. Every dynamic column is nullable; there is no
/// required-field concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub sql_type: String,
    pub nullable: bool,
}

/// A cataloged column: its name plus logical kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: FieldKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Maps logical kinds to physical column specifications.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    default_char_length: u32,
}

impl TypeRegistry {
    pub fn new(default_char_length: u32) -> Self {
        Self {
            default_char_length,
        }
    }

    pub fn resolve(&self, kind: FieldKind) -> ColumnSpec {
        let sql_type = match kind {
            FieldKind::Character => format!("VARCHAR({})", self.default_char_length),
            FieldKind::Integer => "INTEGER".to_string(),
            FieldKind::Boolean => "BOOLEAN".to_string(),
        };
        ColumnSpec {
            sql_type,
            nullable: true,
        }
    }
}
