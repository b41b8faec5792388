mod catalog;
mod context;
mod ddl;
mod error;
mod reconciler;
mod registry;
mod rows;

pub use context::{EngineConfig, ModelEngine, PhysicalColumn};
pub use error::{EngineError, Result};
pub use reconciler::{partition, Reconciler, SchemaDelta};
pub use registry::{Column, ColumnSpec, FieldKind, TypeRegistry};
