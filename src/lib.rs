pub mod cli;
pub mod engine;
pub mod storage;

pub use engine::{EngineConfig, EngineError, FieldKind, ModelEngine, Result};
pub use storage::row::{Row, Value};
