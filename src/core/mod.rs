pub mod autodetect;
pub mod coerce;
pub mod engine;
pub mod heuristic;
pub mod path;
pub mod store;
pub mod template;
pub mod xml_check;

pub use crate::domain::model::{MappingRule, MappingSet, TransactionConfig, TransactionType};
pub use crate::domain::ports::{ConfigProvider, Upstream};
pub use crate::utils::error::Result;
pub use engine::{Diagnostic, TransformEngine, TransformOutcome};
pub use store::{ConfigSnapshot, ConfigUpdate, ConfigurationStore, UpdateMode};
