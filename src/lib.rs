pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::{build_router, AppState, CollectorService};
pub use config::BridgeConfig;
pub use core::{ConfigurationStore, Diagnostic, TransformEngine, TransformOutcome};
pub use domain::model::{
    Direction, FieldType, MappingRule, MappingSet, PathExpression, Template, TransactionConfig,
    TransactionType,
};
pub use utils::error::{BridgeError, Result};
