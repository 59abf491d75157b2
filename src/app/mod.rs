pub mod collector;
pub mod server;

pub use collector::{CollectorOutcome, CollectorService};
pub use server::{build_router, AppState};
