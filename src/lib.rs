pub mod config;
pub mod coordination;
pub mod driver;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod store;

pub use config::ElectionConfig;
pub use driver::{Driver, RunSummary};
pub use phase::{Phase, PhaseFactory, Phases, Transition};
