pub mod executor;
pub mod lifecycle;

pub use executor::OrderExecutor;
pub use lifecycle::{CycleReport, Engine};
