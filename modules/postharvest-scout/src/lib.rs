pub mod accounts;
pub mod collector;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod scheduler;
pub mod session;
pub mod time_label;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::ScrapeError;
pub use orchestrator::{Orchestrator, RunStats, ScrapeSettings};
pub use scheduler::Scheduler;
