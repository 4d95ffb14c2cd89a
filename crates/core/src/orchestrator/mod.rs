//! Conversion orchestrator.
//!
//! The orchestrator ties the components together for each request:
//! - **Hashing**: the source is hashed up front; unreadable files fail fast
//! - **Cache**: a hit is answered immediately and never reaches the queue
//! - **Queue**: a miss becomes a task; its executor converts and caches the output

mod executor;
mod runner;
mod types;

pub use executor::CachingExecutor;
pub use runner::ConversionOrchestrator;
pub use types::{ConversionFailure, ConversionResult, OrchestratorError};
