pub mod archive;
pub mod web;

use crate::core::models::AttemptResult;
use async_trait::async_trait;

pub use archive::ArchiveExecutor;
pub use web::WebExecutor;

/// Performs one attempt against the run's target. Implementations never fail
/// for a wrong candidate; problems are carried in `AttemptResult::error`.
#[async_trait]
pub trait AttemptExecutor: Send {
    async fn attempt(&mut self, candidate: &str) -> AttemptResult;
}
