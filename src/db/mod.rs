//! Persistence of scheduled analyses

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::ScheduledAnalysis;

pub use memory::MemoryAnalysisStore;
pub use postgres::PostgresAnalysisStore;

/// Durable sink for analysis snapshots. Append-only semantics are fine.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn bulk_upsert(&self, analyses: &[ScheduledAnalysis]) -> StoreResult<()>;
}
