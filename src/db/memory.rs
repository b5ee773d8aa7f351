//! In-memory analysis store, used when no database is reachable

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::db::AnalysisStore;
use crate::error::StoreResult;
use crate::models::ScheduledAnalysis;

/// Keeps the most recently written analysis per symbol.
///
/// Memory is bounded by the number of distinct symbols, however many passes
/// write to it.
#[derive(Default)]
pub struct MemoryAnalysisStore {
    latest: RwLock<HashMap<String, ScheduledAnalysis>>,
    writes: AtomicU64,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored analyses ordered by symbol
    pub async fn snapshot(&self) -> Vec<ScheduledAnalysis> {
        let mut analyses: Vec<ScheduledAnalysis> =
            self.latest.read().await.values().cloned().collect();
        analyses.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        analyses
    }

    pub async fn get(&self, symbol: &str) -> Option<ScheduledAnalysis> {
        self.latest.read().await.get(symbol).cloned()
    }

    pub async fn len(&self) -> usize {
        self.latest.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.latest.read().await.is_empty()
    }

    /// Number of `bulk_upsert` calls served
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn bulk_upsert(&self, analyses: &[ScheduledAnalysis]) -> StoreResult<()> {
        let mut latest = self.latest.write().await;
        for analysis in analyses {
            latest.insert(analysis.symbol.clone(), analysis.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
