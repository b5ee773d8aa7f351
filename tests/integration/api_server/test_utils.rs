//! Test utilities for API server integration tests

use axum_test::TestServer;
use std::sync::Arc;

use tradedash::core::http::{create_router, AppState};
use tradedash::core::scheduler::FavoritesScheduler;
use tradedash::db::MemoryAnalysisStore;
use tradedash::metrics::Metrics;
use tradedash::models::{Direction, FavoriteSymbol};

use crate::fakes::{test_config, FakeFavorites, FakeSource};

/// Test helper for API server integration tests
#[allow(dead_code)]
pub struct TestApiServer {
    pub server: TestServer,
    pub metrics: Arc<Metrics>,
    pub scheduler: Arc<FavoritesScheduler>,
    pub favorites: Arc<FakeFavorites>,
    pub source: Arc<FakeSource>,
    pub store: Arc<MemoryAnalysisStore>,
}

impl TestApiServer {
    /// BTCUSDT answers LONG/75, EURUSD has no recommendation
    pub async fn new() -> Self {
        let favorites = FakeFavorites::new(vec![
            FavoriteSymbol::new("BTCUSDT", "crypto"),
            FavoriteSymbol::new("EURUSD", "forex"),
        ]);
        let source = FakeSource::new();
        source.respond("BTCUSDT", Direction::Long, 75);
        let store = Arc::new(MemoryAnalysisStore::new());
        let metrics = Arc::new(Metrics::new().expect("metrics initialization"));

        let scheduler = Arc::new(
            FavoritesScheduler::new(
                favorites.clone(),
                source.clone(),
                store.clone(),
                &test_config(),
            )
            .with_metrics(metrics.clone()),
        );

        let state = AppState::new(scheduler.clone(), metrics.clone());
        let server = TestServer::new(create_router(state)).expect("start test server");

        Self {
            server,
            metrics,
            scheduler,
            favorites,
            source,
            store,
        }
    }
}
