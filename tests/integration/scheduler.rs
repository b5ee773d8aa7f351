//! End-to-end scheduler passes against a mocked KI trading service

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tradedash::core::scheduler::FavoritesScheduler;
use tradedash::models::{Direction, IndicatorValue};
use tradedash::services::KiTradingClient;

use crate::fakes::{memory_store, settle, test_config};

async fn mock_upstream() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/managed-symbols"))
        .and(query_param("favorites_only", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "symbol": "BTCUSDT", "category": "crypto" },
            { "symbol": "EURUSD", "category": "forex" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/recommendation/BTCUSDT"))
        .and(query_param("use_llm", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "BTCUSDT",
            "direction": "LONG",
            "confidence_score": 75,
            "entry_price": 65000,
            "stop_loss": 63000,
            "take_profit_1": 69000,
            "trend_analysis": "Trend: bullish, RSI at 61.5"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/recommendation/EURUSD"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn pass_caches_successes_and_persists_snapshot() {
    let server = mock_upstream().await;
    let client = Arc::new(
        KiTradingClient::new(&format!("{}/api/v1", server.uri()), Duration::from_secs(5))
            .unwrap(),
    );
    let store = memory_store();
    let scheduler = Arc::new(FavoritesScheduler::new(
        client.clone(),
        client,
        store.clone(),
        &test_config(),
    ));

    let analyses = scheduler.run_now().await;

    assert_eq!(analyses.len(), 1);
    let btc = &analyses[0];
    assert_eq!(btc.symbol, "BTCUSDT");
    assert_eq!(btc.direction, Direction::Long);
    assert_eq!(btc.confidence_score, 75);
    assert_eq!(btc.entry_price, Some(65000.0));
    assert_eq!(btc.category.as_deref(), Some("crypto"));
    assert_eq!(btc.indicators["RSI"], IndicatorValue::Number(61.5));
    assert!(scheduler.get_analysis("EURUSD").await.is_none());

    let status = scheduler.get_status().await;
    assert!(status.last_run.is_some());
    assert_eq!(status.analyzed_symbols, 1);

    for _ in 0..10 {
        if store.write_count() > 0 {
            break;
        }
        settle().await;
    }
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.snapshot().await, analyses);
}
