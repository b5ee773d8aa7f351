//! Unit tests for the in-memory analysis store

use chrono::Utc;

use tradedash::db::{AnalysisStore, MemoryAnalysisStore};
use tradedash::models::{Direction, Recommendation, ScheduledAnalysis};

fn analysis(symbol: &str, confidence: u8) -> ScheduledAnalysis {
    ScheduledAnalysis::from_recommendation(
        Recommendation::new(symbol, Direction::Long, confidence),
        None,
        Utc::now(),
    )
}

#[tokio::test]
async fn later_writes_replace_earlier_ones() {
    let store = MemoryAnalysisStore::new();
    store
        .bulk_upsert(&[analysis("BTCUSDT", 60), analysis("ETHUSDT", 55)])
        .await
        .unwrap();
    store.bulk_upsert(&[analysis("BTCUSDT", 80)]).await.unwrap();

    assert_eq!(store.write_count(), 2);
    assert_eq!(store.len().await, 2);
    assert_eq!(store.get("BTCUSDT").await.unwrap().confidence_score, 80);
    assert_eq!(store.get("ETHUSDT").await.unwrap().confidence_score, 55);

    let symbols: Vec<String> = store.snapshot().await.into_iter().map(|a| a.symbol).collect();
    assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
}

#[tokio::test]
async fn repeated_writes_keep_one_entry_per_symbol() {
    let store = MemoryAnalysisStore::new();
    let batch = vec![
        analysis("BTCUSDT", 70),
        analysis("EURUSD", 50),
        analysis("XAUUSD", 65),
    ];

    for _ in 0..1_000 {
        store.bulk_upsert(&batch).await.unwrap();
    }

    assert_eq!(store.write_count(), 1_000);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn empty_store() {
    let store = MemoryAnalysisStore::new();
    assert!(store.is_empty().await);
    assert!(store.get("BTCUSDT").await.is_none());
    assert!(store.snapshot().await.is_empty());
}
