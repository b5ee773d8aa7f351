//! Postgres-backed analysis store

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config;
use crate::db::AnalysisStore;
use crate::error::{StoreError, StoreResult};
use crate::models::ScheduledAnalysis;

const SCHEDULED_TIMEFRAME: &str = "scheduled";
const SCHEDULED_ANALYSIS_TYPE: &str = "scheduled_quick";

const INSERT_ANALYSIS: &str = "INSERT INTO trading_analyses (
        id, symbol, timeframe, analysis_type, direction, confidence_score,
        entry_price, stop_loss, take_profit_1, risk_reward_ratio,
        rationale, raw_response, created_at
    ) VALUES (
        $1, $2, $3, $4, $5, $6,
        $7::float8, $8::float8, $9::float8, $10::float8,
        $11, $12, $13
    )";

pub struct PostgresAnalysisStore {
    client: Mutex<Client>,
}

impl PostgresAnalysisStore {
    /// Connect using `DATABASE_URL`
    pub async fn new() -> StoreResult<Self> {
        Self::connect(&config::get_database_url()).await
    }

    /// Connect with a few exponential-backoff retries, then make sure the
    /// schema exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let (client, connection) = (|| tokio_postgres::connect(database_url, NoTls))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(200))
                    .with_max_times(3),
            )
            .notify(|err: &tokio_postgres::Error, after: Duration| {
                warn!(error = %err, retry_in_ms = after.as_millis() as u64, "Postgres connect failed, retrying");
            })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Postgres connection error");
            }
        });

        let store = Self {
            client: Mutex::new(client),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        let client = self.client.lock().await;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS trading_analyses (
                    id UUID PRIMARY KEY,
                    symbol VARCHAR(50) NOT NULL,
                    timeframe VARCHAR(10) NOT NULL,
                    analysis_type VARCHAR(50) NOT NULL,
                    direction VARCHAR(20),
                    confidence_score INTEGER,
                    entry_price NUMERIC(20, 8),
                    stop_loss NUMERIC(20, 8),
                    take_profit_1 NUMERIC(20, 8),
                    risk_reward_ratio NUMERIC(10, 2),
                    rationale TEXT,
                    raw_response JSONB,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                );
                CREATE INDEX IF NOT EXISTS idx_trading_analyses_symbol
                    ON trading_analyses (symbol);
                CREATE INDEX IF NOT EXISTS idx_trading_analyses_type
                    ON trading_analyses (analysis_type);",
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for PostgresAnalysisStore {
    /// Append one row per analysis, all in a single transaction.
    async fn bulk_upsert(&self, analyses: &[ScheduledAnalysis]) -> StoreResult<()> {
        if analyses.is_empty() {
            return Ok(());
        }

        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let statement = tx.prepare(INSERT_ANALYSIS).await?;

        for analysis in analyses {
            let id = Uuid::new_v4();
            let direction = analysis.direction.as_str();
            let confidence = i32::from(analysis.confidence_score);
            let raw_response = json!({
                "indicators": analysis.indicators,
                "category": analysis.category,
            });

            tx.execute(
                &statement,
                &[
                    &id,
                    &analysis.symbol,
                    &SCHEDULED_TIMEFRAME,
                    &SCHEDULED_ANALYSIS_TYPE,
                    &direction,
                    &confidence,
                    &analysis.entry_price,
                    &analysis.stop_loss,
                    &analysis.take_profit_1,
                    &analysis.risk_reward_ratio,
                    &analysis.rationale,
                    &raw_response,
                    &analysis.analyzed_at,
                ],
            )
            .await?;
        }

        tx.commit().await?;
        debug!(count = analyses.len(), "Saved scheduled analyses to Postgres");
        Ok(())
    }
}
