//! Scheduled analysis snapshots kept by the favorites scheduler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::recommendation::Recommendation;

/// Trade direction of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    /// Lenient parse of upstream direction/signal labels.
    ///
    /// Anything that is not recognisably bullish or bearish is neutral.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" | "BULLISH" => Direction::Long,
            "SHORT" | "SELL" | "BEARISH" => Direction::Short,
            _ => Direction::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single technical indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Number(f64),
    Text(String),
}

impl IndicatorValue {
    /// Convert an arbitrary JSON value; `null` yields nothing.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(IndicatorValue::Number),
            Value::String(s) => Some(IndicatorValue::Text(s.clone())),
            other => Some(IndicatorValue::Text(other.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndicatorValue::Number(n) => Some(*n),
            IndicatorValue::Text(_) => None,
        }
    }
}

impl From<f64> for IndicatorValue {
    fn from(value: f64) -> Self {
        IndicatorValue::Number(value)
    }
}

impl From<&str> for IndicatorValue {
    fn from(value: &str) -> Self {
        IndicatorValue::Text(value.to_string())
    }
}

pub type Indicators = BTreeMap<String, IndicatorValue>;

/// Latest recommendation produced for one favorite symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAnalysis {
    pub symbol: String,
    pub direction: Direction,
    pub confidence_score: u8,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit_1: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub rationale: Option<String>,
    pub category: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default)]
    pub indicators: Indicators,
}

impl ScheduledAnalysis {
    pub fn from_recommendation(
        recommendation: Recommendation,
        category: Option<String>,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: recommendation.symbol,
            direction: recommendation.direction,
            confidence_score: recommendation.confidence_score.min(100),
            entry_price: recommendation.entry_price,
            stop_loss: recommendation.stop_loss,
            take_profit_1: recommendation.take_profit_1,
            risk_reward_ratio: recommendation.risk_reward_ratio,
            rationale: recommendation.rationale,
            category,
            analyzed_at,
            indicators: recommendation.indicators,
        }
    }
}
