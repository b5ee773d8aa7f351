//! Normalisation of KI trading model recommendation payloads
//!
//! The model has shipped several response shapes over time: confidence as a
//! score or as a label, indicators as an object, as flat fields, or only
//! embedded in the free-text trend analysis. Everything is folded into one
//! [`Recommendation`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{SourceError, SourceResult};
use crate::models::{Direction, IndicatorValue, Indicators, Recommendation};

pub const DEFAULT_CONFIDENCE: u8 = 50;

static RSI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)RSI\s*(?:bei|at|:)?\s*([\d.]+)").unwrap());
static TREND_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Trend:\s*(\w+)").unwrap());
static BB_UPPER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)BB Upper:\s*([\d.]+)").unwrap());
static BB_LOWER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)BB Lower:\s*([\d.]+)").unwrap());
static SMA200_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)SMA200:\s*([\d.]+)").unwrap());

/// Flat fields probed when the payload carries no indicator object.
/// (lower-case key, upper-case key, display name)
const FLAT_INDICATORS: [(&str, &str, &str); 9] = [
    ("rsi", "RSI", "RSI"),
    ("macd", "MACD", "MACD"),
    ("sma_20", "SMA_20", "SMA 20"),
    ("sma_50", "SMA_50", "SMA 50"),
    ("ema_12", "EMA_12", "EMA 12"),
    ("ema_26", "EMA_26", "EMA 26"),
    ("atr", "ATR", "ATR"),
    ("volume", "volume", "Volume"),
    ("trend", "trend", "Trend"),
];

pub fn parse_recommendation(symbol: &str, body: &Value) -> SourceResult<Recommendation> {
    let data = body.as_object().ok_or_else(|| {
        SourceError::Malformed(format!("recommendation for {} is not a JSON object", symbol))
    })?;

    let direction = first_str(data, &["direction", "signal"])
        .map(Direction::parse)
        .unwrap_or(Direction::Neutral);

    Ok(Recommendation {
        symbol: symbol.to_string(),
        direction,
        confidence_score: parse_confidence(data),
        entry_price: data.get("entry_price").and_then(number),
        stop_loss: data.get("stop_loss").and_then(number),
        take_profit_1: data.get("take_profit_1").and_then(number),
        risk_reward_ratio: data.get("risk_reward_ratio").and_then(number),
        rationale: first_str(data, &["rationale", "reasoning", "trade_rationale"])
            .map(str::to_string),
        indicators: parse_indicators(data),
    })
}

/// Confidence as a 0-100 score.
///
/// `confidence_score` wins; otherwise `confidence` is read either as a label
/// (high/medium/low) or as a number.
pub fn parse_confidence(data: &Map<String, Value>) -> u8 {
    if let Some(score) = data.get("confidence_score").and_then(number) {
        return clamp_score(score);
    }

    match data.get("confidence") {
        Some(Value::String(label)) => match label.trim().to_ascii_lowercase().as_str() {
            "high" => 80,
            "medium" => 60,
            "low" => 40,
            _ => parse_loose_float(label)
                .map(clamp_score)
                .unwrap_or(DEFAULT_CONFIDENCE),
        },
        Some(Value::Number(n)) => n.as_f64().map(clamp_score).unwrap_or(DEFAULT_CONFIDENCE),
        _ => DEFAULT_CONFIDENCE,
    }
}

pub fn parse_indicators(data: &Map<String, Value>) -> Indicators {
    for key in ["indicators", "technical_indicators"] {
        if let Some(Value::Object(object)) = data.get(key) {
            if !object.is_empty() {
                return object
                    .iter()
                    .filter_map(|(name, value)| {
                        IndicatorValue::from_json(value).map(|v| (name.clone(), v))
                    })
                    .collect();
            }
        }
    }

    let mut indicators = Indicators::new();
    for (lower, upper, name) in FLAT_INDICATORS {
        let value = data
            .get(lower)
            .filter(|v| !v.is_null())
            .or_else(|| data.get(upper))
            .and_then(IndicatorValue::from_json);
        if let Some(value) = value {
            indicators.insert(name.to_string(), value);
        }
    }
    if !indicators.is_empty() {
        return indicators;
    }

    indicators_from_text(data)
}

/// Last resort: scrape indicator values out of the free-text fields.
fn indicators_from_text(data: &Map<String, Value>) -> Indicators {
    let mut indicators = Indicators::new();
    let trend_analysis = data.get("trend_analysis").and_then(Value::as_str).unwrap_or("");
    let key_levels = data.get("key_levels").and_then(Value::as_str).unwrap_or("");

    if let Some(rsi) = capture_number(&RSI_PATTERN, trend_analysis) {
        indicators.insert("RSI".to_string(), rsi.into());
    }
    if let Some(trend) = TREND_PATTERN.captures(trend_analysis).and_then(|c| c.get(1)) {
        indicators.insert(
            "Trend".to_string(),
            IndicatorValue::Text(capitalize(trend.as_str())),
        );
    }
    for (pattern, name) in [
        (&BB_UPPER_PATTERN, "BB Upper"),
        (&BB_LOWER_PATTERN, "BB Lower"),
        (&SMA200_PATTERN, "SMA 200"),
    ] {
        if let Some(value) = capture_number(pattern, key_levels) {
            indicators.insert(name.to_string(), value.into());
        }
    }
    if let Some(signal) = data.get("signal").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        indicators.insert(
            "Signal".to_string(),
            IndicatorValue::Text(signal.to_ascii_uppercase()),
        );
    }
    if let Some(timeframe) = data
        .get("timeframe")
        .and_then(IndicatorValue::from_json)
        .filter(|v| !matches!(v, IndicatorValue::Text(t) if t.is_empty()))
    {
        indicators.insert("Timeframe".to_string(), timeframe);
    }

    indicators
}

fn first_str<'a>(data: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

/// Numbers may arrive as JSON numbers or numeric strings ("59.7.").
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_loose_float(s),
        _ => None,
    }
}

/// "NaN" and "inf" parse as floats but are never usable values.
fn parse_loose_float(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn capture_number(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_loose_float(m.as_str()))
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
