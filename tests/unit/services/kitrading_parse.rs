//! Unit tests for KI trading recommendation parsing

use serde_json::json;

use tradedash::error::SourceError;
use tradedash::models::{Direction, IndicatorValue};
use tradedash::services::kitrading::parse::{parse_confidence, parse_recommendation};

#[test]
fn full_payload_is_normalised() {
    let body = json!({
        "symbol": "btcusdt",
        "direction": "LONG",
        "confidence_score": 75,
        "entry_price": 65000.5,
        "stop_loss": "63000",
        "take_profit_1": 69000,
        "risk_reward_ratio": 2.1,
        "rationale": "Higher lows on the 4h chart",
        "indicators": { "RSI": 58.3, "Trend": "bullish" }
    });

    let rec = parse_recommendation("BTCUSDT", &body).unwrap();

    assert_eq!(rec.symbol, "BTCUSDT");
    assert_eq!(rec.direction, Direction::Long);
    assert_eq!(rec.confidence_score, 75);
    assert_eq!(rec.entry_price, Some(65000.5));
    assert_eq!(rec.stop_loss, Some(63000.0));
    assert_eq!(rec.take_profit_1, Some(69000.0));
    assert_eq!(rec.risk_reward_ratio, Some(2.1));
    assert_eq!(rec.rationale.as_deref(), Some("Higher lows on the 4h chart"));
    assert_eq!(rec.indicators["RSI"], IndicatorValue::Number(58.3));
    assert_eq!(rec.indicators["Trend"], IndicatorValue::from("bullish"));
}

#[test]
fn confidence_labels_map_to_scores() {
    for (label, expected) in [("high", 80), ("Medium", 60), ("LOW", 40), ("72", 72), ("unsure", 50)] {
        let data = json!({ "confidence": label });
        assert_eq!(
            parse_confidence(data.as_object().unwrap()),
            expected,
            "label {}",
            label
        );
    }
}

#[test]
fn confidence_is_clamped_and_defaults_to_fifty() {
    let over = json!({ "confidence_score": 140 });
    let under = json!({ "confidence": -3 });
    let missing = json!({});
    assert_eq!(parse_confidence(over.as_object().unwrap()), 100);
    assert_eq!(parse_confidence(under.as_object().unwrap()), 0);
    assert_eq!(parse_confidence(missing.as_object().unwrap()), 50);
}

#[test]
fn direction_falls_back_to_signal_then_neutral() {
    let from_signal = parse_recommendation("ETHUSDT", &json!({ "signal": "sell" })).unwrap();
    assert_eq!(from_signal.direction, Direction::Short);

    let missing = parse_recommendation("ETHUSDT", &json!({})).unwrap();
    assert_eq!(missing.direction, Direction::Neutral);
    assert_eq!(missing.confidence_score, 50);
    assert!(missing.indicators.is_empty());
}

#[test]
fn rationale_falls_back_to_reasoning() {
    let rec = parse_recommendation(
        "AAPL",
        &json!({ "direction": "SHORT", "reasoning": "Lower highs" }),
    )
    .unwrap();
    assert_eq!(rec.rationale.as_deref(), Some("Lower highs"));
}

#[test]
fn flat_indicator_fields_are_collected() {
    let body = json!({
        "direction": "LONG",
        "rsi": 44.1,
        "MACD": -0.8,
        "sma_50": 1.0842,
        "trend": "sideways"
    });

    let rec = parse_recommendation("EURUSD", &body).unwrap();

    assert_eq!(rec.indicators.len(), 4);
    assert_eq!(rec.indicators["RSI"], IndicatorValue::Number(44.1));
    assert_eq!(rec.indicators["MACD"], IndicatorValue::Number(-0.8));
    assert_eq!(rec.indicators["SMA 50"], IndicatorValue::Number(1.0842));
    assert_eq!(rec.indicators["Trend"], IndicatorValue::from("sideways"));
}

#[test]
fn indicators_are_scraped_from_text_as_last_resort() {
    let body = json!({
        "signal": "buy",
        "timeframe": "H4",
        "trend_analysis": "Trend: BULLISH, RSI bei 59.7.",
        "key_levels": "BB Upper: 2450.5, BB Lower: 2310, SMA200: 2200.25"
    });

    let rec = parse_recommendation("XAUUSD", &body).unwrap();

    assert_eq!(rec.direction, Direction::Long);
    assert_eq!(rec.indicators["RSI"], IndicatorValue::Number(59.7));
    assert_eq!(rec.indicators["Trend"], IndicatorValue::from("Bullish"));
    assert_eq!(rec.indicators["BB Upper"], IndicatorValue::Number(2450.5));
    assert_eq!(rec.indicators["BB Lower"], IndicatorValue::Number(2310.0));
    assert_eq!(rec.indicators["SMA 200"], IndicatorValue::Number(2200.25));
    assert_eq!(rec.indicators["Signal"], IndicatorValue::from("BUY"));
    assert_eq!(rec.indicators["Timeframe"], IndicatorValue::from("H4"));
}

#[test]
fn non_object_payload_is_malformed() {
    let err = parse_recommendation("BTCUSDT", &json!(["LONG"])).unwrap_err();
    assert!(matches!(err, SourceError::Malformed(_)));
}

#[test]
fn non_finite_numbers_are_ignored() {
    let body = json!({
        "direction": "LONG",
        "confidence_score": "NaN",
        "entry_price": "inf",
        "stop_loss": "-infinity",
        "take_profit_1": "NaN.",
        "risk_reward_ratio": "1.8"
    });

    let rec = parse_recommendation("BTCUSDT", &body).unwrap();

    assert_eq!(rec.confidence_score, 50);
    assert_eq!(rec.entry_price, None);
    assert_eq!(rec.stop_loss, None);
    assert_eq!(rec.take_profit_1, None);
    assert_eq!(rec.risk_reward_ratio, Some(1.8));
}

#[test]
fn non_finite_confidence_label_falls_back_to_default() {
    let data = json!({ "confidence": "NaN" });
    assert_eq!(parse_confidence(data.as_object().unwrap()), 50);
}
