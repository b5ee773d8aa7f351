//! Inputs consumed by the scheduler: favorites and recommendations

use serde::{Deserialize, Serialize};

use super::analysis::{Direction, Indicators};

/// A symbol the user marked as favorite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteSymbol {
    pub symbol: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl FavoriteSymbol {
    pub fn new(symbol: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            category: Some(category.into()),
        }
    }
}

/// Normalised trading recommendation for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub direction: Direction,
    pub confidence_score: u8,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit_1: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub rationale: Option<String>,
    #[serde(default)]
    pub indicators: Indicators,
}

impl Recommendation {
    pub fn new(symbol: impl Into<String>, direction: Direction, confidence_score: u8) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            confidence_score,
            entry_price: None,
            stop_loss: None,
            take_profit_1: None,
            risk_reward_ratio: None,
            rationale: None,
            indicators: Indicators::new(),
        }
    }
}
