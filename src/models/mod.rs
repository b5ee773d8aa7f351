//! Shared data models spanning the scheduler, store and HTTP layers.

pub mod analysis;
pub mod recommendation;

pub use analysis::{Direction, IndicatorValue, Indicators, ScheduledAnalysis};
pub use recommendation::{FavoriteSymbol, Recommendation};
