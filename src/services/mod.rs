//! External services the scheduler depends on.

pub mod kitrading;
pub mod market_data;

pub use kitrading::KiTradingClient;
pub use market_data::{FavoritesProvider, RecommendationSource};
