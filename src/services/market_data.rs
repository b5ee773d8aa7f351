//! Market data capabilities consumed by the favorites scheduler.

use crate::error::SourceResult;
use crate::models::{FavoriteSymbol, Recommendation};

/// Source of the user's current favorite symbols
#[async_trait::async_trait]
pub trait FavoritesProvider: Send + Sync {
    /// Favorites in display order, each tagged with its category
    async fn list_favorites(&self) -> SourceResult<Vec<FavoriteSymbol>>;
}

/// Source of trading recommendations
#[async_trait::async_trait]
pub trait RecommendationSource: Send + Sync {
    /// Fetch a recommendation for `symbol`.
    ///
    /// `fast_mode` skips the LLM-enhanced analysis and only runs the quick
    /// technical model.
    async fn get_recommendation(
        &self,
        symbol: &str,
        fast_mode: bool,
    ) -> SourceResult<Recommendation>;
}
