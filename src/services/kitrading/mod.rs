//! KI trading model integration: favorites and quick recommendations.

pub mod client;
pub mod parse;

pub use client::KiTradingClient;
pub use parse::parse_recommendation;
