//! Core application primitives: the favorites scheduler and its HTTP surface

pub mod http;
pub mod scheduler;

pub use http::{create_router, start_server, AppState};
pub use scheduler::{FavoritesScheduler, PassOutcome, SchedulerStatus};
