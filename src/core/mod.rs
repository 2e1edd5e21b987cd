//! Core business logic abstractions

pub mod config;
pub mod format;
pub mod log;
pub mod notify;
pub mod rate;
pub mod state;
pub mod throttle;

// Re-export main types for cleaner imports
pub use rate::{Category, Rate, RatePatch, RateSource, Tab};
pub use state::{RateStore, RefreshOutcome, StoreState};
pub use throttle::RefreshGate;
