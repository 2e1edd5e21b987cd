pub mod history;
pub mod normalize;
pub mod rates_api;
pub mod util;

pub use history::{HistoricalRate, HistoryClient};
pub use rates_api::ApiRateSource;
