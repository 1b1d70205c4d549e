pub mod fred;
pub mod liquidity;
pub mod provider;
pub mod types;
pub mod yahoo;

pub use provider::{fetch_series, fetch_spot_family, SeriesSource, SpotPriceSource};
pub use types::{Observation, SpotSymbol};
