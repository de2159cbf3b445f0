pub mod models;
pub mod okx;
pub mod source;
pub mod universe;

pub use models::{Candle, Direction, Instrument, Ticker};
pub use okx::CandleFilter;
pub use source::{JsonDirectorySource, MarketDataFetcher, SharedFetcher};
