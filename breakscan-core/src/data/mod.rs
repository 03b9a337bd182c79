//! Market data: providers, caching, universe, earnings guard

pub mod bar_cache;
pub mod circuit_breaker;
pub mod earnings;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use bar_cache::{BarCache, CacheEntry, CacheStats, Unavailable};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use earnings::{EarningsFeed, EarningsGuard, StaticEarningsFeed, YahooEarningsFeed};
pub use provider::{BarProvider, DataError};
pub use synthetic::SyntheticProvider;
pub use universe::{Universe, UniverseError};
pub use yahoo::{YahooOptions, YahooProvider};
