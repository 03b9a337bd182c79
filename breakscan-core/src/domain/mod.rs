//! Domain types for the breakout scanner

pub mod bar;
pub mod interval;
pub mod signal;

pub use bar::{Bar, BarError, BarSeries};
pub use interval::{Interval, Period, SeriesRequest};
pub use signal::{Candidate, MarketRegime, Mode, Side, TrendDirection};
