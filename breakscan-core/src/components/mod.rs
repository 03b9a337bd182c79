//! Signal components: regime classifier, trend filter, breakout detector,
//! score engine.
//!
//! Every component here is a pure function of its input series. I/O belongs
//! to the bar cache; temporal state belongs to the scheduler.

pub mod breakout;
pub mod regime;
pub mod score;
pub mod trend;

pub use breakout::{Base, Breakout, BreakoutDetector, Rejection, BASE_LEN, DEFAULT_PRICE_FLOOR};
pub use regime::RegimeClassifier;
pub use score::{MinScoreGate, ScoreBreakdown, ScoreEngine, TimingPolicy};
pub use trend::{momentum_up, TrendFilter};
