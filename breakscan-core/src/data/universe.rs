//! Ticker universe — sector-organized symbol lists.
//!
//! Stored in the scanner's TOML config under `[universe.sectors]`. Scan order
//! is deterministic: sectors alphabetically, tickers in file order, first
//! occurrence wins when a ticker is listed twice.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("universe has no tickers")]
    Empty,
}

/// The fixed set of symbols scanned each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl Default for Universe {
    fn default() -> Self {
        Self::default_us()
    }
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// All tickers in scan order, uppercased and deduplicated.
    pub fn tickers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sectors
            .values()
            .flatten()
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect()
    }

    pub fn sector_tickers(&self, sector: &str) -> Option<&[String]> {
        self.sectors.get(sector).map(|v| v.as_slice())
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.keys().map(|s| s.as_str()).collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers().len()
    }

    pub fn validate(&self) -> Result<(), UniverseError> {
        if self.tickers().is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(())
    }

    /// Liquid US large caps with active intraday participation.
    pub fn default_us() -> Self {
        let mut sectors = BTreeMap::new();
        let mut add = |name: &str, tickers: &[&str]| {
            sectors.insert(
                name.to_string(),
                tickers.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
            );
        };

        add(
            "Technology",
            &["AAPL", "MSFT", "NVDA", "AMD", "META", "GOOGL", "AVGO", "CRM", "ORCL", "ADBE"],
        );
        add("Consumer", &["AMZN", "TSLA", "NFLX", "COST", "HD", "NKE", "SBUX"]);
        add("Finance", &["JPM", "BAC", "GS", "MS", "V", "MA", "PYPL"]);
        add("Healthcare", &["UNH", "LLY", "JNJ", "PFE", "MRK", "ABBV"]);
        add("Energy", &["XOM", "CVX", "COP", "SLB", "OXY"]);
        add("Industrials", &["BA", "CAT", "GE", "UBER", "DE"]);

        Self { sectors }
    }
}
