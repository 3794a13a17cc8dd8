//! Static metadata for the signals this crate implements.
//!
//! Used by the CLI listing and to look up a signal's source column.

use serde::{Deserialize, Serialize};

/// Family a signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalCategory {
    /// Short-horizon mean reversion signals
    Reversal,
    /// Trading activity signals
    Volume,
}

impl SignalCategory {
    /// One-line description for listings.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Reversal => "Contrarian signals on trailing returns",
            Self::Volume => "Abnormal trading activity relative to own history",
        }
    }
}

/// Metadata about a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInfo {
    /// Default output column name
    pub name: &'static str,

    /// Category classification
    pub category: SignalCategory,

    /// Human-readable description
    pub description: &'static str,

    /// Rows of history before values are fully formed; matches
    /// [`reverso_traits::Signal::lookback`] of the default configuration
    pub typical_lookback: usize,

    /// Input column the signal is computed from
    pub source_column: &'static str,
}

/// Every registered signal, reversal signals first.
#[must_use]
pub fn available_signals() -> Vec<SignalInfo> {
    vec![
        SignalInfo {
            name: "reversal",
            category: SignalCategory::Reversal,
            description: "Negated 21-day sum of log total returns, lagged one day",
            typical_lookback: 22,
            source_column: "return",
        },
        SignalInfo {
            name: "barra_reversal",
            category: SignalCategory::Reversal,
            description: "Negated exponentially smoothed specific return, lagged one day",
            typical_lookback: 6,
            source_column: "specific_return",
        },
        SignalInfo {
            name: "volume_score",
            category: SignalCategory::Volume,
            description: "252-day z-score of log dollar volume",
            typical_lookback: 252,
            source_column: "daily_volume",
        },
    ]
}

/// Registered signals of one category.
#[must_use]
pub fn signals_by_category(category: &SignalCategory) -> Vec<SignalInfo> {
    available_signals()
        .into_iter()
        .filter(|info| &info.category == category)
        .collect()
}

/// Looks up a signal by its default column name.
#[must_use]
pub fn get_signal_info(name: &str) -> Option<SignalInfo> {
    available_signals()
        .into_iter()
        .find(|info| info.name == name)
}
