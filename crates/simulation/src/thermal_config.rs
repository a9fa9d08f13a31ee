//! Immutable thermal configuration for a machine's regulator.
//!
//! A configuration is only constructible through [`ThermalConfig::new`] (or
//! deserialization, which routes through the same validation), so every live
//! regulator satisfies `optimal_low <= optimal_high < limit`.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised while building a [`ThermalConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The optimal band's lower bound is above its upper bound.
    InvertedOptimalRange { low: i32, high: i32 },
    /// The failure limit is not strictly above the optimal band.
    LimitNotAboveOptimal { high: i32, limit: i32 },
    /// The base heating rate is negative, NaN or infinite.
    InvalidBaseRate(f64),
    /// JSON input could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvertedOptimalRange { low, high } => {
                write!(f, "Optimal range is inverted: {low}..={high}")
            }
            ConfigError::LimitNotAboveOptimal { high, limit } => write!(
                f,
                "Limit {limit} must be strictly above the optimal range ceiling {high}"
            ),
            ConfigError::InvalidBaseRate(rate) => {
                write!(f, "Base rate must be finite and non-negative, got {rate}")
            }
            ConfigError::Parse(msg) => write!(f, "Config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

// =============================================================================
// ThermalConfig
// =============================================================================

/// Per-machine regulator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedThermalConfig")]
pub struct ThermalConfig {
    base_rate: f64,
    optimal_low: i32,
    optimal_high: i32,
    limit: i32,
    explodes: bool,
}

/// Wire shape of a config before validation.
#[derive(Deserialize)]
struct UncheckedThermalConfig {
    base_rate: f64,
    optimal_low: i32,
    optimal_high: i32,
    limit: i32,
    #[serde(default)]
    explodes: bool,
}

impl TryFrom<UncheckedThermalConfig> for ThermalConfig {
    type Error = ConfigError;

    fn try_from(raw: UncheckedThermalConfig) -> Result<Self, Self::Error> {
        ThermalConfig::new(
            raw.base_rate,
            raw.optimal_low..=raw.optimal_high,
            raw.limit,
            raw.explodes,
        )
    }
}

impl ThermalConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the optimal range is inverted, the limit
    /// does not sit above it, or the base rate is not a usable number.
    pub fn new(
        base_rate: f64,
        optimal_range: RangeInclusive<i32>,
        limit: i32,
        explodes: bool,
    ) -> Result<Self, ConfigError> {
        let (low, high) = optimal_range.into_inner();
        if !base_rate.is_finite() || base_rate < 0.0 {
            return Err(ConfigError::InvalidBaseRate(base_rate));
        }
        if low > high {
            return Err(ConfigError::InvertedOptimalRange { low, high });
        }
        if high >= limit {
            return Err(ConfigError::LimitNotAboveOptimal { high, limit });
        }
        Ok(Self::from_parts(base_rate, low, high, limit, explodes))
    }

    /// Build a configuration whose invariants are known to hold at compile time.
    pub(crate) const fn from_parts(
        base_rate: f64,
        optimal_low: i32,
        optimal_high: i32,
        limit: i32,
        explodes: bool,
    ) -> Self {
        Self {
            base_rate,
            optimal_low,
            optimal_high,
            limit,
            explodes,
        }
    }

    /// Parse and validate a JSON configuration.
    ///
    /// ```text
    /// { "base_rate": 0.1, "optimal_low": 1300, "optimal_high": 1700, "limit": 2000, "explodes": true }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn base_rate(&self) -> f64 {
        self.base_rate
    }

    pub fn optimal_low(&self) -> i32 {
        self.optimal_low
    }

    pub fn optimal_high(&self) -> i32 {
        self.optimal_high
    }

    pub fn optimal_range(&self) -> RangeInclusive<i32> {
        self.optimal_low..=self.optimal_high
    }

    pub fn limit(&self) -> i32 {
        self.limit
    }

    pub fn explodes(&self) -> bool {
        self.explodes
    }

    /// Temperature at or above which an installed killswitch latches:
    /// the last quarter of the gap between the optimal ceiling and the limit.
    pub fn killswitch_threshold(&self) -> f64 {
        let limit = f64::from(self.limit);
        limit - 0.25 * (limit - f64::from(self.optimal_high))
    }
}

// =============================================================================
// Unit tests
// =============================================================================
