//! Probe configuration.
//!
//! [`ProbeConfig`] is an explicit context object handed to
//! [`Prober::new`](crate::Prober::new). Nothing is read from the process at
//! import time. Callers choose between defaults, builder methods, the
//! environment ([`ProbeConfig::from_env`]) and, with the `config-file`
//! feature, a TOML document ([`ProbeConfig::from_toml_str`]).
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `READYPROBE_STRATEGIES` | comma-separated chain, e.g. `select,poll` |
//! | `READYPROBE_SELECT_CAPACITY` | descriptor cap for `select` |

use crate::error::ConfigError;
use crate::strategy::{SELECT_CAPACITY_MAX, Strategy};
use serde::Deserialize;

/// Environment variable holding the strategy chain.
pub const ENV_STRATEGIES: &str = "READYPROBE_STRATEGIES";
/// Environment variable holding the select capacity.
pub const ENV_SELECT_CAPACITY: &str = "READYPROBE_SELECT_CAPACITY";

/// Configuration for a [`Prober`](crate::Prober).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Strategies in fallback order.
    pub strategies: Vec<Strategy>,
    /// Descriptors at or above this value are out of range for `select`.
    pub select_capacity: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategies: Strategy::DEFAULT_CHAIN.to_vec(),
            select_capacity: SELECT_CAPACITY_MAX,
        }
    }
}

impl ProbeConfig {
    /// Replaces the strategy chain.
    #[must_use]
    pub fn with_strategies(mut self, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }

    /// Removes `strategy` from the chain.
    #[must_use]
    pub fn without(mut self, strategy: Strategy) -> Self {
        self.strategies.retain(|s| *s != strategy);
        self
    }

    /// Sets the select capacity.
    #[must_use]
    pub const fn with_select_capacity(mut self, capacity: usize) -> Self {
        self.select_capacity = capacity;
        self
    }

    /// Checks the chain and capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategies.is_empty() {
            return Err(ConfigError::EmptyChain);
        }
        for (i, strategy) in self.strategies.iter().enumerate() {
            if self.strategies[..i].contains(strategy) {
                return Err(ConfigError::DuplicateStrategy(*strategy));
            }
        }
        if self.select_capacity == 0 || self.select_capacity > SELECT_CAPACITY_MAX {
            return Err(ConfigError::SelectCapacity {
                value: self.select_capacity,
                max: SELECT_CAPACITY_MAX,
            });
        }
        Ok(())
    }

    /// Loads overrides from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Loads overrides from `(name, value)` pairs on top of the defaults.
    ///
    /// Unrelated variables are ignored; empty values are treated as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::default().overlay_vars(vars)
    }

    /// Applies the process environment on top of `self`.
    pub fn overlay_env(self) -> Result<Self, ConfigError> {
        self.overlay_vars(std::env::vars())
    }

    /// Applies `(name, value)` overrides on top of `self`, then validates.
    pub fn overlay_vars<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                ENV_STRATEGIES => self.strategies = parse_chain(value)?,
                ENV_SELECT_CAPACITY => {
                    self.select_capacity =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: ENV_SELECT_CAPACITY,
                            value: value.to_string(),
                        })?;
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Parses a TOML document.
    ///
    /// ```toml
    /// strategies = ["select", "poll"]
    /// select_capacity = 512
    /// ```
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parses a comma-separated strategy chain.
pub fn parse_chain(value: &str) -> Result<Vec<Strategy>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::parse)
        .collect()
}
