//! Engine configuration (environment-driven).

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_MAX_CHAIN_DEPTH: &str = "PERMATRIX_MAX_CHAIN_DEPTH";
pub const ENV_STRICT_LOAD: &str = "PERMATRIX_STRICT_LOAD";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Tunables for catalog validation and session loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Longest prerequisite chain (in hops) a catalog may contain.
    /// `None` accepts any acyclic chain.
    pub max_chain_depth: Option<usize>,

    /// Reject persisted grants that violate dependency closure instead of
    /// healing them by adding the missing prerequisites.
    pub strict_load: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: None,
            strict_load: false,
        }
    }
}

impl MatrixConfig {
    /// Read overrides from the process environment; unset keys keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_CHAIN_DEPTH) {
            let depth = raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                key: ENV_MAX_CHAIN_DEPTH,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            if depth == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_MAX_CHAIN_DEPTH,
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.max_chain_depth = Some(depth);
        }

        if let Some(raw) = lookup(ENV_STRICT_LOAD) {
            config.strict_load = parse_flag(ENV_STRICT_LOAD, &raw)?;
        }

        Ok(config)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = MatrixConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MatrixConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = MatrixConfig::from_lookup(lookup(&[
            (ENV_MAX_CHAIN_DEPTH, "3"),
            (ENV_STRICT_LOAD, "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.max_chain_depth, Some(3));
        assert!(config.strict_load);
    }

    #[test]
    fn rejects_bad_values() {
        let err = MatrixConfig::from_lookup(lookup(&[(ENV_MAX_CHAIN_DEPTH, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1"));

        let err = MatrixConfig::from_lookup(lookup(&[(ENV_STRICT_LOAD, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_STRICT_LOAD));
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: MatrixConfig = serde_json::from_str(r#"{"strict_load": true}"#).unwrap();
        assert_eq!(config.max_chain_depth, None);
        assert!(config.strict_load);
    }

    #[test]
    fn from_env_without_overrides_uses_defaults() {
        // Neither variable is set by the test harness.
        if std::env::var_os(ENV_MAX_CHAIN_DEPTH).is_none() && std::env::var_os(ENV_STRICT_LOAD).is_none() {
            assert_eq!(MatrixConfig::from_env().unwrap(), MatrixConfig::default());
        }
    }
}
