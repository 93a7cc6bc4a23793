//! Runtime configuration from environment variables.

use crate::errors::ConfigError;
use anyhow::Context;
use std::env;

/// Contract types resolved into the directory unless overridden.
pub const DEFAULT_DEPLOYABLE_TYPES: &[&str] = &[
    "DaoCreator",
    "SchemeRegistrar",
    "UpgradeScheme",
    "GlobalConstraintRegistrar",
    "ContributionReward",
    "GenesisProtocol",
    "AbsoluteVote",
];

/// Configuration for an `ArcContext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConfig {
    /// Network the client expects to connect to (ganache, kovan, live)
    pub network: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Buffer size of channel subscriptions on the event bus
    pub channel_capacity: usize,

    /// Contract types whose canonical deployments populate the directory
    pub deployable_types: Vec<String>,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            network: "ganache".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            channel_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            deployable_types: DEFAULT_DEPLOYABLE_TYPES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl ArcConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ARC_NETWORK`: Network name (default: ganache)
    /// - `ARC_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `ARC_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `ARC_CHANNEL_CAPACITY`: Channel subscription buffer (default: 1000)
    /// - `ARC_DEPLOYABLE_TYPES`: Comma-separated contract types
    ///
    /// # Errors
    ///
    /// Fails on an unparsable value or if the result does not validate.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let channel_capacity = match lookup("ARC_CHANNEL_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("ARC_CHANNEL_CAPACITY is not a number: {raw:?}"))?,
            None => defaults.channel_capacity,
        };

        let deployable_types = lookup("ARC_DEPLOYABLE_TYPES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.deployable_types);

        let config = Self {
            network: lookup("ARC_NETWORK").unwrap_or(defaults.network),
            log_level: lookup("ARC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("ARC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
            channel_capacity,
            deployable_types,
        };

        config.validate().context("invalid Arc configuration")?;
        Ok(config)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.trim().is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        if self.deployable_types.is_empty() {
            return Err(ConfigError::NoDeployableTypes);
        }
        if let Some(name) = self
            .deployable_types
            .iter()
            .find(|name| shared_bus::Topic::parse(name).is_err() || name.contains('.'))
        {
            return Err(ConfigError::InvalidContractType(name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ArcConfig::default();
        assert_eq!(config.network, "ganache");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.channel_capacity, 1000);
        assert!(config.deployable_types.contains(&"DaoCreator".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ArcConfig::from_lookup(lookup(&[
            ("ARC_NETWORK", "kovan"),
            ("RUST_LOG", "debug"),
            ("ARC_JSON_LOGS", "1"),
            ("ARC_CHANNEL_CAPACITY", "64"),
            ("ARC_DEPLOYABLE_TYPES", "DaoCreator, SchemeRegistrar,"),
        ]))
        .unwrap();

        assert_eq!(config.network, "kovan");
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.deployable_types, vec!["DaoCreator", "SchemeRegistrar"]);
    }

    #[test]
    fn test_arc_log_level_wins_over_rust_log() {
        let config = ArcConfig::from_lookup(lookup(&[
            ("ARC_LOG_LEVEL", "warn"),
            ("RUST_LOG", "trace"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ArcConfig::from_lookup(lookup(&[("ARC_CHANNEL_CAPACITY", "lots")])).is_err());
        assert!(ArcConfig::from_lookup(lookup(&[("ARC_CHANNEL_CAPACITY", "0")])).is_err());
        assert!(ArcConfig::from_lookup(lookup(&[("ARC_DEPLOYABLE_TYPES", " , ")])).is_err());
    }

    #[test]
    fn test_validate_contract_type_names() {
        let config = ArcConfig {
            deployable_types: vec!["Scheme.Registrar".to_string()],
            ..ArcConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidContractType("Scheme.Registrar".to_string()))
        );
    }
}
