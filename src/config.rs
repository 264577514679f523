use std::env;
use std::fmt;
use std::str::FromStr;

use crate::sim::ArenaConfig;

/// Settings for the headless training runner.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub episodes: u32,
    pub seed: Option<u64>,
    pub match_duration: f64,
    pub tick_rate: f64,
    pub node_spacing: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            episodes: 20,
            seed: None,
            match_duration: 90.0,
            tick_rate: 50.0,
            node_spacing: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid { key: String, value: String },
    OutOfRange { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
            ConfigError::OutOfRange { key, value } => {
                write!(f, "{} must be positive, got {}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Read `DUELBOT_*` variables from the process environment. Call
    /// `dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            episodes: parse_var(&lookup, "DUELBOT_EPISODES")?.unwrap_or(defaults.episodes),
            seed: parse_var(&lookup, "DUELBOT_SEED")?,
            match_duration: parse_var(&lookup, "DUELBOT_MATCH_DURATION")?
                .unwrap_or(defaults.match_duration),
            tick_rate: parse_var(&lookup, "DUELBOT_TICK_RATE")?.unwrap_or(defaults.tick_rate),
            node_spacing: parse_var(&lookup, "DUELBOT_NODE_SPACING")?
                .unwrap_or(defaults.node_spacing),
        };

        require_positive("DUELBOT_MATCH_DURATION", config.match_duration)?;
        require_positive("DUELBOT_TICK_RATE", config.tick_rate)?;
        require_positive("DUELBOT_NODE_SPACING", config.node_spacing)?;
        Ok(config)
    }

    pub fn arena(&self) -> ArenaConfig {
        ArenaConfig {
            match_duration: self.match_duration,
            tick_rate: self.tick_rate,
            node_spacing: self.node_spacing,
            seed: self.seed,
            ..ArenaConfig::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key: key.to_string(),
                value,
            }),
    }
}

fn require_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_values_use_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_values_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DUELBOT_EPISODES", "5"),
            ("DUELBOT_SEED", " 42 "),
            ("DUELBOT_MATCH_DURATION", "30"),
            ("DUELBOT_TICK_RATE", "60.0"),
            ("DUELBOT_NODE_SPACING", "0.5"),
        ]))
        .unwrap();

        assert_eq!(config.episodes, 5);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.match_duration, 30.0);
        assert_eq!(config.tick_rate, 60.0);
        assert_eq!(config.node_spacing, 0.5);

        let arena = config.arena();
        assert_eq!(arena.seed, Some(42));
        assert_eq!(arena.node_spacing, 0.5);
        assert_eq!(arena.half_width, ArenaConfig::default().half_width);
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DUELBOT_EPISODES", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "DUELBOT_EPISODES".to_string(),
                value: "lots".to_string()
            }
        );
        assert!(err.to_string().contains("DUELBOT_EPISODES"));
    }

    #[test]
    fn test_non_positive_spacing_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("DUELBOT_NODE_SPACING", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }
}
