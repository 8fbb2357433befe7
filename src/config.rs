//! Agent argument strings.
//!
//! Agents are configured with whitespace-separated `key=value` tokens such as
//! `"name=td alpha=0.1 leda=0.95 seed=1"`. Later tokens overwrite earlier
//! ones, so role defaults are parsed first and user input last. Keys an agent
//! does not recognize are kept and ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Parsed `key=value` meta map of one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentArgs {
    meta: BTreeMap<String, String>,
}

impl AgentArgs {
    /// Parse `defaults` then `args`; a token without `=` maps to itself.
    ///
    /// ```
    /// use threes_td::config::AgentArgs;
    /// let args = AgentArgs::parse("name=td role=player", "alpha=0.05 name=learner");
    /// assert_eq!(args.name(), "learner");
    /// assert_eq!(args.get::<f32>("alpha").unwrap(), Some(0.05));
    /// ```
    pub fn parse(defaults: &str, args: &str) -> Self {
        let mut out = AgentArgs::default();
        for token in defaults.split_whitespace().chain(args.split_whitespace()) {
            out.notify(token);
        }
        out
    }

    /// Set one `key=value` entry.
    pub fn notify(&mut self, msg: &str) {
        let (key, value) = msg.split_once('=').unwrap_or((msg, msg));
        self.meta.insert(key.to_string(), value.to_string());
    }

    /// Raw string value of `key`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool { self.meta.contains_key(key) }

    /// Typed value of `key`; `Ok(None)` when absent.
    pub fn get<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.meta.get(key) {
            None => Ok(None),
            Some(value) => value.parse::<T>().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.clone(),
            }),
        }
    }

    /// Typed value of `key`, or `default` when absent.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Seed for the agent's generator, if one was given.
    ///
    /// Integers are taken as is; a non-negative decimal such as `1.0` or
    /// `7.9` is truncated toward zero.
    pub fn seed(&self) -> Result<Option<u64>, ConfigError> {
        let Some(value) = self.property("seed") else { return Ok(None) };
        if let Ok(seed) = value.parse::<u64>() {
            return Ok(Some(seed));
        }
        match value.parse::<f64>() {
            Ok(seed) if seed.is_finite() && seed >= 0.0 && seed < u64::MAX as f64 => {
                Ok(Some(seed.trunc() as u64))
            }
            _ => Err(ConfigError::InvalidValue { key: "seed".into(), value: value.to_owned() }),
        }
    }

    pub fn name(&self) -> &str { self.property("name").unwrap_or("unknown") }

    pub fn role(&self) -> &str { self.property("role").unwrap_or("unknown") }
}

impl fmt::Display for AgentArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.meta {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_tokens_win() {
        let args = AgentArgs::parse("name=unknown role=player", "name=td alpha=0.2 alpha=0.3");
        assert_eq!(args.name(), "td");
        assert_eq!(args.role(), "player");
        assert_eq!(args.get::<f32>("alpha").unwrap(), Some(0.3));
    }

    #[test]
    fn missing_and_bad_values() {
        let args = AgentArgs::parse("", "alpha=abc bare");
        assert_eq!(args.get::<f32>("leda").unwrap(), None);
        assert_eq!(args.get_or::<f32>("leda", 1.0).unwrap(), 1.0);
        assert_eq!(
            args.get::<f32>("alpha"),
            Err(ConfigError::InvalidValue { key: "alpha".into(), value: "abc".into() })
        );
        assert_eq!(args.property("bare"), Some("bare"));
        assert_eq!(args.name(), "unknown");
    }

    #[test]
    fn seed_and_display() {
        let mut args = AgentArgs::parse("role=environment", "seed=42");
        assert_eq!(args.seed().unwrap(), Some(42));
        args.notify("save=w.bin");
        assert!(args.contains("save"));
        assert_eq!(args.to_string(), "role=environment save=w.bin seed=42");
    }

    #[test]
    fn decimal_seed_is_truncated() {
        assert_eq!(AgentArgs::parse("", "seed=1.0").seed().unwrap(), Some(1));
        assert_eq!(AgentArgs::parse("", "seed=7.9").seed().unwrap(), Some(7));
        assert_eq!(AgentArgs::parse("", "").seed().unwrap(), None);
        for bad in ["seed=-1", "seed=-0.5", "seed=nan", "seed=inf", "seed=x"] {
            let value = bad.trim_start_matches("seed=");
            assert_eq!(
                AgentArgs::parse("", bad).seed(),
                Err(ConfigError::InvalidValue { key: "seed".into(), value: value.into() })
            );
        }
    }
}
