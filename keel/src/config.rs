//! Engine configuration

use serde::Deserialize;

use crate::types::{KeelError, KeelResult};

/// Tunables of an `Engine`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log every statement and its parameters at debug level under `keel::sql`
    pub log_statements: bool,
    /// Fail writes that reference an unsaved entity instead of omitting the column
    pub strict_references: bool,
    /// How many levels of eager foreign keys a lookup follows; `None` is unbounded
    pub max_resolve_depth: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_statements: true,
            strict_references: false,
            max_resolve_depth: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> KeelResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| KeelError::configuration("EngineConfig", e.to_string()))
    }

    /// Defaults overridden by `KEEL_LOG_STATEMENTS`, `KEEL_STRICT_REFERENCES` and
    /// `KEEL_MAX_RESOLVE_DEPTH`
    pub fn from_env() -> KeelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> KeelResult<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup("KEEL_LOG_STATEMENTS") {
            config.log_statements = parse_flag("KEEL_LOG_STATEMENTS", &raw)?;
        }
        if let Some(raw) = lookup("KEEL_STRICT_REFERENCES") {
            config.strict_references = parse_flag("KEEL_STRICT_REFERENCES", &raw)?;
        }
        if let Some(raw) = lookup("KEEL_MAX_RESOLVE_DEPTH") {
            let raw = raw.trim();
            config.max_resolve_depth = if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(raw.parse().map_err(|_| {
                    KeelError::configuration(
                        "EngineConfig",
                        format!("KEEL_MAX_RESOLVE_DEPTH must be a number, got '{}'", raw),
                    )
                })?)
            };
        }
        Ok(config)
    }
}

fn parse_flag(key: &str, raw: &str) -> KeelResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(KeelError::configuration(
            "EngineConfig",
            format!("{} must be a boolean, got '{}'", key, other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_fills_missing_keys_with_defaults() {
        let config = EngineConfig::from_json(r#"{"max_resolve_depth": 2}"#).unwrap();
        assert_eq!(config.max_resolve_depth, Some(2));
        assert!(config.log_statements);
        assert!(!config.strict_references);
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        assert!(matches!(
            EngineConfig::from_json("{"),
            Err(KeelError::Configuration { .. })
        ));
    }

    #[test]
    fn environment_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("KEEL_LOG_STATEMENTS", "off"),
            ("KEEL_STRICT_REFERENCES", "1"),
            ("KEEL_MAX_RESOLVE_DEPTH", "3"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(
            config,
            EngineConfig {
                log_statements: false,
                strict_references: true,
                max_resolve_depth: Some(3),
            }
        );
    }

    #[test]
    fn bad_flag_is_rejected() {
        let result = EngineConfig::from_lookup(|k| {
            (k == "KEEL_STRICT_REFERENCES").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }
}
