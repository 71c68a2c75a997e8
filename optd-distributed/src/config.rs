//! Session properties read by the optimizer.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use optd_core::heuristics::DEFAULT_MAX_PASSES;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Split aggregations into partial and final steps across exchanges when possible.
    pub prefer_partial_aggregation: bool,
    /// Upper bound on heuristic optimizer passes before giving up.
    pub optimizer_max_passes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prefer_partial_aggregation: true,
            optimizer_max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl SessionConfig {
    /// Parses a JSON object of session properties. Missing properties take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("failed to parse session properties")?;
        ensure!(
            value.is_object(),
            "session properties must be a JSON object, got {}",
            value
        );
        serde_json::from_value(value).context("failed to parse session properties")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::SessionConfig;

    #[test]
    fn missing_properties_take_defaults() {
        let config = SessionConfig::from_json(r#"{ "prefer_partial_aggregation": false }"#).unwrap();
        assert_eq!(
            config,
            SessionConfig {
                prefer_partial_aggregation: false,
                ..Default::default()
            }
        );
        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
    }

    #[test]
    fn rejects_unknown_properties() {
        assert!(SessionConfig::from_json(r#"{ "prefer_partial_agg": true }"#).is_err());
        assert!(SessionConfig::from_json("[]").is_err());
        assert!(SessionConfig::from_json("[false, 3]").is_err());
        assert!(SessionConfig::from_json("true").is_err());
    }
}
