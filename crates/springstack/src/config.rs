#![forbid(unsafe_code)]

//! Configuration as data.
//!
//! [`SpringstackConfig`] gathers everything about a component that is not
//! code (timing, the enter animation, routing options) so it can be loaded
//! from TOML or JSON at startup.
//!
//! ```toml
//! timing_mode = "reduced"
//!
//! [timing]
//! beat_ms = 120
//! morph_ease = "back.out(1.4)"
//!
//! [routing]
//! use_hash = true
//! on_missing_card = "push"
//! ```
//!
//! ```rust,ignore
//! let config = SpringstackConfig::from_toml_file("springstack.toml")?;
//! let stack = Springstack::from_config(initial, &config, scene)?;
//! ```
//!
//! Every field has a default, so an empty file yields the stock component.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::routing::{MissingCardPolicy, RoutingConfig};
use crate::springstack::EnterAnimationConfig;
use crate::timing::{TimingConfig, TimingMode, TimingOverrides};

/// Loadable component configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringstackConfig {
    pub timing_mode: TimingMode,
    /// Applied on top of the preset for `timing_mode`.
    pub timing: TimingOverrides,
    pub enter: EnterAnimationConfig,
    pub routing: RoutingSettings,
}

/// The data part of [`RoutingConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub enabled: bool,
    pub use_hash: bool,
    pub base_path: Option<String>,
    pub wait_for_card_ms: u64,
    pub on_missing_card: MissingCardPolicy,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            use_hash: false,
            base_path: None,
            wait_for_card_ms: 15_000,
            on_missing_card: MissingCardPolicy::Abort,
        }
    }
}

impl RoutingSettings {
    /// A routing config using the default codec.
    #[must_use]
    pub fn to_routing_config<D>(&self) -> RoutingConfig<D> {
        RoutingConfig {
            enabled: self.enabled,
            use_hash: self.use_hash,
            base_path: self.base_path.clone(),
            parse: None,
            serialize: None,
            wait_for_card_ms: self.wait_for_card_ms,
            on_missing_card: self.on_missing_card,
        }
    }
}

impl SpringstackConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.checked()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.checked()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// The timing this configuration resolves to.
    #[must_use]
    pub fn timing_config(&self) -> TimingConfig {
        TimingConfig::preset(self.timing_mode).with_overrides(&self.timing)
    }

    /// Problems with this configuration; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.timing_config().validate();

        if self.enter.selector.trim().is_empty() {
            errors.push("enter.selector must not be empty".into());
        }

        if let Some(base) = &self.routing.base_path {
            if base.contains(['?', '#']) {
                errors.push(format!(
                    "routing.base_path must not contain a query or fragment, got {base:?}"
                ));
            }
        }

        if self.routing.on_missing_card != MissingCardPolicy::Wait && self.routing.wait_for_card_ms == 0 {
            errors.push("routing.wait_for_card_ms must be > 0 unless on_missing_card = \"wait\"".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Ease;

    #[test]
    fn empty_toml_is_the_default() {
        let config = SpringstackConfig::from_toml_str("").unwrap();
        assert_eq!(config, SpringstackConfig::default());
        assert!(config.validate().is_empty());
        assert!(config.routing.enabled);
        assert_eq!(config.routing.wait_for_card_ms, 15_000);
    }

    #[test]
    fn toml_sections_apply() {
        let config = SpringstackConfig::from_toml_str(
            r#"
timing_mode = "exaggerated"

[timing]
beat_ms = 120
morph_ease = "back.out(1.4)"

[enter]
duration_ms = 300

[routing]
use_hash = true
base_path = "/app"
on_missing_card = "push"
"#,
        )
        .unwrap();
        assert_eq!(config.timing_mode, TimingMode::Gratuitous);
        let timing = config.timing_config();
        assert_eq!(timing.beat_ms, 120);
        assert_eq!(timing.morph_ease, "back.out(1.4)".parse::<Ease>().unwrap());
        assert_eq!(config.enter.duration_ms, 300);
        assert_eq!(config.enter.stagger_ms, 40);
        assert!(config.routing.use_hash);
        assert_eq!(config.routing.on_missing_card, MissingCardPolicy::Push);

        let routing: RoutingConfig<()> = config.routing.to_routing_config();
        assert_eq!(routing.base_path.as_deref(), Some("/app"));
        assert!(routing.parse.is_none());
    }

    #[test]
    fn json_loads_too() {
        let config = SpringstackConfig::from_json_str(
            r#"{"timing_mode": "off", "routing": {"enabled": false}}"#,
        )
        .unwrap();
        assert_eq!(config.timing_mode, TimingMode::Off);
        assert!(!config.routing.enabled);
    }

    #[test]
    fn unknown_ease_is_a_parse_error() {
        let err = SpringstackConfig::from_toml_str("[timing]\ntrack_ease = \"wobble\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = SpringstackConfig::from_json_str(
            r#"{"timing": {"push_pause_beats": -1.0}, "enter": {"selector": " "}, "routing": {"wait_for_card_ms": 0}}"#,
        )
        .unwrap_err();
        let ConfigError::Invalid(errors) = err else {
            panic!("expected validation errors, got {err}");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn missing_file_is_io() {
        let err = SpringstackConfig::from_toml_file("/nonexistent/springstack.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
