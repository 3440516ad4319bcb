#![forbid(unsafe_code)]

//! Error types.
//!
//! Navigation itself never fails: every queued operation resolves even when
//! a transition degrades. These errors cover the two places where input is
//! parsed up front, ease names and configuration files.

use thiserror::Error;

/// An ease name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EaseError {
    #[error("unknown ease `{0}`")]
    Unknown(String),
    #[error("ease `{name}` has invalid arguments `{args}`")]
    BadArguments { name: String, args: String },
}

/// Errors that can occur when loading a [`SpringstackConfig`](crate::SpringstackConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Errors raised while assembling a controller or component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("initial stack must contain at least one node")]
    EmptyInitialStack,
}
