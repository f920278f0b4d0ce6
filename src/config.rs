//! Processor configuration.
//!
//! Configuration arrives already loaded; this module only deserializes it
//! from JSON and checks that every statement group targets a context its
//! signal provides.
//!
//! ```ignore
//! {
//!   "error_mode": "ignore",
//!   "metric_statements": [
//!     { "context": "metric", "statements": ["convert_sum_to_gauge()"] }
//!   ],
//!   "log_statements": [
//!     { "context": "log", "statements": ["truncate_all(attributes, 256)"] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::transform::ErrorMode;

/// Context a statement group runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Metric,
    Datapoint,
    Log,
    Span,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextKind::Metric => "metric",
            ContextKind::Datapoint => "datapoint",
            ContextKind::Log => "log",
            ContextKind::Span => "span",
        })
    }
}

/// Statements sharing one context, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextStatements {
    pub context: ContextKind,
    pub statements: Vec<String>,
}

impl ContextStatements {
    pub fn new<S: Into<String>>(
        context: ContextKind,
        statements: impl IntoIterator<Item = S>,
    ) -> Self {
        ContextStatements {
            context,
            statements: statements.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    pub error_mode: ErrorMode,
    pub metric_statements: Vec<ContextStatements>,
    pub log_statements: Vec<ContextStatements>,
    pub trace_statements: Vec<ContextStatements>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{signal} statements cannot run in the `{context}` context")]
    WrongContext {
        signal: &'static str,
        context: ContextKind,
    },
}

impl TransformConfig {
    /// Deserialize and validate a JSON configuration.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: TransformConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Every group must name a context that belongs to its signal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_groups(
            "metric",
            &self.metric_statements,
            &[ContextKind::Metric, ContextKind::Datapoint],
        )?;
        check_groups("log", &self.log_statements, &[ContextKind::Log])?;
        check_groups("trace", &self.trace_statements, &[ContextKind::Span])
    }
}

fn check_groups(
    signal: &'static str,
    groups: &[ContextStatements],
    allowed: &[ContextKind],
) -> Result<(), ConfigError> {
    match groups.iter().find(|g| !allowed.contains(&g.context)) {
        Some(group) => Err(ConfigError::WrongContext {
            signal,
            context: group.context,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let json = br#"{
            "error_mode": "ignore",
            "metric_statements": [
                {"context": "datapoint", "statements": ["set(attributes[\"a\"], 1)"]}
            ],
            "trace_statements": [
                {"context": "span", "statements": []}
            ]
        }"#;
        let config = TransformConfig::from_json(json).unwrap();
        assert_eq!(config.error_mode, ErrorMode::Ignore);
        assert_eq!(config.metric_statements[0].context, ContextKind::Datapoint);
        assert!(config.log_statements.is_empty());
        assert_eq!(config.trace_statements.len(), 1);
    }

    #[test]
    fn empty_object_is_default() {
        let config = TransformConfig::from_json(b"{}").unwrap();
        assert_eq!(config, TransformConfig::default());
        assert_eq!(config.error_mode, ErrorMode::Propagate);
    }

    #[test]
    fn rejects_foreign_context() {
        let json = br#"{"log_statements": [{"context": "span", "statements": []}]}"#;
        let err = TransformConfig::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::WrongContext {
                signal: "log",
                context: ContextKind::Span
            }
        ));
        assert_eq!(
            err.to_string(),
            "log statements cannot run in the `span` context"
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            TransformConfig::from_json(br#"{"metric_statement": []}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
