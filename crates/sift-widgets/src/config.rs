#![forbid(unsafe_code)]

//! Declarative filterable configuration (`policy-config` feature).
//!
//! A [`FilterableConfig`] is the serializable subset of
//! [`FilterableOptions`]: selectors are kept as text and parsed by
//! [`FilterableConfig::into_options`], and the predicate is picked by
//! [`MatchMode`] rather than supplied as a closure.
//!
//! ```toml
//! input = "#search"
//! filter = "li.entry"
//! delay_ms = 250
//! match_mode = "substring"
//! case_sensitive = false
//! ```
//!
//! Unknown keys are rejected.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_core::{Selector, SelectorError};

use crate::filterable::{FilterableOptions, InputSource, ItemFilter, predicate};

/// How the query is matched against item text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Query is a regular expression; invalid patterns match literally.
    #[default]
    Regex,
    /// Query is a plain substring.
    Substring,
}

/// Serializable filterable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FilterableConfig {
    /// Input selector; absent means an owned input is created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Item selector below the container; absent means direct children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub delay_ms: u64,
    pub match_mode: MatchMode,
    pub case_sensitive: bool,
}

impl Default for FilterableConfig {
    fn default() -> Self {
        Self {
            input: None,
            filter: None,
            delay_ms: 1000,
            match_mode: MatchMode::Regex,
            case_sensitive: false,
        }
    }
}

/// Failure to load or apply a [`FilterableConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Toml(toml::de::Error),
    Json(serde_json::Error),
    /// A selector field did not parse.
    InvalidSelector {
        field: &'static str,
        source: SelectorError,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toml(e) => write!(f, "invalid filterable config TOML: {e}"),
            Self::Json(e) => write!(f, "invalid filterable config JSON: {e}"),
            Self::InvalidSelector { field, source } => {
                write!(f, "invalid `{field}` selector: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::InvalidSelector { source, .. } => Some(source),
        }
    }
}

impl FilterableConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Toml)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Json)
    }

    /// Validate selectors and build the runtime options.
    pub fn into_options(self) -> Result<FilterableOptions, ConfigError> {
        let parse = |field: &'static str, text: &str| {
            Selector::parse(text).map_err(|source| ConfigError::InvalidSelector { field, source })
        };
        let input = match self.input.as_deref() {
            Some(text) => InputSource::Selector(parse("input", text)?),
            None => InputSource::Owned,
        };
        let filter = match self.filter.as_deref() {
            Some(text) => ItemFilter::Selector(parse("filter", text)?),
            None => ItemFilter::Children,
        };
        let visible = match self.match_mode {
            MatchMode::Regex => predicate::regex_match_with(self.case_sensitive),
            MatchMode::Substring => predicate::substring(self.case_sensitive),
        };
        tracing::debug!(
            input = ?self.input,
            filter = ?self.filter,
            delay_ms = self.delay_ms,
            mode = ?self.match_mode,
            "filterable config applied"
        );
        Ok(FilterableOptions::new()
            .input(input)
            .filter(filter)
            .delay(Duration::from_millis(self.delay_ms))
            .visible(visible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let cfg = FilterableConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, FilterableConfig::default());
        let opts = cfg.into_options().unwrap();
        assert!(opts.input_source().is_owned());
        assert_eq!(opts.delay_value(), Duration::from_millis(1000));
    }

    #[test]
    fn toml_fields() {
        let cfg = FilterableConfig::from_toml_str(
            r##"
            input = "#search"
            filter = "li.entry"
            delay_ms = 250
            match_mode = "substring"
            case_sensitive = true
            "##,
        )
        .unwrap();
        assert_eq!(cfg.input.as_deref(), Some("#search"));
        assert_eq!(cfg.match_mode, MatchMode::Substring);
        assert!(cfg.case_sensitive);
        let opts = cfg.into_options().unwrap();
        assert!(matches!(opts.input_source(), InputSource::Selector(s) if s.as_str() == "#search"));
        assert!(matches!(opts.item_filter(), ItemFilter::Selector(_)));
        assert_eq!(opts.delay_value(), Duration::from_millis(250));
    }

    #[test]
    fn json_fields() {
        let cfg = FilterableConfig::from_json_str(r#"{"delay_ms": 0, "match_mode": "regex"}"#)
            .unwrap();
        assert_eq!(cfg.delay_ms, 0);
        assert_eq!(cfg.match_mode, MatchMode::Regex);
        assert_eq!(cfg.input, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FilterableConfig::from_toml_str("delay = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let err = FilterableConfig::from_json_str(r#"{"mode": "regex"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn bad_selector_names_the_field() {
        let cfg = FilterableConfig {
            filter: Some("li > a".into()),
            ..FilterableConfig::default()
        };
        let err = cfg.into_options().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { field: "filter", .. }));
        assert!(err.to_string().starts_with("invalid `filter` selector"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn serializes_without_absent_selectors() {
        let json = serde_json::to_string(&FilterableConfig::default()).unwrap();
        assert!(!json.contains("input"));
        assert!(json.contains("\"match_mode\":\"regex\""));
    }
}
