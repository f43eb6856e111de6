//! Engine configuration.
//!
//! `SyncSettings` controls how inbound records are matched and when a
//! same-source re-sync is treated as a conflict. Values come from defaults,
//! a serialized config, or `RAPPORT_*` environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::normalize_text_option;

const CONFLICT_POLICY_VAR: &str = "RAPPORT_CONFLICT_POLICY";
const EMAIL_MATCHING_VAR: &str = "RAPPORT_EMAIL_MATCHING";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// When a same-source re-sync with an older remote clock becomes a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Local clock ahead of the remote one is always a conflict
    #[default]
    Timestamp,
    /// Local clock ahead is a conflict only if some profile field differs
    FieldDiff,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp => f.write_str("timestamp"),
            Self::FieldDiff => f.write_str("field_diff"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "timestamp" => Ok(Self::Timestamp),
            "field_diff" => Ok(Self::FieldDiff),
            other => Err(ConfigError::Invalid(format!(
                "{CONFLICT_POLICY_VAR} must be `timestamp` or `field_diff`, got `{other}`"
            ))),
        }
    }
}

/// Tunables for the identity resolution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Fall back to same-owner email matching when the external id misses
    #[serde(default = "default_email_matching")]
    pub email_matching: bool,
}

const fn default_email_matching() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            email_matching: default_email_matching(),
        }
    }
}

impl SyncSettings {
    /// Read settings from `RAPPORT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(raw) = normalize_text_option(lookup(CONFLICT_POLICY_VAR)) {
            settings.conflict_policy = raw.parse()?;
        }

        if let Some(raw) = normalize_text_option(lookup(EMAIL_MATCHING_VAR)) {
            settings.email_matching = parse_bool(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{EMAIL_MATCHING_VAR} must be a boolean, got `{raw}`"))
            })?;
        }

        Ok(settings)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
