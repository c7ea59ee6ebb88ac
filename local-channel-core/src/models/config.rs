use serde::{Deserialize, Serialize};

use super::error::LocalError;

/// Jitterbuffer settings applied to the owner-side of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterBufferConfig {
    /// Only honoured for pairs created with both `n` and `j`.
    pub enabled: bool,
    pub force: bool,
    pub log: bool,
    /// Maximum buffer size in ms (-1 = implementation default).
    pub max_size: i64,
    /// Resync threshold in ms (-1 = implementation default).
    pub resync_threshold: i64,
    /// Implementation name, e.g. "fixed" or "adaptive" (empty = default).
    pub implementation: String,
    pub target_extra: i64,
}

impl Default for JitterBufferConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            force: false,
            log: false,
            max_size: -1,
            resync_threshold: -1,
            implementation: String::new(),
            target_extra: -1,
        }
    }
}

/// Drops inherited variables that would leak signalling headers through a pair.
///
/// A variable is skipped when its name contains `name_contains` and its value
/// contains `value_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableFilter {
    pub name_contains: String,
    pub value_contains: String,
}

impl VariableFilter {
    pub fn matches(&self, name: &str, value: &str) -> bool {
        name.contains(&self.name_contains) && value.contains(&self.value_contains)
    }
}

impl Default for VariableFilter {
    fn default() -> Self {
        Self {
            name_contains: "SIPADDHEADER".into(),
            value_contains: "Alert-Info".into(),
        }
    }
}

/// Configuration for the Local technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Context used when a destination has no `@context` (default: "default").
    pub default_context: String,

    /// Jitterbuffer template; `enabled` is decided per pair.
    pub jitterbuffer: JitterBufferConfig,

    /// Inherited-variable filter applied on call (None = inherit everything).
    pub inherit_filter: Option<VariableFilter>,

    /// Application name whose marker is carried onto the chan-side (default: "Queue").
    pub queue_application: String,
}

impl LocalConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_context.is_empty() {
            return Err("default context must not be empty".into());
        }
        if let Some(filter) = &self.inherit_filter {
            if filter.name_contains.is_empty() {
                return Err("inherit filter needs a name pattern".into());
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, LocalError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LocalError::InvalidConfig(format!("failed to parse config: {}", e)))?;
        config.validate().map_err(LocalError::InvalidConfig)?;
        Ok(config)
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            default_context: "default".into(),
            jitterbuffer: JitterBufferConfig::default(),
            inherit_filter: Some(VariableFilter::default()),
            queue_application: "Queue".into(),
        }
    }
}
