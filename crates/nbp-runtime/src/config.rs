#![forbid(unsafe_code)]

//! Presence tunables as data.
//!
//! [`PresenceConfig`] groups every timing and layout constant used by the
//! surfaces. With the `config-file` feature it can be loaded from TOML or
//! JSON:
//!
//! ```toml
//! stale_layout_passes = 30
//!
//! [decay]
//! interval_ms = 800
//!
//! [roster]
//! max_avatars = 5
//! names = "fallback"
//!
//! [labels]
//! names = "skip"
//! ```
//!
//! Missing sections and fields keep their defaults.

#[cfg(feature = "config-file")]
use std::path::Path;

use core::time::Duration;

use nbp_core::NamePolicy;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

/// Top-level presence configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct PresenceConfig {
    /// Evict a scoped overlay after this many consecutive passes without
    /// layout. `None` retains it indefinitely.
    #[cfg_attr(feature = "config-file", serde(skip_serializing_if = "Option::is_none"))]
    pub stale_layout_passes: Option<u32>,
    /// Cursor label fade-out.
    pub decay: DecayPolicyConfig,
    /// Hover modal timing and placement.
    pub modal: ModalPolicyConfig,
    /// Toolbar roster.
    pub roster: RosterPolicyConfig,
    /// Per-cell indicators.
    pub cells: CellPolicyConfig,
    /// Floating cursor labels.
    pub labels: LabelPolicyConfig,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            stale_layout_passes: None,
            decay: DecayPolicyConfig::default(),
            modal: ModalPolicyConfig::default(),
            roster: RosterPolicyConfig::default(),
            cells: CellPolicyConfig::default(),
            labels: LabelPolicyConfig::default(),
        }
    }
}

/// Label decay parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct DecayPolicyConfig {
    /// Idle time before a label hides. Default: 500.
    pub interval_ms: u64,
}

impl Default for DecayPolicyConfig {
    fn default() -> Self {
        Self { interval_ms: 500 }
    }
}

/// Modal parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ModalPolicyConfig {
    /// Debounce before a scheduled hide takes effect. Default: 200.
    pub hide_delay_ms: u64,
    /// Distance between anchor and modal. Default: 6.
    pub gap_px: f64,
    /// Minimum distance from the viewport edge. Default: 8.
    pub viewport_margin_px: f64,
}

impl Default for ModalPolicyConfig {
    fn default() -> Self {
        Self {
            hide_delay_ms: 200,
            gap_px: 6.0,
            viewport_margin_px: 8.0,
        }
    }
}

/// Roster parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct RosterPolicyConfig {
    /// Avatars shown before the overflow chip. Default: 3.
    pub max_avatars: usize,
    /// Missing-name handling. Default: fallback.
    #[cfg_attr(
        feature = "config-file",
        serde(
            serialize_with = "serialize_name_policy",
            deserialize_with = "deserialize_name_policy"
        )
    )]
    pub names: NamePolicy,
}

impl Default for RosterPolicyConfig {
    fn default() -> Self {
        Self {
            max_avatars: 3,
            names: NamePolicy::Fallback,
        }
    }
}

/// Cell indicator parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct CellPolicyConfig {
    /// Missing-name handling. Default: fallback.
    #[cfg_attr(
        feature = "config-file",
        serde(
            serialize_with = "serialize_name_policy",
            deserialize_with = "deserialize_name_policy"
        )
    )]
    pub names: NamePolicy,
}

impl Default for CellPolicyConfig {
    fn default() -> Self {
        Self {
            names: NamePolicy::Fallback,
        }
    }
}

/// Cursor label parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct LabelPolicyConfig {
    /// Missing-name handling. Default: skip (no label for unnamed users).
    #[cfg_attr(
        feature = "config-file",
        serde(
            serialize_with = "serialize_name_policy",
            deserialize_with = "deserialize_name_policy"
        )
    )]
    pub names: NamePolicy,
}

impl Default for LabelPolicyConfig {
    fn default() -> Self {
        Self {
            names: NamePolicy::Skip,
        }
    }
}

impl PresenceConfig {
    #[must_use]
    pub fn with_decay_interval(mut self, interval: Duration) -> Self {
        self.decay.interval_ms = duration_to_ms(interval);
        self
    }

    #[must_use]
    pub fn with_modal_hide_delay(mut self, delay: Duration) -> Self {
        self.modal.hide_delay_ms = duration_to_ms(delay);
        self
    }

    #[must_use]
    pub fn with_roster_max_avatars(mut self, max: usize) -> Self {
        self.roster.max_avatars = max;
        self
    }

    #[must_use]
    pub fn with_stale_layout_passes(mut self, passes: Option<u32>) -> Self {
        self.stale_layout_passes = passes;
        self
    }

    /// Set the missing-name policy of the roster, cell, and label surfaces.
    #[must_use]
    pub fn with_name_policies(
        mut self,
        roster: NamePolicy,
        cells: NamePolicy,
        labels: NamePolicy,
    ) -> Self {
        self.roster.names = roster;
        self.cells.names = cells;
        self.labels.names = labels;
        self
    }

    pub fn decay_interval(&self) -> Duration {
        Duration::from_millis(self.decay.interval_ms)
    }

    pub fn modal_hide_delay(&self) -> Duration {
        Duration::from_millis(self.modal.hide_delay_ms)
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Serialize to TOML.
    #[cfg(feature = "config-file")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlSer)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.decay.interval_ms == 0 {
            errors.push("decay.interval_ms must be > 0".into());
        }

        if self.roster.max_avatars == 0 {
            errors.push("roster.max_avatars must be > 0".into());
        }

        if !self.modal.gap_px.is_finite() || self.modal.gap_px < 0.0 {
            errors.push(format!(
                "modal.gap_px must be finite and >= 0, got {}",
                self.modal.gap_px
            ));
        }

        if !self.modal.viewport_margin_px.is_finite() || self.modal.viewport_margin_px < 0.0 {
            errors.push(format!(
                "modal.viewport_margin_px must be finite and >= 0, got {}",
                self.modal.viewport_margin_px
            ));
        }

        if self.stale_layout_passes == Some(0) {
            errors.push("stale_layout_passes must be > 0 when set".into());
        }

        errors
    }

    /// [`validate`](Self::validate), as a `Result`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Errors from loading or validating a [`PresenceConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// TOML serialization error.
    #[cfg(feature = "config-file")]
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => write!(f, "TOML serialize error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::TomlSer(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(feature = "config-file")]
fn serialize_name_policy<S>(policy: &NamePolicy, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let s = match policy {
        NamePolicy::Fallback => "fallback",
        NamePolicy::Skip => "skip",
    };
    serializer.serialize_str(s)
}

#[cfg(feature = "config-file")]
fn deserialize_name_policy<'de, D>(deserializer: D) -> Result<NamePolicy, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.as_str() {
        "fallback" | "Fallback" => Ok(NamePolicy::Fallback),
        "skip" | "Skip" => Ok(NamePolicy::Skip),
        other => Err(serde::de::Error::custom(format!(
            "unknown name policy: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PresenceConfig::default();
        assert_eq!(config.decay_interval(), Duration::from_millis(500));
        assert_eq!(config.modal_hide_delay(), Duration::from_millis(200));
        assert_eq!(config.roster.max_avatars, 3);
        assert_eq!(config.roster.names, NamePolicy::Fallback);
        assert_eq!(config.cells.names, NamePolicy::Fallback);
        assert_eq!(config.labels.names, NamePolicy::Skip);
        assert_eq!(config.stale_layout_passes, None);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn builders_override() {
        let config = PresenceConfig::default()
            .with_decay_interval(Duration::from_millis(750))
            .with_modal_hide_delay(Duration::from_millis(50))
            .with_roster_max_avatars(5)
            .with_stale_layout_passes(Some(10))
            .with_name_policies(NamePolicy::Skip, NamePolicy::Skip, NamePolicy::Fallback);
        assert_eq!(config.decay.interval_ms, 750);
        assert_eq!(config.modal.hide_delay_ms, 50);
        assert_eq!(config.roster.max_avatars, 5);
        assert_eq!(config.stale_layout_passes, Some(10));
        assert_eq!(config.labels.names, NamePolicy::Fallback);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = PresenceConfig::default()
            .with_roster_max_avatars(0)
            .with_stale_layout_passes(Some(0));
        config.decay.interval_ms = 0;
        config.modal.gap_px = f64::NAN;
        config.modal.viewport_margin_px = -1.0;
        let errors = config.validate();
        assert_eq!(errors.len(), 5, "{errors:?}");
    }

    #[test]
    fn validated_wraps_errors() {
        let err = PresenceConfig::default()
            .with_roster_max_avatars(0)
            .validated()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation errors: roster.max_avatars must be > 0"
        );
    }

    #[cfg(feature = "config-file")]
    mod file {
        use super::*;
        use std::io::Write;

        #[test]
        fn partial_toml_keeps_defaults() {
            let text = "stale_layout_passes = 30\n\
                        [decay]\ninterval_ms = 800\n\
                        [labels]\nnames = \"fallback\"\n";
            let config = PresenceConfig::from_toml_str(text).unwrap();
            assert_eq!(config.decay.interval_ms, 800);
            assert_eq!(config.stale_layout_passes, Some(30));
            assert_eq!(config.labels.names, NamePolicy::Fallback);
            assert_eq!(config.roster.max_avatars, 3);
            assert_eq!(config.modal.hide_delay_ms, 200);
        }

        #[test]
        fn empty_sections_keep_per_surface_name_defaults() {
            let config = PresenceConfig::from_json_str(r#"{"cells":{},"labels":{}}"#).unwrap();
            assert_eq!(config.cells.names, NamePolicy::Fallback);
            assert_eq!(config.labels.names, NamePolicy::Skip);

            let config = PresenceConfig::from_toml_str("[labels]\n[roster]\nmax_avatars = 2\n")
                .unwrap();
            assert_eq!(config.labels.names, NamePolicy::Skip);
            assert_eq!(config.roster.max_avatars, 2);
        }

        #[test]
        fn json_loads() {
            let config =
                PresenceConfig::from_json_str(r#"{"roster":{"max_avatars":4,"names":"skip"}}"#)
                    .unwrap();
            assert_eq!(config.roster.max_avatars, 4);
            assert_eq!(config.roster.names, NamePolicy::Skip);
        }

        #[test]
        fn unknown_policy_is_rejected() {
            let err = PresenceConfig::from_toml_str("[cells]\nnames = \"maybe\"\n").unwrap_err();
            assert!(err.to_string().contains("unknown name policy"));
        }

        #[test]
        fn toml_file_roundtrip() {
            let original = PresenceConfig::default().with_roster_max_avatars(6);
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(original.to_toml_string().unwrap().as_bytes())
                .unwrap();
            let loaded = PresenceConfig::from_toml_file(file.path()).unwrap();
            assert_eq!(loaded, original);
        }

        #[test]
        fn missing_file_is_io_error() {
            let err = PresenceConfig::from_toml_file("/nonexistent/nbp.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)));
        }
    }
}
