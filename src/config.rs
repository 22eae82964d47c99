//! Configuration for frame placement and index discovery.
//!
//! Every field has a default, so a config can be loaded from a partial JSON
//! or TOML document.
//!
//! ```rust
//! use spatio_frames::{Config, PolicyKind};
//!
//! let json = r#"{
//!     "locator": { "policy": "spatial_burst", "num_frames": 4, "burst_factor": 2 }
//! }"#;
//! let config = Config::from_json(json)?;
//! assert_eq!(config.locator.policy, PolicyKind::SpatialBurst);
//! assert_eq!(config.discovery.master_prefix, "_master");
//! # Ok::<(), spatio_frames::FrameError>(())
//! ```

use crate::error::{FrameError, Result};
use crate::locator::{PlacementPolicy, PolicyKind};
use serde::{Deserialize, Serialize};

const DEFAULT_COMPACT_EXTENSIONS: &[&str] = &["heap", "rtree", "r+tree", "str", "str+"];
const DEFAULT_REPLICATED_EXTENSIONS: &[&str] = &["grid", "r+tree", "str+"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub locator: LocatorConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// How grid cells are placed into frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocatorConfig {
    #[serde(default)]
    pub policy: PolicyKind,

    /// Target number of frames. `None` means one frame per grid cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_frames: Option<u32>,

    /// Consecutive chained cells per frame for the spatial burst policy
    #[serde(default = "LocatorConfig::default_burst_factor")]
    pub burst_factor: u32,

    /// Prefix of the file each frame is written to
    #[serde(default = "LocatorConfig::default_frame_file_prefix")]
    pub frame_file_prefix: String,
}

impl LocatorConfig {
    const fn default_burst_factor() -> u32 {
        3
    }

    fn default_frame_file_prefix() -> String {
        "part-".to_string()
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_num_frames(mut self, num_frames: u32) -> Self {
        self.num_frames = Some(num_frames);
        self
    }

    pub fn with_burst_factor(mut self, burst_factor: u32) -> Self {
        self.burst_factor = burst_factor;
        self
    }

    pub fn with_frame_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.frame_file_prefix = prefix.into();
        self
    }

    /// The placement policy this config selects.
    pub fn placement_policy(&self) -> PlacementPolicy {
        PlacementPolicy::from_kind(self.policy, self.burst_factor)
    }

    /// Frame count to use for a grid of `grid_len` cells.
    pub fn frames_for(&self, grid_len: usize) -> u32 {
        self.num_frames
            .unwrap_or_else(|| u32::try_from(grid_len).unwrap_or(u32::MAX))
    }

    /// Filename of frame `frame_id`.
    pub fn frame_filename(&self, frame_id: u32) -> String {
        format!("{}{:05}", self.frame_file_prefix, frame_id)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_frames == Some(0) {
            return Err(FrameError::InvalidConfiguration(
                "num_frames must be greater than zero".into(),
            ));
        }

        if self.burst_factor == 0 {
            return Err(FrameError::InvalidConfiguration(
                "burst_factor must be greater than zero".into(),
            ));
        }

        if self
            .frame_file_prefix
            .contains(|c: char| matches!(c, '/' | '\\' | ',' | '\n'))
        {
            return Err(FrameError::InvalidConfiguration(format!(
                "frame_file_prefix '{}' contains a reserved character",
                self.frame_file_prefix
            )));
        }

        Ok(())
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            num_frames: None,
            burst_factor: Self::default_burst_factor(),
            frame_file_prefix: Self::default_frame_file_prefix(),
        }
    }
}

/// How a directory is searched for an existing global index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Master files are the files whose name starts with this prefix
    #[serde(default = "DiscoveryConfig::default_master_prefix")]
    pub master_prefix: String,

    /// Master file extensions whose partitions are compact
    #[serde(default = "DiscoveryConfig::default_compact_extensions")]
    pub compact_extensions: Vec<String>,

    /// Master file extensions whose records may be replicated across partitions
    #[serde(default = "DiscoveryConfig::default_replicated_extensions")]
    pub replicated_extensions: Vec<String>,
}

impl DiscoveryConfig {
    fn default_master_prefix() -> String {
        "_master".to_string()
    }

    fn default_compact_extensions() -> Vec<String> {
        DEFAULT_COMPACT_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    }

    fn default_replicated_extensions() -> Vec<String> {
        DEFAULT_REPLICATED_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect()
    }

    pub fn with_master_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.master_prefix = prefix.into();
        self
    }

    pub fn is_compact(&self, extension: &str) -> bool {
        self.compact_extensions.iter().any(|ext| ext == extension)
    }

    pub fn is_replicated(&self, extension: &str) -> bool {
        self.replicated_extensions.iter().any(|ext| ext == extension)
    }

    pub fn validate(&self) -> Result<()> {
        if self.master_prefix.is_empty() {
            return Err(FrameError::InvalidConfiguration(
                "master_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            master_prefix: Self::default_master_prefix(),
            compact_extensions: Self::default_compact_extensions(),
            replicated_extensions: Self::default_replicated_extensions(),
        }
    }
}

impl Config {
    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.locator.validate()?;
        self.discovery.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(toml_str).map_err(|e| FrameError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| FrameError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.locator.policy, PolicyKind::RoundRobin);
        assert_eq!(config.locator.burst_factor, 3);
        assert_eq!(config.locator.num_frames, None);
        assert!(config.discovery.is_compact("rtree"));
        assert!(config.discovery.is_replicated("grid"));
        assert!(!config.discovery.is_compact("grid"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_empty_json() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = Config::default().with_locator(
            LocatorConfig::default()
                .with_policy(PolicyKind::MaxDistance)
                .with_num_frames(8),
        );
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_json(r#"{ "locator": { "frames": 3 } }"#).unwrap_err();
        assert!(matches!(err, FrameError::Serialization(_)));
    }

    #[test]
    fn test_validation() {
        let zero_frames = LocatorConfig::default().with_num_frames(0);
        assert!(matches!(
            zero_frames.validate(),
            Err(FrameError::InvalidConfiguration(_))
        ));

        let zero_burst = LocatorConfig::default().with_burst_factor(0);
        assert!(zero_burst.validate().is_err());

        let bad_prefix = LocatorConfig::default().with_frame_file_prefix("a/b");
        assert!(bad_prefix.validate().is_err());
    }

    #[test]
    fn test_frame_filename() {
        let locator = LocatorConfig::default();
        assert_eq!(locator.frame_filename(7), "part-00007");
        assert_eq!(locator.frames_for(12), 12);
        assert_eq!(locator.with_num_frames(4).frames_for(12), 4);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
