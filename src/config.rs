//! Configuration management for the classroom monitor

use crate::attendance::AttendancePolicy;
use crate::constants::{
    BEHAVIOR_ATTRIBUTION_RADIUS, DEFAULT_ATTENDANCE_THRESHOLD, DEFAULT_SAMPLE_INTERVAL_MS,
    DESCRIPTOR_MATCH_DISTANCE, FACE_BOX_HEIGHT, FACE_BOX_JITTER, FACE_BOX_WIDTH,
    FACE_MAX_CANDIDATES, FACE_STRIDE, FACE_SUPPRESSION_RADIUS, FACE_THRESHOLD, FACE_WINDOW,
    LATE_FLOOR_PERCENT, NOT_DETECTED_AFTER_MINUTES, PHONE_MAX_CANDIDATES, PHONE_STRIDE,
    PHONE_THRESHOLD, PHONE_WINDOW_HEIGHT, PHONE_WINDOW_WIDTH, TALKING_MAX_CANDIDATES,
    TALKING_STRIDE, TALKING_THRESHOLD, TALKING_WINDOW,
};
use crate::matcher::{DescriptorExtractor, DescriptorMatcher, IdentityMatcher, OrdinalMatcher};
use crate::scanner::RegionScanner;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection loop configuration
    pub monitor: MonitorConfig,

    /// Region scanner configuration
    pub scanner: ScannerConfig,

    /// Identity matching configuration
    pub matching: MatchingConfig,

    /// Attendance policy configuration
    pub attendance: AttendanceConfig,
}

/// Detection loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between detection cycles in milliseconds
    pub interval_ms: u64,

    /// Seed for box jitter and confidence draws; entropy when absent
    pub seed: Option<u64>,
}

/// Scanning parameters for one detection channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Scanning window width in pixels
    pub window_width: u32,

    /// Scanning window height in pixels
    pub window_height: u32,

    /// Step between windows in pixels, both axes
    pub stride: u32,

    /// Score a window must exceed to be accepted
    pub threshold: f64,

    /// Maximum accepted windows per frame
    pub max_candidates: usize,

    /// Reject windows whose top-left lies within this many pixels (both axes)
    /// of an accepted one; 0 disables suppression
    pub suppression_radius: u32,
}

/// Region scanner parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Face channel
    pub face: ChannelConfig,

    /// Mobile phone channel
    pub phone: ChannelConfig,

    /// Talking channel
    pub talking: ChannelConfig,

    /// Base width of reported face boxes
    pub face_box_width: f64,

    /// Base height of reported face boxes
    pub face_box_height: f64,

    /// Random jitter span added to face box width and height
    pub face_box_jitter: f64,
}

/// Identity matching strategy, one per deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// i-th face gets the i-th roster student
    Ordinal,
    /// nearest stored descriptor under the distance threshold
    Descriptor,
}

/// Identity matching parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Matching strategy
    pub strategy: MatchingStrategy,

    /// Descriptor distance below which a face matches
    pub descriptor_threshold: f32,

    /// Maximum distance between a behavior and its attributed face
    pub behavior_radius: f64,
}

/// Attendance policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Threshold applied to classes created without one
    pub default_threshold: f64,

    /// Percentage at or above which partial presence counts as late
    pub late_floor_percent: f64,

    /// Minutes without a sighting before a student shows as not detected
    pub not_detected_after_minutes: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            seed: None,
        }
    }
}

impl ChannelConfig {
    /// Face channel defaults
    #[must_use]
    pub fn face() -> Self {
        Self {
            window_width: FACE_WINDOW,
            window_height: FACE_WINDOW,
            stride: FACE_STRIDE,
            threshold: FACE_THRESHOLD,
            max_candidates: FACE_MAX_CANDIDATES,
            suppression_radius: FACE_SUPPRESSION_RADIUS,
        }
    }

    /// Mobile phone channel defaults
    #[must_use]
    pub fn phone() -> Self {
        Self {
            window_width: PHONE_WINDOW_WIDTH,
            window_height: PHONE_WINDOW_HEIGHT,
            stride: PHONE_STRIDE,
            threshold: PHONE_THRESHOLD,
            max_candidates: PHONE_MAX_CANDIDATES,
            suppression_radius: 0,
        }
    }

    /// Talking channel defaults
    #[must_use]
    pub fn talking() -> Self {
        Self {
            window_width: TALKING_WINDOW,
            window_height: TALKING_WINDOW,
            stride: TALKING_STRIDE,
            threshold: TALKING_THRESHOLD,
            max_candidates: TALKING_MAX_CANDIDATES,
            suppression_radius: 0,
        }
    }

    fn validate(&self, channel: &str) -> Result<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::ConfigError(format!(
                "{channel} window must be non-empty"
            )));
        }
        if self.stride == 0 {
            return Err(Error::ConfigError(format!(
                "{channel} stride must be greater than 0"
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::ConfigError(format!(
                "{channel} threshold must be between 0.0 and 1.0"
            )));
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            face: ChannelConfig::face(),
            phone: ChannelConfig::phone(),
            talking: ChannelConfig::talking(),
            face_box_width: FACE_BOX_WIDTH,
            face_box_height: FACE_BOX_HEIGHT,
            face_box_jitter: FACE_BOX_JITTER,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: MatchingStrategy::Ordinal,
            descriptor_threshold: DESCRIPTOR_MATCH_DISTANCE,
            behavior_radius: BEHAVIOR_ATTRIBUTION_RADIUS,
        }
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_ATTENDANCE_THRESHOLD,
            late_floor_percent: LATE_FLOOR_PERCENT,
            not_detected_after_minutes: NOT_DETECTED_AFTER_MINUTES,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Interval between detection cycles
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.monitor.interval_ms)
    }

    /// Create the region scanner from configuration
    #[must_use]
    pub fn create_scanner(&self) -> RegionScanner {
        RegionScanner::new(self.scanner.clone())
    }

    /// Create the configured identity matcher.
    ///
    /// The descriptor strategy needs an extractor; there is no fallback to
    /// ordinal matching when it is missing.
    pub fn create_matcher(
        &self,
        extractor: Option<Box<dyn DescriptorExtractor>>,
    ) -> Result<Box<dyn IdentityMatcher>> {
        match (self.matching.strategy, extractor) {
            (MatchingStrategy::Ordinal, _) => Ok(Box::new(OrdinalMatcher::new())),
            (MatchingStrategy::Descriptor, Some(extractor)) => Ok(Box::new(DescriptorMatcher::new(
                extractor,
                self.matching.descriptor_threshold,
            ))),
            (MatchingStrategy::Descriptor, None) => Err(Error::ConfigError(
                "Descriptor matching requires a descriptor extractor".to_string(),
            )),
        }
    }

    /// Random source for box jitter and confidence draws
    #[must_use]
    pub fn create_rng(&self) -> StdRng {
        match self.monitor.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Attendance policy from configuration
    #[must_use]
    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            late_floor_percent: self.attendance.late_floor_percent,
            not_detected_after: chrono::Duration::minutes(self.attendance.not_detected_after_minutes),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_ms == 0 {
            return Err(Error::ConfigError(
                "Monitor interval must be greater than 0".to_string(),
            ));
        }

        self.scanner.face.validate("face")?;
        self.scanner.phone.validate("phone")?;
        self.scanner.talking.validate("talking")?;

        if self.scanner.face_box_width <= 0.0 || self.scanner.face_box_height <= 0.0 {
            return Err(Error::ConfigError(
                "Face box size must be positive".to_string(),
            ));
        }
        if self.scanner.face_box_jitter < 0.0 {
            return Err(Error::ConfigError(
                "Face box jitter must not be negative".to_string(),
            ));
        }

        if self.matching.descriptor_threshold <= 0.0 {
            return Err(Error::ConfigError(
                "Descriptor threshold must be greater than 0".to_string(),
            ));
        }
        if self.matching.behavior_radius < 0.0 {
            return Err(Error::ConfigError(
                "Behavior radius must not be negative".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.attendance.default_threshold) {
            return Err(Error::ConfigError(
                "Attendance threshold must be between 0 and 100".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.attendance.late_floor_percent) {
            return Err(Error::ConfigError(
                "Late floor must be between 0 and 100".to_string(),
            ));
        }
        if self.attendance.not_detected_after_minutes <= 0 {
            return Err(Error::ConfigError(
                "Not-detected window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Classroom Monitor Configuration

# Detection loop
monitor:
  interval_ms: 1000
  # seed: 42

# Region scanner
scanner:
  face:
    window_width: 60
    window_height: 60
    stride: 20
    threshold: 0.6
    max_candidates: 6
    suppression_radius: 40
  phone:
    window_width: 40
    window_height: 80
    stride: 20
    threshold: 0.8
    max_candidates: 2
    suppression_radius: 0
  talking:
    window_width: 60
    window_height: 60
    stride: 30
    threshold: 0.7
    max_candidates: 1
    suppression_radius: 0
  face_box_width: 80.0
  face_box_height: 100.0
  face_box_jitter: 20.0

# Identity matching (ordinal | descriptor)
matching:
  strategy: ordinal
  descriptor_threshold: 0.6
  behavior_radius: 200.0

# Attendance policy
attendance:
  default_threshold: 75.0
  late_floor_percent: 25.0
  not_detected_after_minutes: 5
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = Config::from_yaml("monitor:\n  interval_ms: 250\n").unwrap();
        assert_eq!(parsed.monitor.interval_ms, 250);
        assert_eq!(parsed.scanner, ScannerConfig::default());
        assert_eq!(parsed.sample_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_zero_stride() {
        let mut config = Config::default();
        config.scanner.phone.stride = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_descriptor_strategy_requires_extractor() {
        let mut config = Config::default();
        config.matching.strategy = MatchingStrategy::Descriptor;
        assert!(config.create_matcher(None).is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;

        let mut config = Config::default();
        config.monitor.seed = Some(7);
        let a: f64 = config.create_rng().gen();
        let b: f64 = config.create_rng().gen();
        assert_eq!(a, b);
    }
}
