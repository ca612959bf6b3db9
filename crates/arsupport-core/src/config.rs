use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::DrawColor;

// MARK: - WireFormat

/// Encoding used for messages on the annotation data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Human-readable text understood by legacy peers (`touch-start`,
    /// `color: [r, g, b, a]`, `[(x, y), ...]`).
    #[default]
    Text,
    /// Tagged JSON objects carrying a sequence number.
    Json,
}

impl WireFormat {
    /// Smallest `max_message_bytes` that still fits a one-point `points`
    /// message with full-precision coordinates. JSON also has to fit a
    /// 20-digit sequence number.
    pub const fn min_message_bytes(self) -> usize {
        match self {
            Self::Text => 64,
            Self::Json => 128,
        }
    }
}

impl std::str::FromStr for WireFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                field: "wire_format",
                reason: format!("unknown format {other:?} (expected text or json)"),
            }),
        }
    }
}

// MARK: - AnnotationConfig

/// Tunables shared by both peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    #[serde(alias = "wireFormat")]
    pub wire_format: WireFormat,
    /// Points per mid-gesture flush; `0` sends only at gesture end.
    #[serde(alias = "flushThreshold")]
    pub flush_threshold: usize,
    #[serde(alias = "maxMessageBytes")]
    pub max_message_bytes: usize,
    #[serde(alias = "pixelsPerMeter")]
    pub pixels_per_meter: f64,
    #[serde(alias = "anchorDistance")]
    pub anchor_distance: f32,
    #[serde(alias = "anchorScale")]
    pub anchor_scale: f32,
    #[serde(alias = "pointRadius")]
    pub point_radius: f32,
    #[serde(alias = "tickHz")]
    pub tick_hz: u32,
    #[serde(alias = "initialColor")]
    pub initial_color: DrawColor,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::Text,
            flush_threshold: 10,
            max_message_bytes: 1024,
            pixels_per_meter: 1000.0,
            anchor_distance: 1.0,
            anchor_scale: 1.25,
            point_radius: 0.015,
            tick_hz: 60,
            initial_color: DrawColor::SYSTEM_BLUE,
        }
    }
}

impl AnnotationConfig {
    pub const ENV_WIRE_FORMAT: &'static str = "ARSUPPORT_WIRE_FORMAT";
    pub const ENV_FLUSH_THRESHOLD: &'static str = "ARSUPPORT_FLUSH_THRESHOLD";
    pub const ENV_TICK_HZ: &'static str = "ARSUPPORT_TICK_HZ";

    /// Above this the tick interval rounds down to zero microseconds.
    pub const MAX_TICK_HZ: u32 = 1_000_000;

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let cfg: Self = serde_json::from_str(&text)?;
        Ok(cfg)
    }

    /// Overlay values from `ARSUPPORT_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup (environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(Self::ENV_WIRE_FORMAT) {
            self.wire_format = v.parse()?;
        }
        if let Some(v) = lookup(Self::ENV_FLUSH_THRESHOLD) {
            self.flush_threshold = v.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "flush_threshold",
                reason: format!("{v:?}: {e}"),
            })?;
        }
        if let Some(v) = lookup(Self::ENV_TICK_HZ) {
            self.tick_hz = v.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "tick_hz",
                reason: format!("{v:?}: {e}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 || self.tick_hz > Self::MAX_TICK_HZ {
            return Err(ConfigError::Invalid {
                field: "tick_hz",
                reason: format!("must be in 1..={}, got {}", Self::MAX_TICK_HZ, self.tick_hz),
            });
        }
        if !(self.pixels_per_meter > 0.0) {
            return Err(ConfigError::Invalid {
                field: "pixels_per_meter",
                reason: format!("must be positive, got {}", self.pixels_per_meter),
            });
        }
        let min = self.wire_format.min_message_bytes();
        if self.max_message_bytes < min {
            return Err(ConfigError::Invalid {
                field: "max_message_bytes",
                reason: format!(
                    "must be at least {min} for {:?}, got {}",
                    self.wire_format, self.max_message_bytes
                ),
            });
        }
        Ok(())
    }

    /// Interval between render ticks in microseconds.
    pub fn tick_interval_us(&self) -> u64 {
        1_000_000 / self.tick_hz.max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r#"{
            "wireFormat": "json",
            "flushThreshold": 4,
            "tickHz": 30,
            "initialColor": {"red": 1.0, "green": 0.0, "blue": 0.0, "alpha": 1.0}
        }"#;

        let cfg: AnnotationConfig = serde_json::from_str(json).expect("valid camelCase config");
        assert_eq!(cfg.wire_format, WireFormat::Json);
        assert_eq!(cfg.flush_threshold, 4);
        assert_eq!(cfg.tick_hz, 30);
        assert_eq!(cfg.initial_color, DrawColor::rgba(1.0, 0.0, 0.0, 1.0));
        assert_eq!(cfg.max_message_bytes, 1024);
    }

    #[test]
    fn deserializes_snake_case_fields() {
        let json = r#"{"wire_format": "text", "pixels_per_meter": 500.0}"#;
        let cfg: AnnotationConfig = serde_json::from_str(json).expect("valid snake_case config");
        assert_eq!(cfg.wire_format, WireFormat::Text);
        assert_eq!(cfg.pixels_per_meter, 500.0);
        assert_eq!(cfg.flush_threshold, 10);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = AnnotationConfig::default();
        cfg.apply_overrides(|key| match key {
            AnnotationConfig::ENV_WIRE_FORMAT => Some("JSON".into()),
            AnnotationConfig::ENV_TICK_HZ => Some("120".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.wire_format, WireFormat::Json);
        assert_eq!(cfg.tick_hz, 120);
        assert_eq!(cfg.tick_interval_us(), 8_333);
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut cfg = AnnotationConfig::default();
        let err = cfg
            .apply_overrides(|key| (key == AnnotationConfig::ENV_FLUSH_THRESHOLD).then(|| "ten".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "flush_threshold", .. }));
    }

    #[test]
    fn validate_rejects_zero_tick_rate() {
        let cfg = AnnotationConfig { tick_hz: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(AnnotationConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_tick_rate_with_zero_interval() {
        let cfg = AnnotationConfig { tick_hz: 2_000_000, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "tick_hz", .. })));

        let fastest = AnnotationConfig { tick_hz: AnnotationConfig::MAX_TICK_HZ, ..Default::default() };
        assert!(fastest.validate().is_ok());
        assert_eq!(fastest.tick_interval_us(), 1);
    }

    #[test]
    fn validate_rejects_non_positive_scale() {
        for ppm in [0.0, -1000.0, f64::NAN] {
            let cfg = AnnotationConfig { pixels_per_meter: ppm, ..Default::default() };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Invalid { field: "pixels_per_meter", .. })),
                "{ppm} accepted"
            );
        }
    }

    #[test]
    fn message_size_floor_depends_on_format() {
        for format in [WireFormat::Text, WireFormat::Json] {
            let min = format.min_message_bytes();
            let at = AnnotationConfig { wire_format: format, max_message_bytes: min, ..Default::default() };
            assert!(at.validate().is_ok(), "{format:?} at {min}");

            let below = AnnotationConfig { max_message_bytes: min - 1, ..at };
            assert!(matches!(
                below.validate(),
                Err(ConfigError::Invalid { field: "max_message_bytes", .. })
            ));
        }
        // 64 bytes is enough for text but not for sequenced JSON.
        let json64 = AnnotationConfig { wire_format: WireFormat::Json, max_message_bytes: 64, ..Default::default() };
        assert!(json64.validate().is_err());
    }
}
