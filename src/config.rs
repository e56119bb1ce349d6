//! Crate-wide constants and user-facing settings.

use serde::{Deserialize, Serialize};

/// Playback rate applied when neither the announcement nor the override
/// supplies one (frames per second).
pub const DEFAULT_PREVIEW_RATE: f32 = 8.0;

/// Ceiling for the user rate override.
pub const MAX_PREVIEW_RATE: f32 = 60.0;

/// Node body width assumed until the host reports a real one.
pub const DEFAULT_NODE_WIDTH: f32 = 140.0;

/// Horizontal inset of the preview widget inside the node body.
pub const WIDGET_H_INSET: f32 = 20.0;

/// Vertical padding added below the preview widget.
pub const WIDGET_V_PAD: f32 = 10.0;

/// Request metadata key carrying the enable flag.
pub const REQUEST_EXTRA_ENABLED: &str = "glimpse_preview";

/// Request metadata key carrying the rate override.
pub const REQUEST_EXTRA_RATE: &str = "glimpse_preview_rate";

/// User settings for the preview subsystem.
///
/// `rate_override` forces a playback rate for all streams; 0 means use the
/// announcement's rate or [`DEFAULT_PREVIEW_RATE`]. Not the producer's output
/// frame rate: for video models the two will not match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub enabled: bool,
    pub rate_override: f32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_override: 0.0,
        }
    }
}

impl PreviewSettings {
    /// Clamp the override into its legal range.
    pub fn sanitized(mut self) -> Self {
        self.rate_override = self.rate_override.clamp(0.0, MAX_PREVIEW_RATE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enabled_no_override() {
        let s = PreviewSettings::default();
        assert!(s.enabled);
        assert_eq!(s.rate_override, 0.0);
    }

    #[test]
    fn sanitize_clamps_override() {
        let s = PreviewSettings {
            enabled: true,
            rate_override: 500.0,
        }
        .sanitized();
        assert_eq!(s.rate_override, MAX_PREVIEW_RATE);

        let s = PreviewSettings {
            enabled: true,
            rate_override: -1.0,
        }
        .sanitized();
        assert_eq!(s.rate_override, 0.0);
    }

    #[test]
    fn missing_fields_default_on_deserialize() {
        let s: PreviewSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, PreviewSettings::default());
    }
}
