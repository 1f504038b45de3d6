use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Physical layout of the participant's screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorGeometry {
    /// Pixels, width × height.
    pub resolution: (u32, u32),
    pub refresh_hz: f64,
    pub width_cm: f64,
    pub viewing_distance_cm: f64,
}

impl Default for MonitorGeometry {
    fn default() -> Self {
        Self {
            resolution: (1920, 1080),
            refresh_hz: 239.0,
            width_cm: 53.0,
            viewing_distance_cm: 70.0,
        }
    }
}

impl MonitorGeometry {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let (w, h) = self.resolution;
        if w == 0 || h == 0 {
            return Err(ConfigurationError::InvalidMonitor(format!(
                "resolution {w}x{h}"
            )));
        }
        for (name, v) in [
            ("refresh rate", self.refresh_hz),
            ("width", self.width_cm),
            ("viewing distance", self.viewing_distance_cm),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ConfigurationError::InvalidMonitor(format!("{name} {v}")));
            }
        }
        Ok(())
    }

    /// Visual angle covered by one pixel, measured across the horizontal half-field.
    pub fn degrees_per_pixel(&self) -> f64 {
        (0.5 * self.width_cm)
            .atan2(self.viewing_distance_cm)
            .to_degrees()
            / (0.5 * self.resolution.0 as f64)
    }

    pub fn deg2pix(&self, degrees: f64) -> f32 {
        (degrees / self.degrees_per_pixel()).round() as f32
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lab_monitor_conversion() {
        let monitor = MonitorGeometry::default();
        // atan2(26.5, 70) = 20.734 deg over 960 px
        let dpp = monitor.degrees_per_pixel();
        assert!((dpp - 0.021598).abs() < 1e-5, "{dpp}");
        assert_eq!(monitor.deg2pix(6.5), 301.0);
        assert_eq!(monitor.deg2pix(0.0), 0.0);
    }

    #[test]
    fn rejects_degenerate_geometry() {
        let mut monitor = MonitorGeometry::default();
        monitor.resolution = (0, 1080);
        assert!(monitor.validate().is_err());

        let mut monitor = MonitorGeometry::default();
        monitor.viewing_distance_cm = -1.0;
        assert!(monitor.validate().is_err());

        assert!(MonitorGeometry::default().validate().is_ok());
    }
}
