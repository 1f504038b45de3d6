use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Number of discrete points on the hue ring.
pub const HUE_COUNT: u16 = 360;

/// A point on the 360-step hue ring. Index 359 neighbours index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HueIndex(u16);

impl HueIndex {
    pub fn new(index: i64) -> Result<Self> {
        if (0..HUE_COUNT as i64).contains(&index) {
            Ok(Self(index as u16))
        } else {
            Err(Error::InvalidHueIndex(index))
        }
    }

    /// Folds any integer onto the ring.
    pub fn wrapping(index: i64) -> Self {
        Self(index.rem_euclid(HUE_COUNT as i64) as u16)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Position on the ring counted from 1, the convention recorded data uses.
    pub fn one_based(self) -> u16 {
        self.0 + 1
    }
}

impl std::fmt::Display for HueIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Colour table for the ring: one HSV colour per hue at fixed saturation and value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HueRing {
    pub saturation: f32,
    pub value: f32,
}

impl Default for HueRing {
    fn default() -> Self {
        Self {
            saturation: 0.2,
            value: 0.5,
        }
    }
}

impl HueRing {
    pub fn colour(&self, hue: HueIndex) -> [u8; 4] {
        hsv_to_rgba(hue.get() as f32, self.saturation, self.value)
    }

    /// Full table, indexed by hue.
    pub fn table(&self) -> Vec<[u8; 4]> {
        (0..HUE_COUNT)
            .map(|h| self.colour(HueIndex(h)))
            .collect()
    }
}

/// Converts an HSV triple (hue in degrees, saturation and value in 0..=1) to opaque RGBA.
pub fn hsv_to_rgba(hue_deg: f32, saturation: f32, value: f32) -> [u8; 4] {
    let h = hue_deg.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b), 255]
}
