use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrocue_core::{HUE_COUNT, HueIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the response ring is oriented across trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelMode {
    /// Fresh random rotation on every response, so motor plans cannot be rehearsed.
    #[default]
    PerTrialRandomized,
    /// One unrotated ring built once and reused for the whole session.
    SessionCached,
}

/// The colour ring as shown for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColourWheel {
    offset: u16,
}

impl ColourWheel {
    pub fn new(offset: u16) -> Self {
        Self {
            offset: offset % HUE_COUNT,
        }
    }

    /// Rotation of hue 0 away from the positive x axis, in degrees.
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Hue under a pointer angle, accounting for the rotation.
    pub fn hue_at(&self, angle_deg: f32) -> HueIndex {
        HueIndex::wrapping((angle_deg - self.offset as f32).floor() as i64)
    }
}

/// Angle of a centre-origin point, in `[0, 360)`.
pub fn pointer_angle((x, y): (f32, f32)) -> f32 {
    let angle = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative angles.
    if angle >= 360.0 { 0.0 } else { angle }
}

/// Per-session owner of the wheel orientation.
///
/// In [`WheelMode::SessionCached`] the wheel is fixed on first use and kept
/// until [`WheelCache::invalidate`] is called at a session boundary.
#[derive(Debug)]
pub struct WheelCache {
    mode: WheelMode,
    rng: StdRng,
    cached: Option<ColourWheel>,
}

impl WheelCache {
    pub fn new(mode: WheelMode, seed: u64) -> Self {
        Self {
            mode,
            rng: StdRng::seed_from_u64(seed),
            cached: None,
        }
    }

    /// Wheel for the next response.
    pub fn wheel(&mut self) -> ColourWheel {
        match self.mode {
            WheelMode::PerTrialRandomized => ColourWheel::new(self.rng.random_range(0..HUE_COUNT)),
            WheelMode::SessionCached => *self.cached.get_or_insert_with(|| {
                debug!("fixing session wheel");
                ColourWheel::new(0)
            }),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angles_cover_the_circle() {
        assert_eq!(pointer_angle((1.0, 0.0)), 0.0);
        assert!((pointer_angle((0.0, 1.0)) - 90.0).abs() < 1e-4);
        assert!((pointer_angle((-1.0, 0.0)) - 180.0).abs() < 1e-4);
        assert!((pointer_angle((0.0, -1.0)) - 270.0).abs() < 1e-4);
        let a = pointer_angle((1.0, -1e-9));
        assert!((0.0..360.0).contains(&a));
    }

    #[test]
    fn hue_lookup_subtracts_the_offset() {
        let wheel = ColourWheel::new(30);
        assert_eq!(wheel.hue_at(45.5).get(), 15);
        assert_eq!(wheel.hue_at(10.0).get(), 340);
        assert_eq!(wheel.hue_at(30.0).get(), 0);
        assert_eq!(wheel.hue_at(29.9).get(), 359);
    }

    #[test]
    fn per_trial_wheels_rotate() {
        let mut cache = WheelCache::new(WheelMode::PerTrialRandomized, 9);
        let offsets: Vec<u16> = (0..20).map(|_| cache.wheel().offset()).collect();
        assert!(offsets.iter().all(|&o| o < HUE_COUNT));
        assert!(offsets.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn per_trial_offsets_follow_the_seed() {
        let mut a = WheelCache::new(WheelMode::PerTrialRandomized, 4);
        let mut b = WheelCache::new(WheelMode::PerTrialRandomized, 4);
        for _ in 0..10 {
            assert_eq!(a.wheel().offset(), b.wheel().offset());
        }
    }

    #[test]
    fn session_cache_keeps_one_wheel_until_invalidated() {
        let mut cache = WheelCache::new(WheelMode::SessionCached, 0);
        assert!(!cache.is_cached());
        let first = cache.wheel();
        assert_eq!(first.offset(), 0);
        assert!(cache.is_cached());
        assert_eq!(cache.wheel(), first);

        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(cache.wheel(), first);
    }

    #[test]
    fn offsets_wrap_into_the_ring() {
        assert_eq!(ColourWheel::new(365).offset(), 5);
    }
}
