use crate::error::Result;
use crate::hue::{HUE_COUNT, HueIndex};
use serde::{Deserialize, Serialize};

const HALF_RING: u16 = HUE_COUNT / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub abs_distance: u16,
    pub circular_distance: u16,
    /// 100 for an exact match, 0 for the opposite side of the ring.
    pub performance: u8,
}

pub fn score(selected: HueIndex, target: HueIndex) -> Score {
    // Recorded data counts hues from 1; the shift cancels in the difference.
    let abs_distance = selected.one_based().abs_diff(target.one_based());
    let circular_distance = if abs_distance > HALF_RING {
        HUE_COUNT - abs_distance
    } else {
        abs_distance
    };
    let performance =
        (100.0 - circular_distance as f64 / HALF_RING as f64 * 100.0).round() as u8;
    Score {
        abs_distance,
        circular_distance,
        performance,
    }
}

/// Scores raw ring indices, rejecting anything off the ring.
pub fn score_indices(selected: i64, target: i64) -> Result<Score> {
    Ok(score(HueIndex::new(selected)?, HueIndex::new(target)?))
}
