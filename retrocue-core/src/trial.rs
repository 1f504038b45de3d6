use crate::condition::{Condition, Position, Retrocue, TargetItem};
use crate::hue::{HUE_COUNT, HueIndex};
use crate::scoring::Score;
use crate::trigger::TriggerCode;
use rand::Rng;
use serde::Serialize;

/// Everything one trial shows, fixed before its first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSpec {
    pub iti_ms: u64,
    pub stimulus_hues: [HueIndex; 2],
    pub locations: [Position; 2],
    pub target_item: TargetItem,
    pub target_hue: HueIndex,
    pub target_position: Position,
    pub retrocue: Retrocue,
}

impl TrialSpec {
    /// Draws the random parts of a trial: ITI in `iti_range_ms` (inclusive) and two
    /// distinct stimulus hues.
    pub fn draw<R: Rng + ?Sized>(
        condition: &Condition,
        iti_range_ms: (u64, u64),
        rng: &mut R,
    ) -> Self {
        let iti_ms = rng.random_range(iti_range_ms.0..=iti_range_ms.1);
        let picked = rand::seq::index::sample(rng, HUE_COUNT as usize, 2);
        let stimulus_hues = [
            HueIndex::wrapping(picked.index(0) as i64),
            HueIndex::wrapping(picked.index(1) as i64),
        ];
        let slot = condition.target_item.slot();
        Self {
            iti_ms,
            stimulus_hues,
            locations: condition.locations,
            target_item: condition.target_item,
            target_hue: stimulus_hues[slot],
            target_position: condition.locations[slot],
            retrocue: condition.retrocue(),
        }
    }
}

/// Result of one continuous report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseRecord {
    /// From dial onset to the first pointer movement.
    pub idle_latency_ms: f64,
    /// From the first movement to the click.
    pub response_duration_ms: f64,
    pub selected_hue: HueIndex,
    pub wheel_offset: u16,
    pub abs_distance: u16,
    pub distance: u16,
    pub performance: u8,
}

impl ResponseRecord {
    pub fn new(
        idle_latency_ms: f64,
        response_duration_ms: f64,
        selected_hue: HueIndex,
        wheel_offset: u16,
        score: Score,
    ) -> Self {
        Self {
            idle_latency_ms: round_centi(idle_latency_ms),
            response_duration_ms: round_centi(response_duration_ms),
            selected_hue,
            wheel_offset,
            abs_distance: score.abs_distance,
            distance: score.circular_distance,
            performance: score.performance,
        }
    }
}

fn round_centi(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

/// A frame whose preparation outlasted its configured hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingFault {
    pub frame_index: usize,
    pub configured_ms: u64,
    pub elapsed_ms: f64,
}

/// Terminal state of a completed trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Code of the first stimulus onset, used to label the trial in analysis.
    pub condition_code: TriggerCode,
    pub response: ResponseRecord,
    pub timing_faults: Vec<TimingFault>,
}

/// One flat output row per trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial_number: usize,
    pub block: usize,
    pub start_time_ms: f64,
    pub end_time_ms: f64,
    pub iti_ms: u64,
    pub stimulus_hue_1: HueIndex,
    pub stimulus_hue_2: HueIndex,
    pub location_1: Position,
    pub location_2: Position,
    pub target_item: TargetItem,
    pub target_hue: HueIndex,
    pub target_position: Position,
    pub retrocue: Retrocue,
    pub idle_latency_ms: f64,
    pub response_duration_ms: f64,
    pub selected_hue: HueIndex,
    pub wheel_offset: u16,
    pub abs_distance: u16,
    pub distance: u16,
    pub performance: u8,
    pub condition_code: TriggerCode,
    pub timing_faults: usize,
}

impl TrialRecord {
    pub fn new(
        trial_number: usize,
        block: usize,
        (start_time_ms, end_time_ms): (f64, f64),
        spec: &TrialSpec,
        outcome: &TrialOutcome,
    ) -> Self {
        let response = &outcome.response;
        Self {
            trial_number,
            block,
            start_time_ms,
            end_time_ms,
            iti_ms: spec.iti_ms,
            stimulus_hue_1: spec.stimulus_hues[0],
            stimulus_hue_2: spec.stimulus_hues[1],
            location_1: spec.locations[0],
            location_2: spec.locations[1],
            target_item: spec.target_item,
            target_hue: spec.target_hue,
            target_position: spec.target_position,
            retrocue: spec.retrocue,
            idle_latency_ms: response.idle_latency_ms,
            response_duration_ms: response.response_duration_ms,
            selected_hue: response.selected_hue,
            wheel_offset: response.wheel_offset,
            abs_distance: response.abs_distance,
            distance: response.distance,
            performance: response.performance,
            condition_code: outcome.condition_code.clone(),
            timing_faults: outcome.timing_faults.len(),
        }
    }
}
