//! Devices backed by a [`SimulatedTimer`], for tests and rehearsal runs without
//! hardware. Time only moves when something sleeps, presents, or advances it.

use crate::session::{BlockSummary, BreakDecision, BreakHandler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrocue_core::device::{DeviceError, TriggerError};
use retrocue_core::{Display, Drawable, Eyetracker, Key, Keyboard, Pointer, TriggerCode, TriggerSink};
use retrocue_timing::{SimulatedTimer, Timer};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PresentedFrame {
    /// Clock reading when `present` was called.
    pub at_ns: u64,
    pub drawables: Vec<Drawable>,
}

/// Records every presented frame. Each `present` takes one refresh interval and
/// each `render` takes `render_cost`.
#[derive(Debug, Clone)]
pub struct SimulatedDisplay {
    timer: SimulatedTimer,
    refresh: Duration,
    render_cost: Duration,
    pending: Vec<Drawable>,
    presented: Vec<PresentedFrame>,
}

impl SimulatedDisplay {
    pub fn new(timer: SimulatedTimer, refresh: Duration) -> Self {
        Self {
            timer,
            refresh,
            render_cost: Duration::ZERO,
            pending: Vec::new(),
            presented: Vec::new(),
        }
    }

    pub fn with_render_cost(mut self, cost: Duration) -> Self {
        self.render_cost = cost;
        self
    }

    pub fn presented(&self) -> &[PresentedFrame] {
        &self.presented
    }

    /// Index of the first presented frame containing a drawable matching `pred`.
    pub fn first_showing(&self, pred: impl Fn(&Drawable) -> bool) -> Option<usize> {
        self.presented
            .iter()
            .position(|frame| frame.drawables.iter().any(&pred))
    }
}

impl Display for SimulatedDisplay {
    fn render(&mut self, drawable: &Drawable) {
        self.pending.push(*drawable);
        self.timer.advance(self.render_cost);
    }

    fn present(&mut self) {
        self.presented.push(PresentedFrame {
            at_ns: self.timer.now(),
            drawables: std::mem::take(&mut self.pending),
        });
        self.timer.advance(self.refresh);
    }
}

/// Pointer that starts moving and clicks at fixed delays after each `reset`.
#[derive(Debug, Clone)]
pub struct ScriptedPointer {
    timer: SimulatedTimer,
    reset_at: u64,
    move_after: Duration,
    press_after: Duration,
    position: (f32, f32),
}

impl ScriptedPointer {
    pub fn new(timer: SimulatedTimer, move_after: Duration, press_after: Duration) -> Self {
        let reset_at = timer.now();
        Self {
            timer,
            reset_at,
            move_after,
            press_after,
            position: (100.0, 0.0),
        }
    }

    /// Where the pointer rests once it has moved, centre origin, y up.
    pub fn at(mut self, position: (f32, f32)) -> Self {
        self.position = position;
        self
    }

    fn since_reset(&self) -> Duration {
        self.timer.elapsed(self.reset_at)
    }
}

impl Pointer for ScriptedPointer {
    fn position(&self) -> (f32, f32) {
        if self.moved_since_reset() {
            self.position
        } else {
            (0.0, 0.0)
        }
    }

    fn pressed(&self) -> bool {
        self.since_reset() >= self.press_after
    }

    fn moved_since_reset(&self) -> bool {
        self.since_reset() >= self.move_after
    }

    fn reset(&mut self) {
        self.reset_at = self.timer.now();
    }
}

/// Stand-in participant for rehearsal runs. After each `reset` it idles for a
/// random time, jumps to a random point on the ring and later clicks there.
/// Works against any clock.
#[derive(Debug, Clone)]
pub struct SimulatedParticipant<T> {
    timer: T,
    rng: StdRng,
    radius: f32,
    reset_at: u64,
    move_after: Duration,
    press_after: Duration,
    angle_deg: f32,
}

impl<T: Timer<Timestamp = u64>> SimulatedParticipant<T> {
    pub fn new(timer: T, radius: f32, seed: u64) -> Self {
        let mut participant = Self {
            reset_at: timer.now(),
            timer,
            rng: StdRng::seed_from_u64(seed),
            radius,
            move_after: Duration::ZERO,
            press_after: Duration::ZERO,
            angle_deg: 0.0,
        };
        participant.reset();
        participant
    }
}

impl<T: Timer<Timestamp = u64>> Pointer for SimulatedParticipant<T> {
    fn position(&self) -> (f32, f32) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        (self.radius * cos, self.radius * sin)
    }

    fn pressed(&self) -> bool {
        self.timer.elapsed(self.reset_at) >= self.press_after
    }

    fn moved_since_reset(&self) -> bool {
        self.timer.elapsed(self.reset_at) >= self.move_after
    }

    fn reset(&mut self) {
        self.reset_at = self.timer.now();
        self.move_after = Duration::from_millis(self.rng.random_range(200..=700));
        self.press_after =
            self.move_after + Duration::from_millis(self.rng.random_range(400..=1500));
        self.angle_deg = self.rng.random_range(0.0..360.0);
    }
}

/// Keyboard whose abort key goes down at a fixed clock reading.
#[derive(Debug, Clone)]
pub struct ScriptedKeyboard<T = SimulatedTimer> {
    timer: T,
    abort_at_ns: Option<u64>,
    cleared_at_ns: Option<u64>,
}

impl<T: Timer<Timestamp = u64>> ScriptedKeyboard<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            abort_at_ns: None,
            cleared_at_ns: None,
        }
    }

    pub fn abort_at(mut self, at: Duration) -> Self {
        self.abort_at_ns = Some(at.as_nanos() as u64);
        self
    }
}

impl<T: Timer<Timestamp = u64>> Keyboard for ScriptedKeyboard<T> {
    fn pressed(&mut self, key: Key) -> bool {
        match (key, self.abort_at_ns) {
            (Key::Abort, Some(at)) => {
                let cleared_after = self.cleared_at_ns.is_some_and(|c| c >= at);
                self.timer.now() >= at && !cleared_after
            }
            (Key::Abort, None) => false,
        }
    }

    fn clear(&mut self) {
        self.cleared_at_ns = Some(self.timer.now());
    }
}

/// Keeps every delivered code with the clock reading at delivery.
#[derive(Debug, Clone)]
pub struct RecordingTriggerSink {
    timer: SimulatedTimer,
    sent: Vec<(u64, TriggerCode)>,
}

impl RecordingTriggerSink {
    pub fn new(timer: SimulatedTimer) -> Self {
        Self {
            timer,
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[(u64, TriggerCode)] {
        &self.sent
    }

    pub fn codes(&self) -> Vec<&str> {
        self.sent.iter().map(|(_, code)| code.as_str()).collect()
    }
}

impl TriggerSink for RecordingTriggerSink {
    fn send(&mut self, code: &TriggerCode) -> Result<(), TriggerError> {
        self.sent.push((self.timer.now(), code.clone()));
        Ok(())
    }
}

/// A disconnected port.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTriggerSink;

impl TriggerSink for FailingTriggerSink {
    fn send(&mut self, code: &TriggerCode) -> Result<(), TriggerError> {
        Err(TriggerError {
            code: code.to_string(),
            reason: "port not open".into(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingEyetracker {
    pub calibrations: usize,
    pub recording: bool,
    pub starts: usize,
    pub stops: usize,
}

impl Eyetracker for RecordingEyetracker {
    fn calibrate(&mut self) -> Result<(), DeviceError> {
        self.calibrations += 1;
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), DeviceError> {
        self.recording = true;
        self.starts += 1;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), DeviceError> {
        self.recording = false;
        self.stops += 1;
        Ok(())
    }
}

/// Answers breaks from a script, then continues. Remembers what it was shown.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBreaks {
    decisions: VecDeque<BreakDecision>,
    pub seen: Vec<BlockSummary>,
}

impl ScriptedBreaks {
    pub fn new(decisions: impl IntoIterator<Item = BreakDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            seen: Vec::new(),
        }
    }
}

impl BreakHandler for ScriptedBreaks {
    fn take_break(&mut self, summary: &BlockSummary) -> BreakDecision {
        self.seen.push(summary.clone());
        self.decisions.pop_front().unwrap_or(BreakDecision::Continue)
    }
}
