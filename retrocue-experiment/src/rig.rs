//! The devices a session drives, bundled so the sequencer and collectors can
//! share them without any global state.

use retrocue_core::trigger::encode;
use retrocue_core::{
    Display, FrameLabel, Key, Keyboard, Pointer, Position, Retrocue, TargetItem, TrialSpec,
    TriggerCode, TriggerSink,
};
use retrocue_timing::Timer;
use tracing::{trace, warn};

/// Trial fields every marker of that trial is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerContext {
    pub locations: [Position; 2],
    pub target_item: TargetItem,
    pub retrocue: Retrocue,
}

impl TriggerContext {
    pub fn code(&self, label: FrameLabel) -> TriggerCode {
        encode(label, self.locations, self.target_item, self.retrocue)
    }
}

impl From<&TrialSpec> for TriggerContext {
    fn from(spec: &TrialSpec) -> Self {
        Self {
            locations: spec.locations,
            target_item: spec.target_item,
            retrocue: spec.retrocue,
        }
    }
}

/// Wraps a sink so delivery failures are counted and logged instead of
/// interrupting the trial.
#[derive(Debug)]
pub struct TriggerChannel<S> {
    sink: S,
    enabled: bool,
    sent: usize,
    failures: usize,
}

impl<S: TriggerSink> TriggerChannel<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            enabled: true,
            sent: 0,
            failures: 0,
        }
    }

    /// Practice runs with markers switched off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&mut self, code: &TriggerCode) {
        if !self.enabled {
            return;
        }
        match self.sink.send(code) {
            Ok(()) => {
                self.sent += 1;
                trace!(%code, "trigger sent");
            }
            Err(e) => {
                self.failures += 1;
                warn!(%code, error = %e, failures = self.failures, "trigger delivery failed");
            }
        }
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

pub struct Rig<D, P, K, S, T> {
    pub display: D,
    pub pointer: P,
    pub keyboard: K,
    pub triggers: TriggerChannel<S>,
    pub timer: T,
}

impl<D, P, K, S, T> Rig<D, P, K, S, T>
where
    D: Display,
    P: Pointer,
    K: Keyboard,
    S: TriggerSink,
    T: Timer<Timestamp = u64>,
{
    pub fn new(display: D, pointer: P, keyboard: K, triggers: S, timer: T) -> Self {
        Self {
            display,
            pointer,
            keyboard,
            triggers: TriggerChannel::new(triggers),
            timer,
        }
    }

    pub fn abort_requested(&mut self) -> bool {
        self.keyboard.pressed(Key::Abort)
    }
}
