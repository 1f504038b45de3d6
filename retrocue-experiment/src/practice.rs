use crate::error::TrialError;
use crate::response::ResponseCollector;
use crate::rig::Rig;
use crate::sequencer::{FrameSequencer, show_feedback};
use rand::Rng;
use retrocue_cache::WheelCache;
use retrocue_core::trial_list::practice_condition;
use retrocue_core::{
    Display, Drawable, HUE_COUNT, HueIndex, Keyboard, Pointer, TrialSpec, TriggerSink,
};
use retrocue_timing::Timer;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeStep {
    Continue,
    StopRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeKind {
    /// Report the colour of a swatch on the wheel.
    Wheel,
    /// Full trials with unbalanced conditions.
    Trials,
}

/// Unrecorded warm-up rounds. Markers are off for the whole run and the abort
/// key ends practice instead of the session.
#[derive(Debug, Clone)]
pub struct Practice {
    sequencer: FrameSequencer,
    iti_range_ms: (u64, u64),
    wheel_feedback: Duration,
}

impl Practice {
    pub fn new(sequencer: FrameSequencer, iti_range_ms: (u64, u64), wheel_feedback: Duration) -> Self {
        Self {
            sequencer,
            iti_range_ms,
            wheel_feedback,
        }
    }

    pub fn wheel_step<D, P, K, S, T, R>(
        &self,
        rng: &mut R,
        wheels: &mut WheelCache,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<PracticeStep, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        R: Rng + ?Sized,
    {
        if rig.abort_requested() {
            return Ok(PracticeStep::StopRequested);
        }
        let target = HueIndex::wrapping(rng.random_range(0..HUE_COUNT).into());
        let wheel = wheels.wheel();
        let swatch = [Drawable::Swatch { hue: target }];
        let response = match ResponseCollector.collect(target, &wheel, &swatch, None, rig) {
            Err(TrialError::Aborted) => return Ok(PracticeStep::StopRequested),
            other => other?,
        };
        show_feedback(response.performance, self.wheel_feedback, &swatch, None, rig);
        Ok(PracticeStep::Continue)
    }

    pub fn trial_step<D, P, K, S, T, R>(
        &self,
        rng: &mut R,
        wheels: &mut WheelCache,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<PracticeStep, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        R: Rng + ?Sized,
    {
        if rig.abort_requested() {
            return Ok(PracticeStep::StopRequested);
        }
        let condition = practice_condition(rng);
        let spec = TrialSpec::draw(&condition, self.iti_range_ms, rng);
        match self.sequencer.run(&spec, wheels, rig) {
            Ok(outcome) => {
                debug!(performance = outcome.response.performance, "practice trial");
                Ok(PracticeStep::Continue)
            }
            Err(TrialError::Aborted) => Ok(PracticeStep::StopRequested),
            Err(e) => Err(e),
        }
    }

    /// Repeats `kind` until the abort key or `limit` rounds. Returns the number of
    /// rounds completed.
    pub fn run_until_stopped<D, P, K, S, T, R>(
        &self,
        kind: PracticeKind,
        limit: Option<usize>,
        rng: &mut R,
        wheels: &mut WheelCache,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<usize, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        R: Rng + ?Sized,
    {
        let markers = rig.triggers.is_enabled();
        rig.triggers.set_enabled(false);

        let mut rounds = 0;
        let result = loop {
            if limit.is_some_and(|limit| rounds >= limit) {
                break Ok(rounds);
            }
            let step = match kind {
                PracticeKind::Wheel => self.wheel_step(rng, wheels, rig),
                PracticeKind::Trials => self.trial_step(rng, wheels, rig),
            };
            match step {
                Ok(PracticeStep::Continue) => rounds += 1,
                Ok(PracticeStep::StopRequested) => break Ok(rounds),
                Err(e) => break Err(e),
            }
        };

        rig.keyboard.clear();
        rig.triggers.set_enabled(markers);
        if let Ok(rounds) = result {
            info!(?kind, rounds, "practice finished");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingTriggerSink, ScriptedKeyboard, ScriptedPointer, SimulatedDisplay};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use retrocue_cache::WheelMode;
    use retrocue_core::{FrameTimings, Key};
    use retrocue_timing::SimulatedTimer;

    fn rig(
        timer: &SimulatedTimer,
    ) -> Rig<SimulatedDisplay, ScriptedPointer, ScriptedKeyboard, RecordingTriggerSink, SimulatedTimer>
    {
        Rig::new(
            SimulatedDisplay::new(timer.clone(), Duration::from_millis(5)),
            ScriptedPointer::new(
                timer.clone(),
                Duration::from_millis(200),
                Duration::from_millis(600),
            ),
            ScriptedKeyboard::new(timer.clone()),
            RecordingTriggerSink::new(timer.clone()),
            timer.clone(),
        )
    }

    fn practice() -> Practice {
        Practice::new(
            FrameSequencer::new(FrameTimings::default(), Duration::from_millis(250)),
            (500, 800),
            Duration::from_millis(500),
        )
    }

    fn wheels() -> WheelCache {
        WheelCache::new(WheelMode::PerTrialRandomized, 0)
    }

    #[test]
    fn wheel_practice_shows_the_swatch_and_sends_nothing() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        let rounds = practice()
            .run_until_stopped(
                PracticeKind::Wheel,
                Some(3),
                &mut StdRng::seed_from_u64(2),
                &mut wheels(),
                &mut rig,
            )
            .unwrap();

        assert_eq!(rounds, 3);
        assert!(rig.triggers.sink().codes().is_empty());
        assert!(rig.triggers.is_enabled());
        assert!(
            rig.display
                .first_showing(|d| matches!(d, Drawable::Swatch { .. }))
                .is_some()
        );
        let feedback: Vec<_> = rig
            .display
            .presented()
            .iter()
            .filter(|f| f.drawables.iter().any(|d| matches!(d, Drawable::Feedback { .. })))
            .collect();
        assert_eq!(feedback.len(), 3);
        // The target stays up next to its score.
        for frame in feedback {
            let swatches = frame
                .drawables
                .iter()
                .filter(|d| matches!(d, Drawable::Swatch { .. }))
                .count();
            assert_eq!(swatches, 1);
        }
    }

    #[test]
    fn abort_key_ends_trial_practice_only() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        rig.keyboard = ScriptedKeyboard::new(timer.clone()).abort_at(Duration::from_secs(12));

        let rounds = practice()
            .run_until_stopped(
                PracticeKind::Trials,
                None,
                &mut StdRng::seed_from_u64(4),
                &mut wheels(),
                &mut rig,
            )
            .unwrap();

        // Each practice trial takes roughly five seconds here.
        assert_eq!(rounds, 2);
        assert!(rig.triggers.sink().codes().is_empty());
        // Cleared on the way out, so the session does not abort as well.
        assert!(!rig.keyboard.pressed(Key::Abort));
    }

    #[test]
    fn stop_is_reported_before_the_round_starts() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        rig.keyboard = ScriptedKeyboard::new(timer.clone()).abort_at(Duration::ZERO);
        let step = practice()
            .wheel_step(&mut StdRng::seed_from_u64(0), &mut wheels(), &mut rig)
            .unwrap();
        assert_eq!(step, PracticeStep::StopRequested);
        assert!(rig.display.presented().is_empty());
    }
}
