use crate::error::TrialError;
use crate::response::ResponseCollector;
use crate::rig::{Rig, TriggerContext};
use retrocue_cache::WheelCache;
use retrocue_core::{
    Display, Drawable, Frame, FrameLabel, FrameTimings, Keyboard, Pointer, TimingFault,
    TrialOutcome, TrialSpec, TriggerCode, TriggerSink,
};
use retrocue_timing::{Timer, ns_to_ms};
use std::time::Duration;
use tracing::{debug, warn};

/// Drives one trial from the first fixation frame to the end of feedback.
///
/// Each frame is drawn before the previous one's hold ends. Its hold is the
/// configured duration minus the time already spent since `present` was called
/// for it (trigger delivery and drawing the next frame included), so present
/// calls land at the configured spacing. A frame whose overhead exceeds its
/// duration is recorded as a [`TimingFault`] and the schedule simply continues;
/// later frames are never shortened to catch up.
#[derive(Debug, Clone)]
pub struct FrameSequencer {
    timings: FrameTimings,
    feedback: Duration,
    collector: ResponseCollector,
}

impl FrameSequencer {
    pub fn new(timings: FrameTimings, feedback: Duration) -> Self {
        Self {
            timings,
            feedback,
            collector: ResponseCollector,
        }
    }

    pub fn run<D, P, K, S, T>(
        &self,
        spec: &TrialSpec,
        wheels: &mut WheelCache,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<TrialOutcome, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
    {
        let frames = self.timings.frames(spec);
        let ctx = TriggerContext::from(spec);
        let timing_faults = self.show_frames(&frames, &ctx, rig)?;

        if rig.abort_requested() {
            debug!("aborted before response");
            return Err(TrialError::Aborted);
        }
        let wheel = wheels.wheel();
        let response = self
            .collector
            .collect(spec.target_hue, &wheel, &[], Some(&ctx), rig)?;

        show_feedback(
            response.performance,
            self.feedback,
            &[],
            Some(ctx.code(FrameLabel::FeedbackOnset)),
            rig,
        );

        Ok(TrialOutcome {
            condition_code: ctx.code(FrameLabel::StimulusOnset1),
            response,
            timing_faults,
        })
    }

    fn show_frames<D, P, K, S, T>(
        &self,
        frames: &[Frame],
        ctx: &TriggerContext,
        rig: &mut Rig<D, P, K, S, T>,
    ) -> Result<Vec<TimingFault>, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
    {
        let mut faults = Vec::new();
        if let Some(first) = frames.first() {
            first.action.draw(&mut rig.display);
        }

        for (index, frame) in frames.iter().enumerate() {
            if rig.abort_requested() {
                debug!(frame = index, "aborted between frames");
                return Err(TrialError::Aborted);
            }
            let onset = rig.timer.now();
            rig.display.present();
            if let Some(label) = frame.trigger {
                rig.triggers.emit(&ctx.code(label));
            }
            if let Some(next) = frames.get(index + 1) {
                next.action.draw(&mut rig.display);
            }

            let configured = Duration::from_millis(frame.duration_ms);
            let elapsed = rig.timer.elapsed(onset);
            match configured.checked_sub(elapsed) {
                Some(rest) => rig.timer.sleep(rest),
                // A zero-length frame is shown and left at once.
                None if frame.duration_ms == 0 => {}
                None => {
                    let fault = TimingFault {
                        frame_index: index,
                        configured_ms: frame.duration_ms,
                        elapsed_ms: ns_to_ms(elapsed.as_nanos() as u64),
                    };
                    warn!(
                        frame = fault.frame_index,
                        configured_ms = fault.configured_ms,
                        elapsed_ms = fault.elapsed_ms,
                        "frame overran its hold"
                    );
                    faults.push(fault);
                }
            }
        }
        Ok(faults)
    }
}

/// Shows the performance score over fixation, with `extras` drawn beneath it,
/// and holds it for `duration`.
pub(crate) fn show_feedback<D, P, K, S, T>(
    performance: u8,
    duration: Duration,
    extras: &[Drawable],
    trigger: Option<TriggerCode>,
    rig: &mut Rig<D, P, K, S, T>,
) where
    D: Display,
    P: Pointer,
    K: Keyboard,
    S: TriggerSink,
    T: Timer<Timestamp = u64>,
{
    rig.display.render(&Drawable::Fixation);
    for extra in extras {
        rig.display.render(extra);
    }
    rig.display.render(&Drawable::Feedback { performance });
    let onset = rig.timer.now();
    rig.display.present();
    if let Some(code) = trigger {
        rig.triggers.emit(&code);
    }
    rig.timer
        .sleep(duration.saturating_sub(rig.timer.elapsed(onset)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingTriggerSink, ScriptedKeyboard, ScriptedPointer, SimulatedDisplay};
    use retrocue_cache::WheelMode;
    use retrocue_core::{Condition, Position, TargetItem};
    use retrocue_timing::SimulatedTimer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const REFRESH: Duration = Duration::from_millis(4);

    type SimRig = Rig<
        SimulatedDisplay,
        ScriptedPointer,
        ScriptedKeyboard,
        RecordingTriggerSink,
        SimulatedTimer,
    >;

    fn rig(timer: &SimulatedTimer) -> SimRig {
        Rig::new(
            SimulatedDisplay::new(timer.clone(), REFRESH),
            ScriptedPointer::new(
                timer.clone(),
                Duration::from_millis(300),
                Duration::from_millis(900),
            ),
            ScriptedKeyboard::new(timer.clone()),
            RecordingTriggerSink::new(timer.clone()),
            timer.clone(),
        )
    }

    fn spec(iti_ms: u64) -> TrialSpec {
        let condition = Condition {
            target_item: TargetItem::First,
            cue_informative: true,
            locations: [Position::Left, Position::Right],
        };
        TrialSpec::draw(&condition, (iti_ms, iti_ms), &mut StdRng::seed_from_u64(3))
    }

    fn wheels() -> WheelCache {
        WheelCache::new(WheelMode::PerTrialRandomized, 1)
    }

    fn sequencer() -> FrameSequencer {
        FrameSequencer::new(FrameTimings::default(), Duration::from_millis(250))
    }

    #[test]
    fn timed_frames_span_their_configured_total() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        let outcome = sequencer().run(&spec(600), &mut wheels(), &mut rig).unwrap();

        let display = &rig.display;
        let first = display.presented()[0].at_ns;
        let wheel = display
            .first_showing(|d| matches!(d, Drawable::Wheel { .. }))
            .unwrap();
        assert_eq!(wheel, 8);
        // 0 + 600 + 250 + 750 + 250 + 750 + 250 + 1000, give or take one refresh.
        let span = display.presented()[wheel].at_ns - first;
        assert!(span.abs_diff(3_850_000_000) <= REFRESH.as_nanos() as u64);
        assert!(outcome.timing_faults.is_empty());
    }

    #[test]
    fn each_frame_is_presented_at_its_schedule() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        sequencer().run(&spec(600), &mut wheels(), &mut rig).unwrap();

        let at: Vec<u64> = rig.display.presented()[..8]
            .iter()
            .map(|f| f.at_ns / 1_000_000)
            .collect();
        assert_eq!(at, [0, 4, 604, 854, 1604, 1854, 2604, 2854]);
    }

    #[test]
    fn triggers_follow_their_frames() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        let outcome = sequencer().run(&spec(600), &mut wheels(), &mut rig).unwrap();

        // Target 1, left then right, informative cue.
        assert_eq!(
            rig.triggers.sink().codes(),
            ["13", "23", "33", "43", "53", "63"]
        );
        assert_eq!(outcome.condition_code.as_str(), "13");

        let sent = rig.triggers.sink().sent();
        let presented = rig.display.presented();
        assert_eq!(sent[0].0, presented[2].at_ns + REFRESH.as_nanos() as u64);
        assert_eq!(sent[2].0, presented[6].at_ns + REFRESH.as_nanos() as u64);
    }

    #[test]
    fn frames_show_stimuli_and_cue() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        let spec = spec(600);
        let outcome = sequencer().run(&spec, &mut wheels(), &mut rig).unwrap();

        let frames = rig.display.presented();
        assert_eq!(frames[0].drawables, [Drawable::Fixation]);
        assert_eq!(
            frames[2].drawables,
            [
                Drawable::Fixation,
                Drawable::Stimulus {
                    hue: spec.stimulus_hues[0],
                    position: Position::Left
                }
            ]
        );
        assert_eq!(
            frames[6].drawables,
            [Drawable::Fixation, Drawable::Cue(spec.retrocue)]
        );
        assert_eq!(
            frames.last().unwrap().drawables,
            [
                Drawable::Fixation,
                Drawable::Feedback {
                    performance: outcome.response.performance
                }
            ]
        );
    }

    #[test]
    fn slow_preparation_is_absorbed_by_the_hold() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        rig.display = SimulatedDisplay::new(timer.clone(), REFRESH)
            .with_render_cost(Duration::from_millis(20));
        let outcome = sequencer().run(&spec(600), &mut wheels(), &mut rig).unwrap();

        let at: Vec<u64> = rig.display.presented()[1..8]
            .iter()
            .map(|f| f.at_ns)
            .collect();
        let spacing: Vec<u64> = at.windows(2).map(|w| (w[1] - w[0]) / 1_000_000).collect();
        assert_eq!(spacing, [600, 250, 750, 250, 750, 250]);
        assert!(outcome.timing_faults.is_empty());
    }

    #[test]
    fn overrun_is_recorded_without_shortening_later_frames() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        let timings = FrameTimings {
            stimulus_ms: 2,
            ..FrameTimings::default()
        };
        let outcome = FrameSequencer::new(timings, Duration::from_millis(250))
            .run(&spec(600), &mut wheels(), &mut rig)
            .unwrap();

        let faults: Vec<usize> = outcome.timing_faults.iter().map(|f| f.frame_index).collect();
        assert_eq!(faults, [2, 4]);
        assert_eq!(outcome.timing_faults[0].elapsed_ms, 4.0);

        let at: Vec<u64> = rig.display.presented()[..8]
            .iter()
            .map(|f| f.at_ns / 1_000_000)
            .collect();
        assert_eq!(at, [0, 4, 604, 608, 1358, 1362, 2112, 2362]);
    }

    #[test]
    fn abort_stops_at_the_next_frame_boundary() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        // Lands inside the first stimulus hold, which ends at 854 ms.
        rig.keyboard = ScriptedKeyboard::new(timer.clone()).abort_at(Duration::from_millis(700));

        let err = sequencer()
            .run(&spec(600), &mut wheels(), &mut rig)
            .unwrap_err();
        assert!(err.is_abort());
        assert_eq!(timer.now(), 854_000_000);
        assert_eq!(rig.display.presented().len(), 3);
        assert_eq!(rig.triggers.sink().codes(), ["13"]);
    }

    #[test]
    fn abort_after_last_hold_skips_the_response() {
        let timer = SimulatedTimer::new();
        let mut rig = rig(&timer);
        rig.keyboard =
            ScriptedKeyboard::new(timer.clone()).abort_at(Duration::from_millis(3000));

        let err = sequencer()
            .run(&spec(600), &mut wheels(), &mut rig)
            .unwrap_err();
        assert!(err.is_abort());
        assert!(
            rig.display
                .first_showing(|d| matches!(d, Drawable::Wheel { .. }))
                .is_none()
        );
    }
}
