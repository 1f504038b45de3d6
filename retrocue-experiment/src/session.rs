use crate::block::{BlockOrchestrator, Progress};
use crate::config::ExperimentConfig;
use crate::error::TrialError;
use crate::practice::{Practice, PracticeKind};
use crate::record::RecordSink;
use crate::rig::Rig;
use crate::sequencer::FrameSequencer;
use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retrocue_cache::WheelCache;
use retrocue_core::device::DeviceError;
use retrocue_core::{ConfigurationError, Display, Eyetracker, Keyboard, Pointer, TriggerSink};
use retrocue_timing::Timer;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    /// Halfway through the session.
    Long,
}

/// What the participant is shown between blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub block: usize,
    pub blocks_total: usize,
    pub mean_performance: Option<u8>,
    pub kind: BreakKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    Continue,
    Recalibrate,
}

/// Shows the break screen and waits for the participant or experimenter.
pub trait BreakHandler {
    fn take_break(&mut self, summary: &BlockSummary) -> BreakDecision;
}

/// Sessions run without an eyetracker use this.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEyetracker;

impl Eyetracker for NoEyetracker {
    fn calibrate(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub seed: u64,
    pub practice_rounds: usize,
    pub blocks_completed: usize,
    pub trials_completed: usize,
    pub triggers_sent: usize,
    pub trigger_failures: usize,
    pub timing_faults: usize,
    /// Set when the participant aborted before the last block ended.
    pub finished_early: bool,
}

/// One participant session: practice, the experimental blocks with breaks in
/// between, and a finalisation step that runs however the blocks ended.
#[derive(Debug)]
pub struct Session {
    config: ExperimentConfig,
    seed: u64,
    rng: StdRng,
    wheels: WheelCache,
    orchestrator: BlockOrchestrator,
    practice: Practice,
}

impl Session {
    pub fn new(config: ExperimentConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);
        let wheels = WheelCache::new(config.wheel_mode, rng.random());
        let sequencer =
            FrameSequencer::new(config.frames, Duration::from_millis(config.feedback_ms));
        Ok(Self {
            orchestrator: BlockOrchestrator::new(
                sequencer.clone(),
                config.trials_per_block,
                config.iti_range_ms,
            ),
            practice: Practice::new(
                sequencer,
                config.iti_range_ms,
                Duration::from_millis(config.practice_feedback_ms),
            ),
            config,
            seed,
            rng,
            wheels,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Runs the whole session. An abort by the participant is a normal end and
    /// yields a report with `finished_early` set. Recording is stopped and
    /// records are flushed on every path out.
    pub fn run<D, P, K, S, T, E, B, W>(
        &mut self,
        rig: &mut Rig<D, P, K, S, T>,
        eyetracker: &mut E,
        breaks: &mut B,
        records: &mut W,
    ) -> anyhow::Result<SessionReport>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        E: Eyetracker + ?Sized,
        B: BreakHandler + ?Sized,
        W: RecordSink + ?Sized,
    {
        info!(
            participant = self.config.participant,
            session = self.config.session,
            seed = self.seed,
            blocks = self.config.blocks,
            trials_per_block = self.config.trials_per_block,
            "session started"
        );
        let mut report = SessionReport {
            seed: self.seed,
            ..Default::default()
        };
        let mut progress = Progress::new(rig.timer.now());

        eyetracker
            .start_recording()
            .context("starting eyetracker recording")?;
        let outcome = self.run_phases(rig, eyetracker, breaks, records, &mut progress, &mut report);

        if let Err(e) = eyetracker.stop_recording() {
            warn!(error = %e, "could not stop eyetracker recording");
        }
        let flushed = records.flush();
        self.wheels.invalidate();

        report.trials_completed = progress.trials_completed;
        report.timing_faults = progress.timing_faults;
        report.triggers_sent = rig.triggers.sent();
        report.trigger_failures = rig.triggers.failures();

        match outcome {
            Ok(()) => {}
            Err(TrialError::Aborted) => report.finished_early = true,
            Err(e) => return Err(e).context("session failed"),
        }
        flushed.context("flushing trial records")?;

        info!(
            trials = report.trials_completed,
            blocks = report.blocks_completed,
            trigger_failures = report.trigger_failures,
            timing_faults = report.timing_faults,
            finished_early = report.finished_early,
            "session finished"
        );
        Ok(report)
    }

    fn run_phases<D, P, K, S, T, E, B, W>(
        &mut self,
        rig: &mut Rig<D, P, K, S, T>,
        eyetracker: &mut E,
        breaks: &mut B,
        records: &mut W,
        progress: &mut Progress,
        report: &mut SessionReport,
    ) -> Result<(), TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        E: Eyetracker + ?Sized,
        B: BreakHandler + ?Sized,
        W: RecordSink + ?Sized,
    {
        if self.config.practice {
            for kind in [PracticeKind::Wheel, PracticeKind::Trials] {
                report.practice_rounds += self.practice.run_until_stopped(
                    kind,
                    self.config.practice_round_limit,
                    &mut self.rng,
                    &mut self.wheels,
                    rig,
                )?;
            }
        }

        let blocks_total = self.config.blocks;
        for block in 1..=blocks_total {
            let result = self.orchestrator.run(
                block,
                progress,
                &mut self.rng,
                &mut self.wheels,
                rig,
                records,
            )?;
            report.blocks_completed = block;
            if block == blocks_total {
                break;
            }

            let summary = BlockSummary {
                block,
                blocks_total,
                mean_performance: result.aggregate.mean(),
                kind: if block == self.config.long_break_block() {
                    BreakKind::Long
                } else {
                    BreakKind::Short
                },
            };
            info!(?summary, "break");
            let mut restarted = false;
            while breaks.take_break(&summary) == BreakDecision::Recalibrate {
                info!(block, "recalibrating eyetracker");
                eyetracker.stop_recording()?;
                eyetracker.calibrate()?;
                eyetracker.start_recording()?;
                restarted = true;
            }
            // The second half always gets a recording of its own.
            if summary.kind == BreakKind::Long && !restarted {
                eyetracker.stop_recording()?;
                eyetracker.start_recording()?;
            }
            rig.keyboard.clear();
        }
        Ok(())
    }
}
