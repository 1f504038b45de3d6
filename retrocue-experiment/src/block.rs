use crate::error::TrialError;
use crate::record::RecordSink;
use crate::rig::Rig;
use crate::sequencer::FrameSequencer;
use rand::Rng;
use retrocue_cache::WheelCache;
use retrocue_core::trial_list::generate;
use retrocue_core::{Display, Keyboard, Pointer, TrialRecord, TrialSpec, TriggerSink};
use retrocue_timing::{Timer, ns_to_ms};
use tracing::{info, info_span};

/// Running mean of performance within one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockAggregate {
    total: u64,
    count: u64,
}

impl BlockAggregate {
    pub fn push(&mut self, performance: u8) {
        self.total += u64::from(performance);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Rounded mean, or `None` before the first trial.
    pub fn mean(&self) -> Option<u8> {
        (self.count > 0).then(|| (self.total as f64 / self.count as f64).round() as u8)
    }
}

/// Trials completed by a block that finished normally.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockResult {
    pub trials: usize,
    pub aggregate: BlockAggregate,
}

/// Runs the trials of one block in a freshly balanced order, persisting each
/// record as soon as its trial ends.
#[derive(Debug, Clone)]
pub struct BlockOrchestrator {
    sequencer: FrameSequencer,
    trials_per_block: usize,
    iti_range_ms: (u64, u64),
}

/// Counters carried across blocks of one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Clock reading that record timestamps are relative to.
    pub session_start_ns: u64,
    pub trials_completed: usize,
    pub timing_faults: usize,
}

impl Progress {
    pub fn new(session_start_ns: u64) -> Self {
        Self {
            session_start_ns,
            trials_completed: 0,
            timing_faults: 0,
        }
    }

    /// 1-based number of the trial about to run.
    pub fn next_trial(&self) -> usize {
        self.trials_completed + 1
    }
}

impl BlockOrchestrator {
    pub fn new(sequencer: FrameSequencer, trials_per_block: usize, iti_range_ms: (u64, u64)) -> Self {
        Self {
            sequencer,
            trials_per_block,
            iti_range_ms,
        }
    }

    /// Runs block `block` (1-based). On abort the records written so far are
    /// flushed before the error is returned.
    pub fn run<D, P, K, S, T, R, W>(
        &self,
        block: usize,
        progress: &mut Progress,
        rng: &mut R,
        wheels: &mut WheelCache,
        rig: &mut Rig<D, P, K, S, T>,
        records: &mut W,
    ) -> Result<BlockResult, TrialError>
    where
        D: Display,
        P: Pointer,
        K: Keyboard,
        S: TriggerSink,
        T: Timer<Timestamp = u64>,
        R: Rng + ?Sized,
        W: RecordSink + ?Sized,
    {
        let span = info_span!("block", block);
        let _guard = span.enter();

        let conditions = generate(self.trials_per_block, rng)?;
        let mut aggregate = BlockAggregate::default();
        info!(trials = conditions.len(), "block started");

        for condition in &conditions {
            let spec = TrialSpec::draw(condition, self.iti_range_ms, rng);
            let start = rig.timer.now();
            let outcome = match self.sequencer.run(&spec, wheels, rig) {
                Ok(outcome) => outcome,
                Err(e) => {
                    records.flush()?;
                    return Err(e);
                }
            };
            let end = rig.timer.now();

            let record = TrialRecord::new(
                progress.next_trial(),
                block,
                (
                    ns_to_ms(start.saturating_sub(progress.session_start_ns)),
                    ns_to_ms(end.saturating_sub(progress.session_start_ns)),
                ),
                &spec,
                &outcome,
            );
            records.append(&record)?;
            aggregate.push(record.performance);
            info!(
                trial = record.trial_number,
                code = %record.condition_code,
                performance = record.performance,
                faults = record.timing_faults,
                "trial finished"
            );
            progress.trials_completed += 1;
            progress.timing_faults += record.timing_faults;
        }

        Ok(BlockResult {
            trials: conditions.len(),
            aggregate,
        })
    }
}
