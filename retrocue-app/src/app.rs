use anyhow::{Context, Result};
use clap::Parser;
use retrocue_core::device::TriggerError;
use retrocue_core::{Display, Drawable, TriggerCode, TriggerSink};
use retrocue_experiment::sim::{ScriptedKeyboard, SimulatedParticipant};
use retrocue_experiment::{
    BlockSummary, BreakDecision, BreakHandler, ExperimentConfig, JsonLinesWriter, NoEyetracker,
    Rig, Session,
};
use retrocue_render::{Layout, SkiaDisplay};
use retrocue_timing::{HighPrecisionTimer, SimulatedTimer, Timer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Runs a retro-cue session headless with a simulated participant, to check
/// timing, markers and the output file before testing real participants.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// TOML experiment configuration. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    participant: Option<u32>,
    #[arg(long)]
    session: Option<u32>,
    #[arg(long)]
    blocks: Option<usize>,
    #[arg(long)]
    trials_per_block: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Rounds per practice phase. 0 skips practice.
    #[arg(long, default_value_t = 2)]
    practice_rounds: usize,
    /// Run on a virtual clock instead of sleeping in real time.
    #[arg(long)]
    simulated_clock: bool,
    /// Press the abort key this many seconds into the session.
    #[arg(long)]
    abort_after: Option<f64>,
    /// TTF/OTF font for cue and feedback text.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Write the last presented frame here as PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

pub struct App {
    config: ExperimentConfig,
    simulated_clock: bool,
    abort_after: Option<Duration>,
    font: Option<PathBuf>,
    snapshot: Option<PathBuf>,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => ExperimentConfig::load(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(participant) = cli.participant {
            config.participant = participant;
        }
        if let Some(session) = cli.session {
            config.session = session;
        }
        if let Some(blocks) = cli.blocks {
            config.blocks = blocks;
        }
        if let Some(trials) = cli.trials_per_block {
            config.trials_per_block = trials;
        }
        if let Some(dir) = cli.output_dir {
            config.output_dir = dir;
        }
        config.seed = cli.seed.or(config.seed);
        config.practice = cli.practice_rounds > 0;
        config.practice_round_limit = Some(cli.practice_rounds);
        config.rehearsal = true;
        config.validate()?;

        let abort_after = cli
            .abort_after
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("--abort-after must be a non-negative number of seconds")?;

        Ok(Self {
            config,
            simulated_clock: cli.simulated_clock,
            abort_after,
            font: cli.font,
            snapshot: cli.snapshot,
        })
    }

    pub fn run(self) -> Result<()> {
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            simulated_clock = self.simulated_clock,
            "rehearsal run"
        );
        if self.simulated_clock {
            self.run_with(SimulatedTimer::new())
        } else {
            self.run_with(HighPrecisionTimer::new())
        }
    }

    fn run_with<T: Timer<Timestamp = u64>>(self, timer: T) -> Result<()> {
        let monitor = self.config.monitor;
        let mut skia = SkiaDisplay::new(monitor, self.config.hue_ring)?;
        if let Some(path) = &self.font {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
            skia = skia.with_font(bytes)?;
        }
        let display = PacedDisplay::new(skia, timer.clone(), monitor.refresh_interval());

        let layout = Layout::default();
        let ring_radius = monitor.deg2pix((layout.wheel_outer_radius + layout.wheel_inner_radius) / 2.0);
        let participant_seed = self.config.seed.unwrap_or_default() ^ 0x5eed;
        let pointer = SimulatedParticipant::new(timer.clone(), ring_radius, participant_seed);

        let mut keyboard = ScriptedKeyboard::new(timer.clone());
        if let Some(after) = self.abort_after {
            keyboard = keyboard.abort_at(Duration::from_nanos(timer.now()) + after);
        }

        let mut rig = Rig::new(display, pointer, keyboard, LoggingTriggerSink, timer);
        let path = self.config.output_file();
        let mut writer = JsonLinesWriter::open(&path)
            .with_context(|| format!("opening record file {}", path.display()))?;

        let mut session = Session::new(self.config)?;
        let report = session.run(&mut rig, &mut NoEyetracker, &mut LoggedBreaks, &mut writer)?;

        let stats = rig.display.timer.calibration_stats();
        info!(
            frame_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            fps = stats.effective_fps,
            frames = rig.display.inner.presented_frames(),
            "display pacing"
        );
        info!(
            rows = writer.rows(),
            path = %writer.path().display(),
            report = %serde_json::to_string(&report)?,
            "rehearsal finished"
        );

        if let Some(snapshot) = &self.snapshot {
            rig.display
                .inner
                .front()
                .save_png(snapshot)
                .with_context(|| format!("writing snapshot {}", snapshot.display()))?;
        }
        Ok(())
    }
}

/// Holds each flip to the monitor's refresh grid, standing in for vsync on a
/// headless display.
struct PacedDisplay<T: Timer<Timestamp = u64>> {
    inner: SkiaDisplay,
    timer: T,
    refresh: Duration,
    last_flip: Option<u64>,
}

impl<T: Timer<Timestamp = u64>> PacedDisplay<T> {
    fn new(inner: SkiaDisplay, timer: T, refresh: Duration) -> Self {
        Self {
            inner,
            timer,
            refresh,
            last_flip: None,
        }
    }
}

impl<T: Timer<Timestamp = u64>> Display for PacedDisplay<T> {
    fn render(&mut self, drawable: &Drawable) {
        self.inner.render(drawable);
    }

    fn present(&mut self) {
        if let Some(last) = self.last_flip {
            let since = self.timer.elapsed(last);
            if since < self.refresh {
                self.timer.sleep(self.refresh - since);
            }
            // Only back-to-back flips say anything about frame pacing.
            let frame = self.timer.elapsed(last);
            if frame < self.refresh * 2 {
                self.timer.record_frame(frame);
            }
        }
        self.inner.present();
        self.last_flip = Some(self.timer.now());
    }
}

/// Stands in for the parallel port: every marker goes to the log.
struct LoggingTriggerSink;

impl TriggerSink for LoggingTriggerSink {
    fn send(&mut self, code: &TriggerCode) -> Result<(), TriggerError> {
        info!(target: "trigger", %code);
        Ok(())
    }
}

/// Logs the break screen and carries straight on.
struct LoggedBreaks;

impl BreakHandler for LoggedBreaks {
    fn take_break(&mut self, summary: &BlockSummary) -> BreakDecision {
        match summary.mean_performance {
            Some(mean) => info!(
                block = summary.block,
                of = summary.blocks_total,
                kind = ?summary.kind,
                mean,
                "break"
            ),
            None => warn!(block = summary.block, "break after an empty block"),
        }
        BreakDecision::Continue
    }
}
