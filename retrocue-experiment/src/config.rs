use anyhow::Context;
use retrocue_cache::WheelMode;
use retrocue_core::trial_list::BALANCE_UNIT;
use retrocue_core::{ConfigurationError, FrameTimings, HueRing, MonitorGeometry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a session needs to know before its first frame. Read once, never
/// mutated while trials run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub participant: u32,
    pub session: u32,
    pub blocks: usize,
    pub trials_per_block: usize,
    /// Inclusive bounds of the random inter-trial interval.
    pub iti_range_ms: (u64, u64),
    pub frames: FrameTimings,
    pub feedback_ms: u64,
    pub practice_feedback_ms: u64,
    /// Run wheel and trial practice before the first block.
    pub practice: bool,
    /// Caps each practice phase. Unlimited phases end on the abort key only.
    pub practice_round_limit: Option<usize>,
    pub wheel_mode: WheelMode,
    pub hue_ring: HueRing,
    pub monitor: MonitorGeometry,
    /// Fixed seed for reproducible sessions. Drawn from the OS when absent.
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    /// Marks a dry run: output files get a `_test` suffix.
    pub rehearsal: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            participant: 0,
            session: 1,
            blocks: 16,
            trials_per_block: 48,
            iti_range_ms: (500, 800),
            frames: FrameTimings::default(),
            feedback_ms: 250,
            practice_feedback_ms: 500,
            practice: true,
            practice_round_limit: None,
            wheel_mode: WheelMode::default(),
            hue_ring: HueRing::default(),
            monitor: MonitorGeometry::default(),
            seed: None,
            output_dir: PathBuf::from("data"),
            rehearsal: false,
        }
    }
}

impl ExperimentConfig {
    /// Reads a TOML file. Missing keys fall back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.blocks == 0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "blocks",
                reason: "a session needs at least one block".into(),
            });
        }
        if self.trials_per_block == 0 || self.trials_per_block % BALANCE_UNIT != 0 {
            return Err(ConfigurationError::InvalidTrialCount(self.trials_per_block));
        }
        let (low, high) = self.iti_range_ms;
        if low > high {
            return Err(ConfigurationError::InvalidRange {
                name: "iti_range_ms",
                low,
                high,
            });
        }
        for (name, value) in [
            ("hue_ring.saturation", self.hue_ring.saturation),
            ("hue_ring.value", self.hue_ring.value),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::InvalidSetting {
                    name,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }
        self.monitor.validate()
    }

    /// 1-based block after which the long break falls.
    pub fn long_break_block(&self) -> usize {
        (self.blocks / 2).max(1)
    }

    pub fn total_trials(&self) -> usize {
        self.blocks * self.trials_per_block
    }

    pub fn output_file(&self) -> PathBuf {
        let suffix = if self.rehearsal { "_test" } else { "" };
        self.output_dir.join(format!(
            "data_sub{:02}_session_{}{suffix}.jsonl",
            self.participant, self.session
        ))
    }
}
