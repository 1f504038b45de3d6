use thiserror::Error;

/// Invalid setup detected before any trial runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("trial count {0} is not divisible by 8, balanced factorial combinations are impossible")]
    InvalidTrialCount(usize),
    #[error("invalid monitor geometry: {0}")]
    InvalidMonitor(String),
    #[error("invalid range for {name}: {low}..={high}")]
    InvalidRange {
        name: &'static str,
        low: u64,
        high: u64,
    },
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("unknown frame label {0:?}")]
    InvalidFrameLabel(String),
    #[error("expected 'left' or 'right', got {0:?}")]
    InvalidPosition(String),
    #[error("hue index {0} is outside the ring 0..360")]
    InvalidHueIndex(i64),
    #[error("expected target item 1 or 2, got {0}")]
    InvalidTargetItem(u8),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
