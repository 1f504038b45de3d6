use thiserror::Error;

/// Why a trial did not reach its record.
#[derive(Debug, Error)]
pub enum TrialError {
    /// The participant pressed the abort key. Not a fault: the caller unwinds the
    /// session after flushing what was recorded.
    #[error("aborted by participant")]
    Aborted,
    #[error(transparent)]
    Core(#[from] retrocue_core::Error),
    #[error(transparent)]
    Device(#[from] retrocue_core::device::DeviceError),
    #[error("could not persist trial record: {0}")]
    Record(#[from] std::io::Error),
}

impl TrialError {
    pub fn is_abort(&self) -> bool {
        matches!(self, TrialError::Aborted)
    }
}

impl From<retrocue_core::ConfigurationError> for TrialError {
    fn from(e: retrocue_core::ConfigurationError) -> Self {
        TrialError::Core(e.into())
    }
}
