pub mod block;
pub mod config;
pub mod error;
pub mod practice;
pub mod record;
pub mod response;
pub mod rig;
pub mod sequencer;
pub mod session;
pub mod sim;

pub use block::{BlockAggregate, BlockOrchestrator, BlockResult, Progress};
pub use config::ExperimentConfig;
pub use error::TrialError;
pub use practice::{Practice, PracticeKind, PracticeStep};
pub use record::{JsonLinesWriter, RecordSink};
pub use response::ResponseCollector;
pub use rig::{Rig, TriggerChannel, TriggerContext};
pub use sequencer::FrameSequencer;
pub use session::{
    BlockSummary, BreakDecision, BreakHandler, BreakKind, NoEyetracker, Session, SessionReport,
};
