pub mod condition;
pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod hue;
pub mod scoring;
pub mod trial;
pub mod trial_list;
pub mod trigger;

pub use condition::{Condition, Position, Retrocue, TargetItem};
pub use device::{Display, Eyetracker, Key, Keyboard, Pointer, TriggerSink};
pub use error::{ConfigurationError, Error, Result};
pub use frame::{Drawable, Frame, FrameAction, FrameLabel, FrameTimings};
pub use geometry::MonitorGeometry;
pub use hue::{HUE_COUNT, HueIndex, HueRing};
pub use scoring::Score;
pub use trial::{ResponseRecord, TimingFault, TrialOutcome, TrialRecord, TrialSpec};
pub use trigger::TriggerCode;
