use crate::condition::{Position, Retrocue};
use crate::device::Display;
use crate::error::{Error, Result};
use crate::hue::HueIndex;
use crate::trial::TrialSpec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Events that carry a hardware marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameLabel {
    StimulusOnset1,
    StimulusOnset2,
    CueOnset,
    ResponseOnset,
    ResponseOffset,
    FeedbackOnset,
}

impl FrameLabel {
    pub const ALL: [FrameLabel; 6] = [
        FrameLabel::StimulusOnset1,
        FrameLabel::StimulusOnset2,
        FrameLabel::CueOnset,
        FrameLabel::ResponseOnset,
        FrameLabel::ResponseOffset,
        FrameLabel::FeedbackOnset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FrameLabel::StimulusOnset1 => "stimulus_onset_1",
            FrameLabel::StimulusOnset2 => "stimulus_onset_2",
            FrameLabel::CueOnset => "cue_onset",
            FrameLabel::ResponseOnset => "response_onset",
            FrameLabel::ResponseOffset => "response_offset",
            FrameLabel::FeedbackOnset => "feedback_onset",
        }
    }

    /// Leading digit of every trigger code sent for this event.
    pub fn base_digit(self) -> char {
        match self {
            FrameLabel::StimulusOnset1 => '1',
            FrameLabel::StimulusOnset2 => '2',
            FrameLabel::CueOnset => '3',
            FrameLabel::ResponseOnset => '4',
            FrameLabel::ResponseOffset => '5',
            FrameLabel::FeedbackOnset => '6',
        }
    }
}

impl FromStr for FrameLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FrameLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| Error::InvalidFrameLabel(s.to_string()))
    }
}

/// Anything the display can be asked to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Drawable {
    Fixation,
    Stimulus { hue: HueIndex, position: Position },
    Cue(Retrocue),
    /// Response ring rotated by `offset` degrees.
    Wheel { offset: u16 },
    /// Selection marker on the ring at the pointer angle.
    Marker { hue: HueIndex, angle_deg: f32 },
    Feedback { performance: u8 },
    /// Target colour patch used in wheel practice.
    Swatch { hue: HueIndex },
}

/// What a timed frame shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameAction {
    Fixation,
    Stimulus { hue: HueIndex, position: Position },
    Cue(Retrocue),
}

impl FrameAction {
    /// Draws the frame into the display's back buffer. Every frame keeps the fixation dot.
    pub fn draw<D: Display + ?Sized>(&self, display: &mut D) {
        display.render(&Drawable::Fixation);
        match *self {
            FrameAction::Fixation => {}
            FrameAction::Stimulus { hue, position } => {
                display.render(&Drawable::Stimulus { hue, position })
            }
            FrameAction::Cue(cue) => display.render(&Drawable::Cue(cue)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub duration_ms: u64,
    pub action: FrameAction,
    pub trigger: Option<FrameLabel>,
}

impl Frame {
    fn fixation(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            action: FrameAction::Fixation,
            trigger: None,
        }
    }
}

/// Fixed protocol durations of the timed frames. The ITI comes from the trial itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTimings {
    pub pre_fixation_ms: u64,
    pub stimulus_ms: u64,
    pub post_stimulus_ms: u64,
    pub cue_ms: u64,
    pub post_cue_ms: u64,
}

impl Default for FrameTimings {
    fn default() -> Self {
        Self {
            pre_fixation_ms: 0,
            stimulus_ms: 250,
            post_stimulus_ms: 750,
            cue_ms: 250,
            post_cue_ms: 1000,
        }
    }
}

impl FrameTimings {
    /// The eight timed frames of one trial, in display order.
    pub fn frames(&self, spec: &TrialSpec) -> [Frame; 8] {
        [
            Frame::fixation(self.pre_fixation_ms),
            Frame::fixation(spec.iti_ms),
            Frame {
                duration_ms: self.stimulus_ms,
                action: FrameAction::Stimulus {
                    hue: spec.stimulus_hues[0],
                    position: spec.locations[0],
                },
                trigger: Some(FrameLabel::StimulusOnset1),
            },
            Frame::fixation(self.post_stimulus_ms),
            Frame {
                duration_ms: self.stimulus_ms,
                action: FrameAction::Stimulus {
                    hue: spec.stimulus_hues[1],
                    position: spec.locations[1],
                },
                trigger: Some(FrameLabel::StimulusOnset2),
            },
            Frame::fixation(self.post_stimulus_ms),
            Frame {
                duration_ms: self.cue_ms,
                action: FrameAction::Cue(spec.retrocue),
                trigger: Some(FrameLabel::CueOnset),
            },
            Frame::fixation(self.post_cue_ms),
        ]
    }
}
