use crate::condition::{Position, Retrocue, TargetItem};
use crate::error::Result;
use crate::frame::FrameLabel;
use serde::{Serialize, Serializer};
use string_cache::DefaultAtom as Atom;

/// Marker string sent to the recording device. Codes are at most three characters,
/// so the atom stays inline and clones are free.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerCode(Atom);

impl TriggerCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TriggerCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Target identity × both spatial layouts, folded into 1..=8.
pub fn condition_marker(locations: [Position; 2], target_item: TargetItem) -> u8 {
    let mut marker = target_item.number();
    if locations[0] == Position::Right {
        marker += 4;
    }
    if locations[1] == Position::Right {
        marker += 2;
    }
    marker
}

pub fn encode(
    label: FrameLabel,
    locations: [Position; 2],
    target_item: TargetItem,
    retrocue: Retrocue,
) -> TriggerCode {
    let mut code = String::with_capacity(3);
    code.push(label.base_digit());
    if !retrocue.is_informative() {
        code.push('1');
    }
    code.push(char::from(b'0' + condition_marker(locations, target_item)));
    TriggerCode(Atom::from(code))
}

/// String-typed entry point for labels and positions read from outside the engine.
pub fn encode_raw(
    label: &str,
    locations: [&str; 2],
    target_item: u8,
    retrocue: u8,
) -> Result<TriggerCode> {
    let label: FrameLabel = label.parse()?;
    let locations = [locations[0].parse()?, locations[1].parse()?];
    let target_item = TargetItem::try_from(target_item)?;
    let retrocue = Retrocue::try_from(retrocue)?;
    Ok(encode(label, locations, target_item, retrocue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashSet;

    #[test]
    fn uninformative_first_stimulus_on_the_right() {
        let code = encode(
            FrameLabel::StimulusOnset1,
            [Position::Right, Position::Left],
            TargetItem::Second,
            Retrocue::Uninformative,
        );
        assert_eq!(code.as_str(), "116");
    }

    #[test]
    fn informative_cue_has_no_flag() {
        let code = encode(
            FrameLabel::CueOnset,
            [Position::Left, Position::Right],
            TargetItem::First,
            Retrocue::Target(TargetItem::First),
        );
        assert_eq!(code.as_str(), "33");
    }

    #[test]
    fn markers_span_one_to_eight() {
        let mut markers = Vec::new();
        for item in TargetItem::ALL {
            for first in Position::ALL {
                for second in Position::ALL {
                    markers.push(condition_marker([first, second], item));
                }
            }
        }
        markers.sort_unstable();
        assert_eq!(markers, (1..=8).collect::<Vec<u8>>());
    }

    #[test]
    fn codes_never_collide() {
        let mut seen = HashSet::new();
        for label in FrameLabel::ALL {
            for item in TargetItem::ALL {
                for cue in [Retrocue::Target(item), Retrocue::Uninformative] {
                    for first in Position::ALL {
                        for second in Position::ALL {
                            let code = encode(label, [first, second], item, cue);
                            assert!(seen.insert(code.clone()), "duplicate code {code}");
                        }
                    }
                }
            }
        }
        assert_eq!(seen.len(), 6 * 2 * 2 * 4);
    }

    #[test]
    fn raw_inputs_are_validated() {
        assert_eq!(
            encode_raw("stimulus_onset_1", ["right", "left"], 2, 0)
                .unwrap()
                .as_str(),
            "116"
        );
        assert_eq!(
            encode_raw("fixation", ["left", "left"], 1, 1),
            Err(Error::InvalidFrameLabel("fixation".into()))
        );
        assert_eq!(
            encode_raw("cue_onset", ["left", "up"], 1, 1),
            Err(Error::InvalidPosition("up".into()))
        );
        assert_eq!(
            encode_raw("cue_onset", ["left", "left"], 3, 0),
            Err(Error::InvalidTargetItem(3))
        );
    }

    #[test]
    fn serialises_as_plain_string() {
        let code = encode(
            FrameLabel::FeedbackOnset,
            [Position::Right, Position::Right],
            TargetItem::Second,
            Retrocue::Target(TargetItem::Second),
        );
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"68\"");
    }
}
