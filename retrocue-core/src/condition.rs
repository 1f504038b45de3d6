use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Side of fixation a stimulus appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Left,
    Right,
}

impl Position {
    pub const ALL: [Position; 2] = [Position::Left, Position::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Left => "left",
            Position::Right => "right",
        }
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Position::Left),
            "right" => Ok(Position::Right),
            other => Err(Error::InvalidPosition(other.to_string())),
        }
    }
}

/// Which of the two stimuli is probed at response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TargetItem {
    First,
    Second,
}

impl TargetItem {
    pub const ALL: [TargetItem; 2] = [TargetItem::First, TargetItem::Second];

    pub fn number(self) -> u8 {
        match self {
            TargetItem::First => 1,
            TargetItem::Second => 2,
        }
    }

    /// Zero-based slot of the target in per-stimulus arrays.
    pub fn slot(self) -> usize {
        self.number() as usize - 1
    }
}

impl From<TargetItem> for u8 {
    fn from(item: TargetItem) -> u8 {
        item.number()
    }
}

impl TryFrom<u8> for TargetItem {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            1 => Ok(TargetItem::First),
            2 => Ok(TargetItem::Second),
            other => Err(Error::InvalidTargetItem(other)),
        }
    }
}

/// Post-stimulus cue. Serialised as the target number, or `0` when uninformative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Retrocue {
    Target(TargetItem),
    Uninformative,
}

impl Retrocue {
    pub const UNINFORMATIVE_VALUE: u8 = 0;

    pub fn value(self) -> u8 {
        match self {
            Retrocue::Target(item) => item.number(),
            Retrocue::Uninformative => Self::UNINFORMATIVE_VALUE,
        }
    }

    pub fn is_informative(self) -> bool {
        matches!(self, Retrocue::Target(_))
    }
}

impl From<Retrocue> for u8 {
    fn from(cue: Retrocue) -> u8 {
        cue.value()
    }
}

impl TryFrom<u8> for Retrocue {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self> {
        if n == Self::UNINFORMATIVE_VALUE {
            Ok(Retrocue::Uninformative)
        } else {
            TargetItem::try_from(n).map(Retrocue::Target)
        }
    }
}

/// One cell of the target item × location 1 × location 2 design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub target_item: TargetItem,
    pub cue_informative: bool,
    pub locations: [Position; 2],
}

impl Condition {
    pub fn retrocue(&self) -> Retrocue {
        if self.cue_informative {
            Retrocue::Target(self.target_item)
        } else {
            Retrocue::Uninformative
        }
    }
}
