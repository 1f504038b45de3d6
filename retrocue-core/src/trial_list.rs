use crate::condition::{Condition, Position, TargetItem};
use crate::error::{ConfigurationError, Result};
use rand::Rng;
use rand::seq::SliceRandom;

/// Smallest trial count that balances target item × location 1 × location 2.
pub const BALANCE_UNIT: usize = 8;

/// Builds `n` conditions with exact factor marginals in random order.
///
/// Target items alternate, location 1 is left for the first half and right for the
/// second, and location 2 alternates in runs of `n / 4`, so every target item ×
/// location 1 × location 2 cell holds exactly `n / 8` trials before the shuffle.
/// The shuffle permutes whole conditions and never touches factor values.
pub fn generate<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<Condition>> {
    if n % BALANCE_UNIT != 0 {
        return Err(ConfigurationError::InvalidTrialCount(n).into());
    }

    let half = n / 2;
    let quarter = n / 4;
    let target_items = (0..n).map(|i| TargetItem::ALL[i % 2]);
    let first_locations = (0..n).map(|i| Position::ALL[i / half.max(1)]);
    let second_locations = (0..n).map(|i| Position::ALL[(i / quarter.max(1)) % 2]);

    let mut conditions: Vec<Condition> = target_items
        .zip(first_locations)
        .zip(second_locations)
        .map(|((target_item, first), second)| Condition {
            target_item,
            cue_informative: true,
            locations: [first, second],
        })
        .collect();

    conditions.shuffle(rng);
    Ok(conditions)
}

/// One unbalanced practice condition: two in three cues are informative.
pub fn practice_condition<R: Rng + ?Sized>(rng: &mut R) -> Condition {
    Condition {
        target_item: TargetItem::ALL[rng.random_range(0..2)],
        cue_informative: rng.random_ratio(2, 3),
        locations: [
            Position::ALL[rng.random_range(0..2)],
            Position::ALL[rng.random_range(0..2)],
        ],
    }
}
