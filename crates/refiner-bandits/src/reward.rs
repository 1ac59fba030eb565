//! Reward signal for refined ratings.

use refiner_core::Rating;

/// Scores `refined` against the ground truth.
///
/// Without a ground-truth rating the reward is exactly `0.0`, which leaves
/// the policy untouched in expectation. Otherwise it is the negative absolute
/// error: a perfect prediction earns `0.0`, and the scale is unbounded below.
#[must_use]
pub fn reward(refined: i32, actual: Rating) -> f64 {
    match actual {
        Rating::NoRating => 0.0,
        Rating::Rated(actual) => -(f64::from(refined) - f64::from(actual)).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn no_rating_is_neutral() {
        for r in -5..=15 {
            assert_eq!(reward(r, Rating::NoRating), 0.0);
        }
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn reward_is_negative_absolute_error() {
        for r in 1..=10 {
            for a in -3..=12 {
                assert_eq!(reward(r, Rating::Rated(a)), -f64::from((r - a).abs()));
            }
        }
        assert_eq!(reward(9, Rating::Rated(9)), 0.0);
        assert_eq!(reward(3, Rating::Rated(8)), -5.0);
    }
}
