use rand::seq::index;
use rand::Rng;

use crate::{RandomiserError, Result};

/// Weight given to an entry that must always be picked when eligible.
pub const MAX_WEIGHT: u16 = 10000;

/// Parameters of one weight vector: `count` weights spread over
/// `0..=upper_bound`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WeightSpec {
    pub upper_bound: u32,
    pub count: usize,
}

impl WeightSpec {
    pub fn new(upper_bound: u32, count: usize) -> Self {
        Self { upper_bound, count }
    }

    /// Minimum spacing between two weights: the even share of the range,
    /// scaled down to somewhere in 75%..100%.
    pub fn min_distance<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.count == 0 {
            return 0;
        }
        let even_share = u64::from(self.upper_bound) / self.count as u64;
        let percent: u64 = rng.gen_range(75..100);
        (even_share * percent / 100) as u32
    }
}

/// Draws `count` distinct values from `0..=upper_bound`, returned ascending,
/// where neighbouring values are at least `min_distance` apart.
///
/// Offsets are drawn without replacement from the range left over once the
/// mandatory gaps are removed, then the gaps are added back. Every valid
/// arrangement is equally likely.
pub fn sample_with_minimum_distance<R: Rng + ?Sized>(
    rng: &mut R,
    upper_bound: u32,
    count: usize,
    min_distance: u32,
) -> Result<Vec<u32>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    // Distinct values are always at least one apart.
    let step = u64::from(min_distance.max(1));
    let reserved = (count as u64 - 1) * (step - 1);
    let slots = u64::from(upper_bound) + 1;

    if reserved + count as u64 > slots {
        return Err(RandomiserError::InsufficientRange {
            upper_bound,
            count,
            min_distance,
        });
    }

    let free = (slots - reserved) as usize;
    let mut offsets: Vec<u64> = index::sample(rng, free, count)
        .into_iter()
        .map(|i| i as u64)
        .collect();
    offsets.sort_unstable();

    Ok(offsets
        .into_iter()
        .enumerate()
        .map(|(i, offset)| (offset + (step - 1) * i as u64) as u32)
        .collect())
}

/// Returns `count` weights in `0..=upper_bound` with roughly equal spacing.
/// Exactly one of them is `upper_bound`; the order is not meaningful.
pub fn random_weights<R: Rng + ?Sized>(
    rng: &mut R,
    upper_bound: u16,
    count: usize,
) -> Result<Vec<u16>> {
    spaced_weights(rng, upper_bound, count).map(|(weights, _)| weights)
}

/// Like [`random_weights`], also returning the spacing that was used.
pub(crate) fn spaced_weights<R: Rng + ?Sized>(
    rng: &mut R,
    upper_bound: u16,
    count: usize,
) -> Result<(Vec<u16>, u32)> {
    if count == 0 {
        return Err(RandomiserError::InsufficientRange {
            upper_bound: u32::from(upper_bound),
            count,
            min_distance: 0,
        });
    }

    let spec = WeightSpec::new(u32::from(upper_bound), count);
    let d = spec.min_distance(rng);

    // Sample below the bound and shift everything up by d, so even the
    // smallest weight keeps a real chance.
    let mut weights: Vec<u16> =
        sample_with_minimum_distance(rng, spec.upper_bound - d, count, d)?
            .into_iter()
            .map(|w| (w + d) as u16)
            .collect();

    if let Some(highest) = weights
        .iter()
        .enumerate()
        .max_by_key(|(_, w)| **w)
        .map(|(i, _)| i)
    {
        weights[highest] = upper_bound;
    }

    Ok((weights, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn assert_spaced(values: &[u32], upper_bound: u32, count: usize, min_distance: u32) {
        assert_eq!(values.len(), count);
        assert!(values.iter().all(|&v| v <= upper_bound));
        for pair in values.windows(2) {
            assert!(pair[1] > pair[0], "not strictly ascending: {:?}", values);
            assert!(
                pair[1] - pair[0] >= min_distance,
                "gap below {}: {:?}",
                min_distance,
                values
            );
        }
    }

    #[test]
    fn samples_four_values_in_ten_thousand() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let values = sample_with_minimum_distance(&mut rng, 10000, 4, 1875).unwrap();
            assert_spaced(&values, 10000, 4, 1875);
        }
    }

    #[test]
    fn tight_fit_has_one_arrangement() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = sample_with_minimum_distance(&mut rng, 9, 4, 3).unwrap();
        assert_eq!(values, vec![0, 3, 6, 9]);
    }

    #[test]
    fn zero_distance_still_distinct() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut values = sample_with_minimum_distance(&mut rng, 5, 6, 0).unwrap();
        values.dedup();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn rejects_impossible_spacing() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample_with_minimum_distance(&mut rng, 100, 5, 30).unwrap_err();
        assert!(matches!(
            err,
            RandomiserError::InsufficientRange {
                upper_bound: 100,
                count: 5,
                min_distance: 30
            }
        ));

        let err = sample_with_minimum_distance(&mut rng, 3, 5, 0).unwrap_err();
        assert!(matches!(err, RandomiserError::InsufficientRange { .. }));
    }

    #[test]
    fn fits_whenever_count_times_distance_fits() {
        let mut rng = StdRng::seed_from_u64(42);
        for upper_bound in [0u32, 1, 7, 50, 999, 10000] {
            for count in 1..=12usize {
                for min_distance in 0..=60u32 {
                    if count as u64 * u64::from(min_distance) > u64::from(upper_bound) + 1 {
                        continue;
                    }
                    if count as u64 > u64::from(upper_bound) + 1 {
                        continue;
                    }
                    let values =
                        sample_with_minimum_distance(&mut rng, upper_bound, count, min_distance)
                            .unwrap();
                    assert_spaced(&values, upper_bound, count, min_distance);
                }
            }
        }
    }

    #[test]
    fn placement_reaches_both_ends() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut saw_low = false;
        let mut saw_high = false;
        for _ in 0..2000 {
            let values = sample_with_minimum_distance(&mut rng, 20, 2, 5).unwrap();
            saw_low |= values[0] == 0;
            saw_high |= values[1] == 20;
        }
        assert!(saw_low && saw_high);
    }

    #[test]
    fn weights_have_a_single_maximum() {
        for seed in 0..300 {
            let mut rng = StdRng::seed_from_u64(seed);
            let count = (seed % 20) as usize + 1;
            let (weights, d) = spaced_weights(&mut rng, MAX_WEIGHT, count).unwrap();
            assert_eq!(weights.len(), count);
            assert_eq!(weights.iter().filter(|&&w| w == MAX_WEIGHT).count(), 1);
            assert!(weights.iter().all(|&w| u32::from(w) >= d));
        }
    }

    #[test]
    fn spacing_is_three_quarters_to_full_share() {
        let mut rng = StdRng::seed_from_u64(5);
        let spec = WeightSpec::new(10000, 8);
        for _ in 0..500 {
            let d = spec.min_distance(&mut rng);
            assert!((937..=1237).contains(&d), "d = {}", d);
        }
    }

    #[test]
    fn empty_weight_vector_is_a_configuration_error() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            random_weights(&mut rng, MAX_WEIGHT, 0),
            Err(RandomiserError::InsufficientRange { count: 0, .. })
        ));
    }
}
