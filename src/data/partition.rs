// ============================================================
// Layer 4: Contiguous Partitioning
// ============================================================
// The indexed sample list is cut into `parts` contiguous,
// non-overlapping ranges that are trained one after another.
//
//   total = 23, parts = 4  →  part_size = 23 / 4 = 5
//   [0..5) [5..10) [10..15) [15..23)
//                           └─ last part absorbs the remainder
//
// Partitions are never shuffled relative to each other; only the
// batch order inside one partition's epoch is shuffled.

use std::ops::Range;

use crate::domain::error::TrainError;

/// Sample range of partition `index` out of `parts`.
///
/// Callers guarantee `1 <= parts` and `index < parts`
/// (see `validate_partitioning`).
pub fn partition_range(total: usize, parts: usize, index: usize) -> Range<usize> {
    let part_size = total / parts;
    let start     = index * part_size;
    let end       = if index + 1 == parts { total } else { start + part_size };
    start..end
}

/// Every partition must contain at least one sample
pub fn validate_partitioning(total: usize, parts: usize) -> Result<(), TrainError> {
    if parts == 0 {
        return Err(TrainError::InvalidConfig("parts must be at least 1".into()));
    }
    if parts > total {
        return Err(TrainError::InvalidConfig(format!(
            "parts ({parts}) exceeds the number of samples ({total})"
        )));
    }
    Ok(())
}

/// Seed for the batch shuffle of one (partition, epoch).
///
/// Depends only on the position, so a resumed run shuffles epoch
/// `e` exactly like an uninterrupted run would.
pub fn epoch_shuffle_seed(base: u64, partition: usize, epoch: usize) -> u64 {
    base.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((partition as u64) << 32)
        .wrapping_add(epoch as u64)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_sum_to_total_for_every_part_count() {
        for total in 1..40 {
            for parts in 1..=total {
                let mut covered = 0;
                for index in 0..parts {
                    let range = partition_range(total, parts, index);
                    assert_eq!(range.start, covered, "gap at total={total} parts={parts}");
                    covered = range.end;
                }
                assert_eq!(covered, total);
            }
        }
    }

    #[test]
    fn test_last_partition_absorbs_remainder() {
        assert_eq!(partition_range(23, 4, 0), 0..5);
        assert_eq!(partition_range(23, 4, 2), 10..15);
        assert_eq!(partition_range(23, 4, 3), 15..23);
    }

    #[test]
    fn test_single_partition_is_everything() {
        assert_eq!(partition_range(20, 1, 0), 0..20);
    }

    #[test]
    fn test_even_split() {
        assert_eq!(partition_range(20, 2, 0), 0..10);
        assert_eq!(partition_range(20, 2, 1), 10..20);
    }

    #[test]
    fn test_partitioning_validation() {
        assert!(validate_partitioning(10, 0).is_err());
        assert!(validate_partitioning(3, 4).is_err());
        assert!(validate_partitioning(4, 4).is_ok());
    }

    #[test]
    fn test_shuffle_seed_differs_per_position() {
        let a = epoch_shuffle_seed(42, 0, 0);
        let b = epoch_shuffle_seed(42, 0, 1);
        let c = epoch_shuffle_seed(42, 1, 0);
        assert!(a != b && a != c && b != c);
        assert_eq!(a, epoch_shuffle_seed(42, 0, 0));
    }
}
