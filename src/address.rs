//! Bit addressing shared by directory lookup and bucket splitting.
//!
//! Directory slots are addressed by the low-order bits of `|key|`. A bucket
//! with local depth `d` owns every slot whose low `d` bits match its
//! pattern, so splitting it makes bit `d` (zero based, counted from the low
//! end) significant. [`address_bits`] and [`split_bit`] must agree on that
//! convention or the split would hand the wrong half of the directory to
//! the new bucket.

/// Returns the non-negative integer formed by the low-order `depth` bits of
/// `|key|`, that is `|key| mod 2^depth`.
///
/// A depth of zero always yields `0`, the single slot of a fresh directory.
/// `i64::MIN` is handled through [`i64::unsigned_abs`].
#[inline]
pub fn address_bits(key: i64, depth: u32) -> usize {
    if depth == 0 {
        return 0;
    }
    let magnitude: u64 = key.unsigned_abs();
    let mask: u64 = if depth >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << depth) - 1
    };
    (magnitude & mask) as usize
}

/// Is the bit that becomes significant when a bucket grows to
/// `local_depth` set in the directory index `index`?
///
/// Slots for which this holds move to the new sibling bucket.
#[inline]
pub fn split_bit(index: usize, local_depth: u32) -> bool {
    debug_assert!(local_depth > 0, "a split always yields a local depth of at least 1");
    (index >> (local_depth - 1)) & 1 == 1
}

/// Finds the smallest local depth above `from` at which the keys of `group`
/// that share `key`'s address number at most `capacity`.
///
/// `group` is the content of the overflowing bucket together with `key`.
/// Every split of that bucket hands the overflow to the side that holds
/// `key`, so this is the local depth the key's bucket ends up with. Returns
/// `None` when no depth up to `limit` is enough.
pub fn required_depth<I>(group: I, key: i64, from: u32, capacity: usize, limit: u32) -> Option<u32>
where
    I: IntoIterator<Item = i64>,
{
    let group: Vec<i64> = group.into_iter().collect();
    ((from + 1)..=limit).find(|&depth| {
        let target: usize = address_bits(key, depth);
        group
            .iter()
            .filter(|&&other| address_bits(other, depth) == target)
            .count()
            <= capacity
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_is_a_single_slot() {
        for key in [0, 1, -1, 12345, i64::MAX, i64::MIN] {
            assert_eq!(address_bits(key, 0), 0);
        }
    }

    #[test]
    fn low_order_bits_of_the_magnitude() {
        assert_eq!(address_bits(13, 1), 1);
        assert_eq!(address_bits(13, 2), 1);
        assert_eq!(address_bits(13, 3), 5);
        assert_eq!(address_bits(13, 4), 13);
        assert_eq!(address_bits(-13, 3), 5);
        assert_eq!(address_bits(8, 3), 0);
        assert_eq!(address_bits(i64::MIN, 63), 0);
        assert_eq!(address_bits(i64::MIN, 64), 1 << 63);
        assert_eq!(address_bits(-1, 64), 1);
    }

    #[test]
    fn addressing_is_deterministic() {
        for key in [-77, 0, 5, 1 << 40] {
            for depth in 0..20 {
                assert_eq!(address_bits(key, depth), address_bits(key, depth));
            }
        }
    }

    #[test]
    fn split_bit_matches_address_bits() {
        // A slot moves to the sibling exactly when a key addressed to it has
        // bit `depth - 1` set.
        for depth in 1..8u32 {
            for key in 0..256i64 {
                let index: usize = address_bits(key, 8);
                assert_eq!(split_bit(index, depth), (key >> (depth - 1)) & 1 == 1);
            }
        }
    }

    #[test]
    fn required_depth_stops_at_the_first_fitting_depth() {
        // 4, 8 and 12 all end in 00; 8 is the only one ending in 000.
        assert_eq!(required_depth([4, 8, 12], 12, 0, 2, 20), Some(3));
        assert_eq!(required_depth([1, 2, 3], 3, 0, 2, 20), Some(1));
        assert_eq!(required_depth([4, 8, 12], 12, 0, 2, 2), None);
    }

    #[test]
    fn required_depth_gives_up_on_equal_magnitudes() {
        assert_eq!(required_depth([5, -5], -5, 0, 1, 32), None);
        assert_eq!(required_depth([5, -5], -5, 0, 2, 32), Some(1));
    }
}
