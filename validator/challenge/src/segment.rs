// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval `[start, start + length)` of gas offsets under
/// dispute. For inbox-delta challenges the unit is messages instead of gas;
/// the arithmetic is identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSegment {
    pub start: BigUint,
    pub length: BigUint,
}

impl ChallengeSegment {
    pub fn new(start: BigUint, length: BigUint) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> BigUint {
        &self.start + &self.length
    }

    /// A one-step segment cannot be bisected further.
    pub fn is_one_step(&self) -> bool {
        self.length <= BigUint::one()
    }

    /// How many sub-segments a bisection of this segment uses: the
    /// protocol's target, or the full length when the segment is shorter
    /// (one step per sub-segment at the base).
    pub fn sub_segment_count(&self, target: u64) -> u64 {
        if self.length < BigUint::from(target) {
            // The length fits in u64 because it is below the target.
            self.length.to_u64().expect("length below target")
        } else {
            target
        }
    }

    /// The `index`-th of `count` sub-segments. Each sub-segment receives
    /// `⌊length / count⌋` steps and the first `length mod count` receive one
    /// extra, so the split is deterministic and lengths sum to the parent's.
    pub fn sub_segment(&self, count: u64, index: u64) -> ChallengeSegment {
        debug_assert!(index < count);
        let count = BigUint::from(count);
        let index = BigUint::from(index);
        let each = &self.length / &count;
        let remainder = &self.length % &count;
        let extra = index.clone().min(remainder.clone());
        let start = &self.start + &each * &index + extra;
        let length = if index < remainder {
            each + BigUint::one()
        } else {
            each
        };
        ChallengeSegment { start, length }
    }

    /// All `count + 1` cut boundaries of a bisection into `count` pieces,
    /// starting with `start` and ending with `end()`.
    pub fn cut_offsets(&self, count: u64) -> Vec<BigUint> {
        let mut offsets = Vec::with_capacity(count as usize + 1);
        offsets.push(self.start.clone());
        for index in 0..count {
            offsets.push(self.sub_segment(count, index).end());
        }
        offsets
    }
}

impl fmt::Display for ChallengeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn segment(start: u64, length: u64) -> ChallengeSegment {
        ChallengeSegment::new(BigUint::from(start), BigUint::from(length))
    }

    #[test]
    fn even_split_matches_the_expected_boundaries() {
        let parent = segment(0, 10_000_000);
        let sub = parent.sub_segment(400, 7);
        assert_eq!(sub, segment(175_000, 25_000));

        let offsets = parent.cut_offsets(400);
        assert_eq!(offsets.len(), 401);
        assert_eq!(offsets[7], BigUint::from(175_000u64));
        assert_eq!(offsets[8], BigUint::from(200_000u64));
        assert_eq!(offsets[400], BigUint::from(10_000_000u64));
    }

    #[test]
    fn uneven_split_gives_the_first_segments_one_extra_step() {
        // 10 steps into 4 segments: 3, 3, 2, 2.
        let parent = segment(100, 10);
        let lengths: Vec<u64> = (0..4)
            .map(|i| parent.sub_segment(4, i).length.to_u64().unwrap())
            .collect();
        assert_eq!(lengths, vec![3, 3, 2, 2]);
        assert_eq!(parent.sub_segment(4, 0).start, BigUint::from(100u64));
        assert_eq!(parent.sub_segment(4, 2).start, BigUint::from(106u64));
    }

    #[test]
    fn short_segments_fall_back_to_single_step_pieces() {
        let parent = segment(0, 62);
        assert_eq!(parent.sub_segment_count(400), 62);
        assert!(parent.sub_segment(62, 0).is_one_step());
    }

    #[quickcheck]
    fn split_lengths_always_sum_to_the_parent(start: u32, length: u32, count: u16) -> bool {
        let count = u64::from(count.max(1));
        let parent = segment(u64::from(start), u64::from(length).max(count));
        let total: BigUint = (0..count)
            .map(|i| parent.sub_segment(count, i).length)
            .sum();
        total == parent.length
    }

    #[quickcheck]
    fn sub_segments_tile_the_parent(length: u32, count: u16) -> bool {
        let count = u64::from(count.max(1));
        let parent = segment(7, u64::from(length).max(count));
        let mut cursor = parent.start.clone();
        for i in 0..count {
            let sub = parent.sub_segment(count, i);
            if sub.start != cursor {
                return false;
            }
            cursor = sub.end();
        }
        cursor == parent.end()
    }
}
