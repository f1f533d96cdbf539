// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChallengeError, ChallengeSegment};
use alder_encoding::{keccak_words, word_from_biguint, word_from_u64};
use ethereum_types::H256;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// A segment together with the ordered cut hashes claimed at its
/// boundaries: the agreed start, `N - 1` interior cuts, and the claimed end.
/// `cut_hashes.len()` is always the sub-segment count plus one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bisection {
    pub segment: ChallengeSegment,
    pub cut_hashes: Vec<H256>,
}

impl Bisection {
    /// The degenerate two-cut bisection a challenge starts from: the whole
    /// asserted segment between the agreed pre-state and the claimed
    /// post-state.
    pub fn initial(segment: ChallengeSegment, start: H256, end: H256) -> Self {
        Self {
            segment,
            cut_hashes: vec![start, end],
        }
    }

    /// Validates a counterparty's bisection claim against the game's
    /// invariants before it becomes the current round.
    pub fn from_claim(
        segment: ChallengeSegment,
        cut_hashes: Vec<H256>,
        total_length: &BigUint,
        expected_start: &H256,
        expected_end: &H256,
        expected_count: u64,
    ) -> Result<Self, ChallengeError> {
        if *total_length != segment.length {
            return Err(ChallengeError::ProtocolViolation(format!(
                "bisected length {} does not match the disputed segment {}",
                total_length, segment,
            )));
        }
        if cut_hashes.len() as u64 != expected_count + 1 {
            return Err(ChallengeError::ProtocolViolation(format!(
                "bisection carries {} cuts, expected {}",
                cut_hashes.len(),
                expected_count + 1,
            )));
        }
        if cut_hashes[0] != *expected_start {
            return Err(ChallengeError::ProtocolViolation(
                "bisection start cut does not match the agreed cut".into(),
            ));
        }
        if cut_hashes[cut_hashes.len() - 1] != *expected_end {
            return Err(ChallengeError::ProtocolViolation(
                "bisection end cut does not match the claimed end".into(),
            ));
        }
        Ok(Self {
            segment,
            cut_hashes,
        })
    }

    pub fn sub_segment_count(&self) -> u64 {
        self.cut_hashes.len() as u64 - 1
    }

    /// The sub-segment whose end boundary is `cut_hashes[index + 1]`.
    pub fn sub_segment(&self, index: u64) -> Result<ChallengeSegment, ChallengeError> {
        let count = self.sub_segment_count();
        if index >= count {
            return Err(ChallengeError::ProtocolViolation(format!(
                "segment index {} out of {} sub-segments",
                index, count,
            )));
        }
        Ok(self.segment.sub_segment(count, index))
    }

    /// The commitment the judge stores for this round, referenced by the
    /// next action as `prev_bisection_root`.
    pub fn root(&self) -> H256 {
        let mut words = Vec::with_capacity(self.cut_hashes.len() + 3);
        // Counters are split products of a 256-bit length, so they fit.
        words.push(word_from_biguint(&self.segment.start).expect("segment start fits a word"));
        words.push(word_from_biguint(&self.segment.length).expect("segment length fits a word"));
        words.push(word_from_u64(self.sub_segment_count()));
        words.extend_from_slice(&self.cut_hashes);
        keccak_words(&words)
    }
}
