// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{BlockHeight, BlockId, LogPosition};
use ethereum_types::{Address, H256};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Which flavor of dispute a challenge resolves. The kind selects the cut
/// variant both parties compute and the base-case proof the judge accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// Dispute over machine execution between two gas offsets.
    Execution,
    /// Dispute over the inbox accumulator between two message counts.
    InboxDelta,
}

/// A judge event normalized from a raw ledger log. Raw field names and
/// topics belong to the concrete adapter; the core consumes only this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeEvent {
    pub challenge_id: H256,
    /// Block the log was included in, used for strict ledger ordering.
    pub block_id: BlockId,
    pub log_index: u64,
    /// Address that signed the transaction producing this event.
    pub poster: Address,
    pub kind: ChallengeEventKind,
}

impl ChallengeEvent {
    /// Deduplication key for at-least-once delivery.
    pub fn position(&self) -> LogPosition {
        LogPosition {
            block_hash: self.block_id.hash,
            log_index: self.log_index,
        }
    }

    /// The response deadline this event started, if it started one.
    pub fn deadline(&self) -> Option<BlockHeight> {
        match &self.kind {
            ChallengeEventKind::Initiated { deadline, .. }
            | ChallengeEventKind::Bisected { deadline, .. }
            | ChallengeEventKind::ContinuedChallenge { deadline, .. } => Some(*deadline),
            ChallengeEventKind::OneStepProofCompleted
            | ChallengeEventKind::ContinuedExecutionProved
            | ChallengeEventKind::TimedOut { .. } => None,
        }
    }
}

/// Semantic payload of a judge event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChallengeEventKind {
    /// The judge opened a dispute between two staked parties.
    Initiated {
        kind: ChallengeKind,
        asserter: Address,
        challenger: Address,
        segment_start: BigUint,
        segment_length: BigUint,
        /// Cut hashes at the initial segment boundaries: the agreed start
        /// and the asserter's claimed end.
        cut_hashes: Vec<H256>,
        deadline: BlockHeight,
    },
    /// The asserter split the disputed segment and committed to interior cuts.
    Bisected {
        cut_hashes: Vec<H256>,
        total_length: BigUint,
        deadline: BlockHeight,
    },
    /// The challenger picked the first sub-segment it disagrees with.
    ContinuedChallenge {
        segment_index: u64,
        deadline: BlockHeight,
    },
    /// The judge verified a single-step proof; the asserter wins.
    OneStepProofCompleted,
    /// The judge verified that execution continues past a claimed
    /// unreachable boundary; the challenger wins.
    ContinuedExecutionProved,
    /// A party missed its deadline and the opponent collected the win.
    TimedOut { losing_party: Address },
}
