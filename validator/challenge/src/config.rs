// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::Deserialize;

/// Struct that defines dispute protocol tuning options. The segment targets
/// are protocol conventions both parties must share, not correctness
/// invariants; the defaults match the judge's deployed configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ChallengeConfig {
    /// Sub-segments per bisection round in execution challenges.
    pub execution_segment_target: u64,
    /// Sub-segments per bisection round in inbox-delta challenges.
    pub inbox_delta_segment_target: u64,
    /// How many blocks behind the confirmed head checkpoints are retained.
    pub checkpoint_retention: u64,
}

impl ChallengeConfig {
    pub fn new(
        execution_segment_target: u64,
        inbox_delta_segment_target: u64,
        checkpoint_retention: u64,
    ) -> Self {
        Self {
            execution_segment_target,
            inbox_delta_segment_target,
            checkpoint_retention,
        }
    }

    /// The target for `kind`.
    pub fn segment_target(&self, kind: alder_ledger::ChallengeKind) -> u64 {
        match kind {
            alder_ledger::ChallengeKind::Execution => self.execution_segment_target,
            alder_ledger::ChallengeKind::InboxDelta => self.inbox_delta_segment_target,
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            execution_segment_target: 400,
            inbox_delta_segment_target: 250,
            checkpoint_retention: 1_000,
        }
    }
}
