// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChallengeGame, ChallengeState, DisputeOps, Role};
use alder_encoding::Cbor;
use alder_ledger::LogPosition;
use ethereum_types::H256;
use serde::{Deserialize, Serialize};

use crate::ChallengeError;

/// Everything needed to resume a challenge without replaying the game from
/// its first event: the checkpoint blob the engine hands to the store after
/// every processed event. Opaque to the store; round-trips through CBOR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeCheckpoint {
    pub challenge_id: H256,
    pub local_role: Role,
    pub state: ChallengeState,
    /// Position of the last event folded into `state`, so replay can skip
    /// everything at or before it.
    pub last_event: Option<LogPosition>,
}

impl Cbor for ChallengeCheckpoint {}

impl ChallengeCheckpoint {
    pub fn capture(game: &ChallengeGame, last_event: Option<LogPosition>) -> Self {
        Self {
            challenge_id: game.challenge_id(),
            local_role: game.local_role(),
            state: game.state().clone(),
            last_event,
        }
    }

    /// Reattaches dispute computation to a checkpointed state.
    pub fn into_game(self, ops: Box<dyn DisputeOps>) -> Result<ChallengeGame, ChallengeError> {
        ChallengeGame::restore(self.challenge_id, self.local_role, self.state, ops)
    }
}
