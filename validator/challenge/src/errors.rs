// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Challenge error
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// An event is inconsistent with the game's invariants (mismatched
    /// parent cut, wrong length, malformed bisection). Fatal for the
    /// challenge; the judge and the local replay disagree structurally.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    /// The segment handed to the local party starts at an unreachable
    /// offset. A caller bug, not a protocol fault.
    #[error("First cut of the segment is unreachable")]
    FirstCutUnreachable,
    /// The challenger role was invoked but every cut agrees with the local
    /// computation. The caller misidentified its role.
    #[error("No divergence found in the posted cuts")]
    NoDivergence,
    /// Error originating from the ledger adapter
    #[error(transparent)]
    Ledger(#[from] alder_ledger::Error),
    /// Error originating from machine replay
    #[error(transparent)]
    Execution(#[from] alder_execution::Error),
    /// Error originating from checkpoint storage
    #[error(transparent)]
    Checkpoint(#[from] alder_checkpoint::Error),
    /// Error originating from encoding
    #[error(transparent)]
    Encoding(#[from] alder_encoding::Error),
    /// The event stream rewound past the current state; the caller rewinds
    /// to the last canonical checkpoint and replays.
    #[error("Challenge state reorged past the last checkpoint")]
    Reorged,
    /// Caller-initiated shutdown, propagated without retry.
    #[error("Challenge task cancelled")]
    Cancelled,
}
