// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use alder_challenge::ChallengeError;
use thiserror::Error;

/// Reactor error
#[derive(Debug, Error)]
pub enum ReactorError {
    /// Error originating from the challenge game engine
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    /// Error originating from the ledger adapter
    #[error(transparent)]
    Ledger(#[from] alder_ledger::Error),
    /// Error originating from checkpoint storage
    #[error(transparent)]
    Checkpoint(#[from] alder_checkpoint::Error),
    /// Error originating from encoding checkpoint blobs
    #[error(transparent)]
    Encoding(#[from] alder_encoding::Error),
    /// The chain rewound past everything the checkpointer can restore.
    #[error("Reorg rewound past recoverable state: {0}")]
    Reorged(String),
    /// The channel between the reactor and the driver closed.
    #[error("Reactor item queue closed")]
    QueueClosed,
    /// Caller-initiated shutdown.
    #[error("Reactor cancelled")]
    Cancelled,
}
