// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_bigint::BigUint;
use thiserror::Error;

/// Execution replay error
#[derive(Debug, Error)]
pub enum Error {
    /// Offsets queried on one tracker must strictly increase.
    #[error("Execution offsets must be strictly increasing: {prev} then {next}")]
    NonMonotonicOffset { prev: BigUint, next: BigUint },
    /// A machine snapshot was requested at an offset that was never a target.
    #[error("No machine snapshot cached at gas offset {0}")]
    SnapshotMissing(BigUint),
    /// The machine could not serialize itself for a one-step proof.
    #[error("Machine could not be marshalled for proof: {0}")]
    Proof(String),
    /// An inbox message index past the known inbox was requested.
    #[error("Inbox message index {0} is out of range")]
    InboxIndex(BigUint),
    /// An inbox accumulator was requested past the known inbox.
    #[error("Inbox accumulator at message count {0} is unavailable")]
    InboxAccumulator(BigUint),
}
