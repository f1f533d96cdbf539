// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;
use thiserror::Error;

/// Ledger adapter error
#[derive(Debug, Error)]
pub enum Error {
    /// A transient RPC failure; retried with backoff before propagating.
    #[error("Transient ledger failure: {0}")]
    Transient(String),
    /// An RPC call exceeded its caller-configured timeout.
    #[error("Ledger RPC timed out after {0:?}")]
    Timeout(Duration),
    /// The judge rejected the submitted transaction.
    #[error("Transaction reverted: {0}")]
    Reverted(String),
    /// The event subscription ended; the caller is expected to resubscribe.
    #[error("Event subscription closed")]
    SubscriptionClosed,
    /// Error originating from encoding calldata
    #[error(transparent)]
    Encoding(#[from] alder_encoding::Error),
    /// Caller-initiated shutdown. Never retried.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true for failures that are worth retrying locally.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Timeout(_))
    }
}
