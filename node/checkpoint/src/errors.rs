// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Checkpoint store error
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the backing key-value store
    #[error("Checkpoint backend error: {0}")]
    Backend(String),
    /// The canonical-chain lookup needed for a restore failed
    #[error("Canonical chain lookup failed: {0}")]
    ChainLookup(String),
    /// Any other error that does not need to be specifically handled
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(e: String) -> Error {
        Error::Other(e)
    }
}
