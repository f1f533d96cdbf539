// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Encoding error
#[derive(Debug, Error)]
pub enum Error {
    /// Value is too large to be packed into a 256-bit word
    #[error("Value does not fit into a 256-bit word")]
    WordOverflow,
    /// Error originating from CBOR (de)serialization
    #[error("CBOR encoding error: {0}")]
    Cbor(String),
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Error {
        Error::Cbor(e.to_string())
    }
}
