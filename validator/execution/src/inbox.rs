// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use alder_encoding::keccak_256;
use ethereum_types::H256;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// One delivered inbox message, opaque to the dispute core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub data: Vec<u8>,
}

impl InboxMessage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn hash(&self) -> H256 {
        keccak_256(&self.data)
    }
}

/// Read access to the ordered inbox and its running accumulator. The inbox
/// is append-only, so answers for settled indices never change.
pub trait InboxLookup: Send + Sync {
    /// Accumulator over the first `count` messages; the zero word at zero.
    fn inbox_acc(&self, count: &BigUint) -> Result<H256, Error>;

    /// The message at `index` (zero-based).
    fn message(&self, index: &BigUint) -> Result<InboxMessage, Error>;

    /// Messages currently known to the lookup.
    fn message_count(&self) -> BigUint;
}

/// Extends an inbox accumulator by one message, the chaining step shared by
/// the inbox and the per-challenge delta accumulators.
pub fn extend_inbox_acc(acc: H256, message: &InboxMessage) -> H256 {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(acc.as_bytes());
    buf.extend_from_slice(message.hash().as_bytes());
    keccak_256(&buf)
}
