// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use ethereum_types::H256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger block number. The only authoritative clock in the protocol;
/// deadlines compare block heights, never wall times.
pub type BlockHeight = u64;

/// Identifies one block of the ledger. Height alone is ambiguous while a
/// reorg is unsettled, so the header hash is carried alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub height: BlockHeight,
    pub hash: H256,
}

impl BlockId {
    pub fn new(height: BlockHeight, hash: H256) -> Self {
        Self { height, hash }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} ({:#x})", self.height, self.hash)
    }
}

/// Position of a log inside the ledger, used to deduplicate redelivered
/// events. Two deliveries with equal positions are the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogPosition {
    pub block_hash: H256,
    pub log_index: u64,
}
