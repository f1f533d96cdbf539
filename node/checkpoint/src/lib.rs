// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod indexed;
mod memory;

pub use errors::Error;
pub use indexed::{BlockIdLookup, IndexedCheckpointer};
pub use memory::MemoryCheckpointStore;

use alder_ledger::{BlockHeight, BlockId};

/// Store interface for opaque checkpoint blobs, keyed by the block whose
/// processing produced them. Several header hashes may hold blobs at one
/// height while a reorg is unsettled.
pub trait CheckpointStore: Send + Sync {
    /// Write the blob recorded at `block`, replacing any previous blob for
    /// the same block id.
    fn put(&self, block: &BlockId, blob: Vec<u8>) -> Result<(), Error>;

    /// Read the blob recorded at `block` and return `None` if there is none.
    fn get(&self, block: &BlockId) -> Result<Option<Vec<u8>>, Error>;

    /// Lowest height holding any checkpoint, or `None` when empty.
    fn min_height(&self) -> Result<Option<BlockHeight>, Error>;

    /// Highest height holding any checkpoint, or `None` when empty.
    fn max_height(&self) -> Result<Option<BlockHeight>, Error>;

    /// All block ids holding a checkpoint at `height`.
    fn blocks_at_height(&self, height: BlockHeight) -> Result<Vec<BlockId>, Error>;

    /// Deletes every checkpoint strictly below `height`.
    fn prune_below(&self, height: BlockHeight) -> Result<(), Error>;

    /// Returns `Ok(true)` if the store holds at least one checkpoint.
    fn has_checkpoint(&self) -> Result<bool, Error> {
        Ok(self.max_height()?.is_some())
    }
}
