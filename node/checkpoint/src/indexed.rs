// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{CheckpointStore, Error};
use alder_ledger::{BlockHeight, BlockId};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Canonical-chain query the checkpointer needs to pick the right blob at
/// restart: which header hash won at a given height.
#[async_trait]
pub trait BlockIdLookup: Send + Sync {
    async fn block_id_for_height(&self, height: BlockHeight)
        -> Result<Option<BlockId>, Error>;
}

/// Height-indexed checkpointing over an arbitrary [`CheckpointStore`].
/// Writes are serialized by the owning challenge task; pruning trails the
/// latest confirmed height by a retention window so that a rewind always
/// finds a canonical blob.
pub struct IndexedCheckpointer<S> {
    store: Arc<S>,
    retention: u64,
}

impl<S: CheckpointStore> IndexedCheckpointer<S> {
    pub fn new(store: Arc<S>, retention: u64) -> Self {
        Self { store, retention }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Records the blob produced by processing `block`.
    pub fn write(&self, block: &BlockId, blob: Vec<u8>) -> Result<(), Error> {
        self.store.put(block, blob)
    }

    /// Reads the blob recorded at exactly `block`.
    pub fn read(&self, block: &BlockId) -> Result<Option<Vec<u8>>, Error> {
        self.store.get(block)
    }

    /// Drops checkpoints that fell behind the retention window measured from
    /// `confirmed`, the newest height known to be final.
    pub fn confirm(&self, confirmed: BlockHeight) -> Result<(), Error> {
        let cutoff = confirmed.saturating_sub(self.retention);
        if let Some(min) = self.store.min_height()? {
            if min < cutoff {
                debug!("Pruning checkpoints below height {}", cutoff);
                self.store.prune_below(cutoff)?;
            }
        }
        Ok(())
    }

    /// Finds the newest checkpoint whose block is still on the canonical
    /// chain, scanning heights from the top down. Blobs recorded under
    /// reorged-away header hashes are skipped.
    pub async fn restore_latest<L: BlockIdLookup>(
        &self,
        lookup: &L,
    ) -> Result<Option<(BlockId, Vec<u8>)>, Error> {
        self.restore_at_or_below(lookup, BlockHeight::MAX).await
    }

    /// Same as [`IndexedCheckpointer::restore_latest`] bounded from above,
    /// used when rewinding past a known fork point.
    pub async fn restore_at_or_below<L: BlockIdLookup>(
        &self,
        lookup: &L,
        bound: BlockHeight,
    ) -> Result<Option<(BlockId, Vec<u8>)>, Error> {
        let min = match self.store.min_height()? {
            Some(min) => min,
            None => return Ok(None),
        };
        let mut height = match self.store.max_height()? {
            Some(max) => max.min(bound),
            None => return Ok(None),
        };
        if height < min {
            return Ok(None);
        }

        loop {
            let candidates = self.store.blocks_at_height(height)?;
            if !candidates.is_empty() {
                if let Some(canonical) = lookup.block_id_for_height(height).await? {
                    if let Some(block) = candidates.iter().find(|b| b.hash == canonical.hash) {
                        let blob = self
                            .store
                            .get(block)?
                            .ok_or_else(|| Error::Other("indexed blob disappeared".into()))?;
                        return Ok(Some((*block, blob)));
                    }
                }
            }
            if height == min {
                return Ok(None);
            }
            height -= 1;
        }
    }
}
