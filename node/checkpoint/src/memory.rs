// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{CheckpointStore, Error};
use alder_ledger::{BlockHeight, BlockId};
use ethereum_types::H256;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A thread-safe in-memory checkpoint store, ordered by height so that
/// pruning and restore scans are range operations.
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpointStore {
    db: Arc<RwLock<BTreeMap<BlockHeight, HashMap<H256, Vec<u8>>>>>,
}

impl CheckpointStore for MemoryCheckpointStore {
    fn put(&self, block: &BlockId, blob: Vec<u8>) -> Result<(), Error> {
        self.db
            .write()
            .entry(block.height)
            .or_default()
            .insert(block.hash, blob);
        Ok(())
    }

    fn get(&self, block: &BlockId) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .db
            .read()
            .get(&block.height)
            .and_then(|entries| entries.get(&block.hash))
            .cloned())
    }

    fn min_height(&self) -> Result<Option<BlockHeight>, Error> {
        Ok(self.db.read().keys().next().copied())
    }

    fn max_height(&self) -> Result<Option<BlockHeight>, Error> {
        Ok(self.db.read().keys().next_back().copied())
    }

    fn blocks_at_height(&self, height: BlockHeight) -> Result<Vec<BlockId>, Error> {
        Ok(self
            .db
            .read()
            .get(&height)
            .map(|entries| {
                entries
                    .keys()
                    .map(|hash| BlockId::new(height, *hash))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn prune_below(&self, height: BlockHeight) -> Result<(), Error> {
        let mut db = self.db.write();
        *db = db.split_off(&height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: BlockHeight, tag: u8) -> BlockId {
        BlockId::new(height, H256::repeat_byte(tag))
    }

    #[test]
    fn starts_empty() {
        let store = MemoryCheckpointStore::default();
        assert!(!store.has_checkpoint().unwrap());
        assert_eq!(store.get(&block(10, 20)).unwrap(), None);
    }

    #[test]
    fn write_and_read_back() {
        let store = MemoryCheckpointStore::default();
        store.put(&block(10, 20), vec![5, 3, 2]).unwrap();

        assert_eq!(store.get(&block(10, 20)).unwrap(), Some(vec![5, 3, 2]));
        // Same height, different header hash: a distinct checkpoint.
        assert_eq!(store.get(&block(10, 30)).unwrap(), None);
        store.put(&block(10, 30), vec![5, 3, 4]).unwrap();
        assert_eq!(store.get(&block(10, 30)).unwrap(), Some(vec![5, 3, 4]));
        assert_eq!(store.blocks_at_height(10).unwrap().len(), 2);
    }

    #[test]
    fn prune_drops_only_older_heights() {
        let store = MemoryCheckpointStore::default();
        store.put(&block(10, 20), vec![1]).unwrap();
        store.put(&block(15, 21), vec![2]).unwrap();
        store.put(&block(200, 41), vec![3]).unwrap();

        store.prune_below(15).unwrap();

        assert_eq!(store.get(&block(10, 20)).unwrap(), None);
        assert_eq!(store.get(&block(15, 21)).unwrap(), Some(vec![2]));
        assert_eq!(store.min_height().unwrap(), Some(15));
        assert_eq!(store.max_height().unwrap(), Some(200));
    }
}
