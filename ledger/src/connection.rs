// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{BlockHeight, BlockId, ChallengeAction, ChallengeEvent, Error};
use async_trait::async_trait;
use ethereum_types::H256;
use futures::stream::BoxStream;

/// Items produced by a ledger subscription, already filtered to the judge
/// contract and delivered in ledger order.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerNotification {
    /// A new canonical head was observed. `parent_hash` lets the consumer
    /// detect that the chain it followed was reorged away.
    Head { block: BlockId, parent_hash: H256 },
    /// A challenge event reached the chain.
    Event(ChallengeEvent),
}

/// Boxed subscription stream. Errors are items so that a consumer can select
/// over ⟨event, error, cancellation⟩ and nothing else.
pub type NotificationStream = BoxStream<'static, Result<LedgerNotification, Error>>;

/// Receipt for a mined action submission.
#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub block: BlockId,
    pub tx_hash: H256,
}

/// The ledger adapter surface the dispute core consumes. Implementations
/// broadcast transactions, watch logs and answer header queries; each call
/// carries the implementation's configured RPC timeout and surfaces expiry
/// as [`Error::Timeout`].
#[async_trait]
pub trait LedgerConnection: Send + Sync + 'static {
    /// Submits an action to the judge and waits until it is mined.
    async fn submit(
        &self,
        challenge_id: H256,
        action: ChallengeAction,
    ) -> Result<TxReceipt, Error>;

    /// Opens a notification stream for one challenge starting at
    /// `from_height`. Already-final events at or after that height are
    /// replayed before live ones.
    async fn subscribe(
        &self,
        challenge_id: H256,
        from_height: BlockHeight,
    ) -> Result<NotificationStream, Error>;

    /// Canonical block id at `height`, or `None` past the head. This is the
    /// arbiter for both reorg fork points and checkpoint restores.
    async fn block_id_for_height(&self, height: BlockHeight)
        -> Result<Option<BlockId>, Error>;
}
