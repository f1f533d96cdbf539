// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{metrics, ReactorError};
use alder_ledger::{
    BlockId, CancelToken, ChallengeEvent, LedgerConnection, LedgerNotification,
};
use async_std::channel::{Sender, TrySendError};
use ethereum_types::H256;
use futures::future::FutureExt;
use futures::stream::StreamExt;
use futures::{pin_mut, select};
use log::{debug, info, warn};
use lru::LruCache;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Struct that defines event reactor configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct ReactorConfig {
    /// Capacity of the bounded queue between the subscription and the engine
    pub queue_capacity: usize,
    /// Entries kept in the `(block_hash, log_index)` deduplication cache
    pub dedup_cache_size: usize,
    /// Recent canonical headers retained for reorg detection
    pub header_history: usize,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            dedup_cache_size: 1_024,
            header_history: 128,
        }
    }
}

/// Items the reactor hands to a challenge driver, in strict ledger order.
#[derive(Debug, Clone, PartialEq)]
pub enum ReactorItem {
    /// A deduplicated judge event.
    Event(ChallengeEvent),
    /// A new canonical head; drives deadline checks and pruning.
    Head(BlockId),
    /// The chain reorganized. The driver must restore the newest checkpoint
    /// at or below this block; the canonical events replay afterwards.
    Rewind(BlockId),
}

enum Delivery {
    /// Keep consuming the current subscription.
    Continue,
    /// Tear the subscription down and resubscribe from `last_height`.
    Resubscribe,
}

/// Normalizes one challenge's ledger subscription into an ordered,
/// deduplicated item stream for the driver.
///
/// The reactor is the only component that touches the raw subscription. It
/// guarantees at-least-once delivery of every finalized event, detects
/// reorgs by following parent hashes, and applies backpressure through the
/// bounded queue: when the queue overflows, the subscription is torn down
/// and the canonical events replay once the driver catches up.
pub struct EventReactor<C> {
    connection: Arc<C>,
    challenge_id: H256,
    config: ReactorConfig,
    sender: Sender<ReactorItem>,
    cancel: CancelToken,
    seen: LruCache<(H256, u64), ()>,
    /// Recent canonical headers, oldest first, with their parent hashes.
    headers: VecDeque<(BlockId, H256)>,
    /// Height subscriptions (re)start from.
    from_height: u64,
}

impl<C: LedgerConnection> EventReactor<C> {
    pub fn new(
        connection: Arc<C>,
        challenge_id: H256,
        from_height: u64,
        sender: Sender<ReactorItem>,
        cancel: CancelToken,
        config: ReactorConfig,
    ) -> Self {
        let seen = LruCache::new(config.dedup_cache_size);
        Self {
            connection,
            challenge_id,
            config,
            sender,
            cancel,
            seen,
            headers: VecDeque::new(),
            from_height,
        }
    }

    /// Runs until cancelled or the driver hangs up. Errors out of the
    /// subscription are retried by resubscribing; everything else surfaces.
    pub async fn run(mut self) -> Result<(), ReactorError> {
        loop {
            let mut stream = self
                .connection
                .subscribe(self.challenge_id, self.from_height)
                .await?;
            debug!(
                "Subscribed to challenge {:#x} from height {}",
                self.challenge_id, self.from_height,
            );

            let resubscribe = loop {
                let notification = {
                    let next = stream.next().fuse();
                    let cancelled = self.cancel.cancelled().fuse();
                    pin_mut!(next, cancelled);
                    select! {
                        item = next => item,
                        _ = cancelled => return Err(ReactorError::Cancelled),
                    }
                };
                match notification {
                    Some(Ok(notification)) => match self.handle(notification).await? {
                        Delivery::Continue => {}
                        Delivery::Resubscribe => break true,
                    },
                    Some(Err(why)) if why.is_transient() => {
                        warn!("Subscription produced a transient error: {}", why);
                        break true;
                    }
                    Some(Err(why)) => return Err(why.into()),
                    None => {
                        warn!("Subscription stream ended; resubscribing");
                        break true;
                    }
                }
            };
            if resubscribe {
                metrics::RESUBSCRIBE_TOTAL.inc();
            }
        }
    }

    async fn handle(
        &mut self,
        notification: LedgerNotification,
    ) -> Result<Delivery, ReactorError> {
        match notification {
            LedgerNotification::Head { block, parent_hash } => {
                self.handle_head(block, parent_hash).await
            }
            LedgerNotification::Event(event) => self.handle_event(event).await,
        }
    }

    async fn handle_event(&mut self, event: ChallengeEvent) -> Result<Delivery, ReactorError> {
        let position = event.position();
        let key = (position.block_hash, position.log_index);
        if self.seen.contains(&key) {
            metrics::DUPLICATE_EVENTS_TOTAL.inc();
            debug!(
                "Dropping redelivered event at {:#x}[{}]",
                position.block_hash, position.log_index,
            );
            return Ok(Delivery::Continue);
        }
        self.seen.put(key, ());
        self.from_height = self.from_height.max(event.block_id.height);
        metrics::EVENTS_DELIVERED_TOTAL.inc();
        self.send(ReactorItem::Event(event)).await
    }

    async fn handle_head(
        &mut self,
        block: BlockId,
        parent_hash: H256,
    ) -> Result<Delivery, ReactorError> {
        // A head we already recorded: identical is a duplicate, different
        // means the chain we followed was reorged away.
        if let Some((recorded, _)) = self
            .headers
            .iter()
            .find(|(recorded, _)| recorded.height == block.height)
        {
            if recorded.hash == block.hash {
                return Ok(Delivery::Continue);
            }
            return self.rewind().await;
        }
        // A head extending past our tip must link to it. Heads at or below
        // the tip that fell out of the history window are replays.
        if let Some((tip, _)) = self.headers.back() {
            if block.height <= tip.height {
                return Ok(Delivery::Continue);
            }
            if block.height == tip.height + 1 && parent_hash != tip.hash {
                return self.rewind().await;
            }
        }
        self.headers.push_back((block, parent_hash));
        while self.headers.len() > self.config.header_history {
            self.headers.pop_front();
        }
        self.send(ReactorItem::Head(block)).await
    }

    /// Walks the recorded headers newest-first for the last block still on
    /// the canonical chain, then rewinds the driver there and resubscribes
    /// so the canonical suffix replays.
    async fn rewind(&mut self) -> Result<Delivery, ReactorError> {
        let mut fork_point = None;
        for (recorded, _) in self.headers.iter().rev() {
            if let Some(canonical) = self
                .connection
                .block_id_for_height(recorded.height)
                .await?
            {
                if canonical.hash == recorded.hash {
                    fork_point = Some(*recorded);
                    break;
                }
            }
        }
        let fork_point = fork_point.ok_or_else(|| {
            ReactorError::Reorged(format!(
                "no recorded header within the last {} is canonical",
                self.headers.len(),
            ))
        })?;

        info!(
            "Chain reorganized; rewinding challenge {:#x} to {}",
            self.challenge_id, fork_point,
        );
        metrics::REORG_TOTAL.inc();
        self.seen.clear();
        self.headers.clear();
        self.from_height = fork_point.height;
        self.send(ReactorItem::Rewind(fork_point)).await?;
        Ok(Delivery::Resubscribe)
    }

    /// Queues one item for the driver. On overflow the subscription is torn
    /// down while the blocking send applies backpressure; the dedup cache
    /// swallows the duplicates the subsequent replay produces.
    async fn send(&mut self, item: ReactorItem) -> Result<Delivery, ReactorError> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(Delivery::Continue),
            Err(TrySendError::Closed(_)) => Err(ReactorError::QueueClosed),
            Err(TrySendError::Full(item)) => {
                warn!("Reactor queue full; tearing down the subscription");
                metrics::QUEUE_OVERFLOW_TOTAL.inc();
                let send = self.sender.send(item).fuse();
                let cancelled = self.cancel.cancelled().fuse();
                pin_mut!(send, cancelled);
                select! {
                    sent = send => {
                        sent.map_err(|_| ReactorError::QueueClosed)?;
                    }
                    _ = cancelled => return Err(ReactorError::Cancelled),
                }
                Ok(Delivery::Resubscribe)
            }
        }
    }
}
