// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{EventReactor, ReactorConfig, ReactorError, ReactorItem};
use alder_challenge::{
    ChallengeCheckpoint, ChallengeConfig, ChallengeGame, DisputeOps, Role, Winner,
};
use alder_checkpoint::{BlockIdLookup, CheckpointStore, IndexedCheckpointer};
use alder_encoding::Cbor;
use alder_ledger::{
    submit_with_retry, BlockHeight, BlockId, CancelToken, ChallengeAction, ChallengeEvent,
    Error as LedgerError, LedgerConnection, LogPosition, RetryConfig,
};
use async_std::channel::{bounded, Receiver};
use async_trait::async_trait;
use futures::future::FutureExt;
use futures::{pin_mut, select};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Builds fresh dispute computation for a challenge, used when a rewind
/// discards the in-memory game and reattaches a checkpointed state.
pub type OpsFactory = Box<dyn Fn() -> Box<dyn DisputeOps> + Send>;

/// Adapts the ledger connection to the checkpointer's canonical-chain query.
struct ConnectionLookup<C>(Arc<C>);

#[async_trait]
impl<C: LedgerConnection> BlockIdLookup for ConnectionLookup<C> {
    async fn block_id_for_height(
        &self,
        height: BlockHeight,
    ) -> Result<Option<BlockId>, alder_checkpoint::Error> {
        self.0
            .block_id_for_height(height)
            .await
            .map_err(|e| alder_checkpoint::Error::ChainLookup(e.to_string()))
    }
}

/// Owns one challenge end to end: folds reactor items into the game, submits
/// the actions the game owes, checkpoints after every applied event, and
/// claims timeouts when the opponent's deadline lapses.
///
/// The driver is the challenge's single logical task; nothing else mutates
/// its game or its checkpoints, so writes need no further synchronization.
pub struct ChallengeDriver<C, S> {
    connection: Arc<C>,
    checkpointer: IndexedCheckpointer<S>,
    game: ChallengeGame,
    ops_factory: OpsFactory,
    retry: RetryConfig,
    rng: StdRng,
    cancel: CancelToken,
    last_event: Option<LogPosition>,
}

impl<C, S> ChallengeDriver<C, S>
where
    C: LedgerConnection,
    S: CheckpointStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection: Arc<C>,
        checkpointer: IndexedCheckpointer<S>,
        game: ChallengeGame,
        ops_factory: OpsFactory,
        retry: RetryConfig,
        rng: StdRng,
        cancel: CancelToken,
        last_event: Option<LogPosition>,
    ) -> Self {
        Self {
            connection,
            checkpointer,
            game,
            ops_factory,
            retry,
            rng,
            cancel,
            last_event,
        }
    }

    /// Consumes reactor items until the challenge resolves.
    pub async fn run(mut self, items: Receiver<ReactorItem>) -> Result<Winner, ReactorError> {
        // A restored game may already be over.
        if let Some(winner) = self.game.winner() {
            return Ok(winner);
        }
        // The initiation may already oblige the local role to move.
        self.act().await?;
        loop {
            let item = {
                let recv = items.recv().fuse();
                let cancelled = self.cancel.cancelled().fuse();
                pin_mut!(recv, cancelled);
                select! {
                    item = recv => item.map_err(|_| ReactorError::QueueClosed)?,
                    _ = cancelled => return Err(ReactorError::Cancelled),
                }
            };
            match item {
                ReactorItem::Event(event) => {
                    if self.apply_event(&event).await? {
                        if let Some(winner) = self.game.winner() {
                            return Ok(winner);
                        }
                    }
                }
                ReactorItem::Head(block) => {
                    self.checkpointer.confirm(block.height)?;
                    if let Some(action) = self.game.deadline_action(block.height) {
                        self.submit(action).await?;
                    }
                }
                ReactorItem::Rewind(fork_point) => {
                    self.rewind(fork_point).await?;
                }
            }
        }
    }

    /// Folds one event into the game and checkpoints the advanced state
    /// before reacting to it, so a crash between the two replays cleanly.
    async fn apply_event(&mut self, event: &ChallengeEvent) -> Result<bool, ReactorError> {
        if !self.game.process_event(event)? {
            return Ok(false);
        }
        self.last_event = Some(event.position());
        let blob = ChallengeCheckpoint::capture(&self.game, self.last_event).marshal_cbor()?;
        self.checkpointer.write(&event.block_id, blob)?;
        self.act().await?;
        Ok(true)
    }

    /// Submits whatever move the game currently owes.
    async fn act(&mut self) -> Result<(), ReactorError> {
        if let Some(action) = self.game.local_action()? {
            self.submit(action).await?;
        }
        Ok(())
    }

    async fn submit(&mut self, action: ChallengeAction) -> Result<(), ReactorError> {
        let method = action.method();
        let result = submit_with_retry(
            self.connection.as_ref(),
            self.game.challenge_id(),
            action,
            &self.retry,
            &mut self.rng,
            &self.cancel,
        )
        .await;
        match result {
            Ok(receipt) => {
                info!("Submitted {} in {}", method, receipt.block);
                Ok(())
            }
            // The judge refusing a move usually means the opponent's
            // transaction landed first; the echoed event will tell.
            Err(LedgerError::Reverted(why)) => {
                warn!("Judge rejected {}: {}", method, why);
                Ok(())
            }
            Err(LedgerError::Cancelled) => Err(ReactorError::Cancelled),
            Err(why) => Err(why.into()),
        }
    }

    /// Restores the newest checkpoint still on the canonical chain at or
    /// below the fork point. The canonical event suffix replays through the
    /// ordinary event path afterwards.
    async fn rewind(&mut self, fork_point: BlockId) -> Result<(), ReactorError> {
        let lookup = ConnectionLookup(self.connection.clone());
        let restored = self
            .checkpointer
            .restore_at_or_below(&lookup, fork_point.height)
            .await?;
        let (block, blob) = restored.ok_or_else(|| {
            ReactorError::Reorged(format!(
                "no canonical checkpoint at or below {}",
                fork_point,
            ))
        })?;
        let checkpoint = ChallengeCheckpoint::unmarshal_cbor(&blob)?;
        info!(
            "Restored challenge {:#x} from checkpoint at {} (round {})",
            checkpoint.challenge_id, block, checkpoint.state.round,
        );
        self.last_event = checkpoint.last_event;
        self.game = checkpoint.into_game((self.ops_factory)())?;
        // The move invited by the restored state may have been reorged away
        // with the event that carried it; repost rather than wait.
        self.act().await?;
        Ok(())
    }
}

/// Wires a reactor and a driver for one challenge and runs both to
/// completion. The initiation event seeds the game and the first
/// checkpoint; the returned winner is the judge's final word.
#[allow(clippy::too_many_arguments)]
pub async fn run_challenge<C, S>(
    connection: Arc<C>,
    store: Arc<S>,
    init_event: &ChallengeEvent,
    local_role: Role,
    ops_factory: OpsFactory,
    challenge_config: ChallengeConfig,
    reactor_config: ReactorConfig,
    retry: RetryConfig,
    rng_seed: u64,
    cancel: CancelToken,
) -> Result<Winner, ReactorError>
where
    C: LedgerConnection,
    S: CheckpointStore,
{
    let game = ChallengeGame::new(init_event, local_role, (ops_factory)())?;
    let checkpointer =
        IndexedCheckpointer::new(store, challenge_config.checkpoint_retention);
    let blob = ChallengeCheckpoint::capture(&game, None).marshal_cbor()?;
    checkpointer.write(&init_event.block_id, blob)?;

    drive(
        connection,
        checkpointer,
        game,
        None,
        init_event.block_id.height,
        ops_factory,
        reactor_config,
        retry,
        rng_seed,
        cancel,
    )
    .await
}

/// Resumes a challenge from the newest canonical checkpoint after a restart,
/// without replaying the game from its first event.
#[allow(clippy::too_many_arguments)]
pub async fn resume_challenge<C, S>(
    connection: Arc<C>,
    store: Arc<S>,
    ops_factory: OpsFactory,
    challenge_config: ChallengeConfig,
    reactor_config: ReactorConfig,
    retry: RetryConfig,
    rng_seed: u64,
    cancel: CancelToken,
) -> Result<Winner, ReactorError>
where
    C: LedgerConnection,
    S: CheckpointStore,
{
    let checkpointer =
        IndexedCheckpointer::new(store, challenge_config.checkpoint_retention);
    let lookup = ConnectionLookup(connection.clone());
    let (block, blob) = checkpointer
        .restore_latest(&lookup)
        .await?
        .ok_or_else(|| ReactorError::Reorged("no canonical checkpoint to resume from".into()))?;
    let checkpoint = ChallengeCheckpoint::unmarshal_cbor(&blob)?;
    info!(
        "Resuming challenge {:#x} from checkpoint at {} (round {})",
        checkpoint.challenge_id, block, checkpoint.state.round,
    );
    let last_event = checkpoint.last_event;
    let game = checkpoint.into_game((ops_factory)())?;

    drive(
        connection,
        checkpointer,
        game,
        last_event,
        block.height,
        ops_factory,
        reactor_config,
        retry,
        rng_seed,
        cancel,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn drive<C, S>(
    connection: Arc<C>,
    checkpointer: IndexedCheckpointer<S>,
    game: ChallengeGame,
    last_event: Option<LogPosition>,
    from_height: BlockHeight,
    ops_factory: OpsFactory,
    reactor_config: ReactorConfig,
    retry: RetryConfig,
    rng_seed: u64,
    cancel: CancelToken,
) -> Result<Winner, ReactorError>
where
    C: LedgerConnection,
    S: CheckpointStore,
{
    let (item_sender, item_receiver) = bounded(reactor_config.queue_capacity);
    let reactor = EventReactor::new(
        connection.clone(),
        game.challenge_id(),
        from_height,
        item_sender,
        cancel.clone(),
        reactor_config,
    );
    let driver = ChallengeDriver::new(
        connection,
        checkpointer,
        game,
        ops_factory,
        retry,
        StdRng::seed_from_u64(rng_seed),
        cancel,
        last_event,
    );

    let reactor_fut = reactor.run().fuse();
    let driver_fut = driver.run(item_receiver).fuse();
    pin_mut!(reactor_fut, driver_fut);
    select! {
        winner = driver_fut => winner,
        failed = reactor_fut => match failed {
            // The reactor loop only returns on failure.
            Err(why) => Err(why),
            Ok(()) => Err(ReactorError::QueueClosed),
        },
    }
}
