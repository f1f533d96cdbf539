// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! An in-memory ledger with a naive judge, used to exercise full challenge
//! games without a chain. Submitted actions are echoed back as the events
//! the on-chain dispatcher would emit; blocks, reorgs and transient RPC
//! failures are driven explicitly by the test.

use alder_challenge::Role;
use alder_encoding::keccak_256;
use alder_ledger::{
    BlockHeight, BlockId, ChallengeAction, ChallengeEvent, ChallengeEventKind, ChallengeKind,
    Error as LedgerError, LedgerConnection, LedgerNotification, NotificationStream, TxReceipt,
};
use async_std::channel::{unbounded, Sender};
use async_trait::async_trait;
use ethereum_types::{Address, H256};
use futures::stream::StreamExt;
use num_bigint::BigUint;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct ScriptedBlock {
    id: BlockId,
    parent_hash: H256,
    events: Vec<ChallengeEvent>,
    /// Judge turn state as of this block, restored when a reorg drops the
    /// blocks after it, the way contract state rewinds with the chain.
    turns: HashMap<H256, Role>,
}

struct JudgeState {
    asserter: Address,
    challenger: Address,
    turn: Role,
}

struct Inner {
    chain: Vec<ScriptedBlock>,
    subscribers: Vec<(H256, Sender<Result<LedgerNotification, LedgerError>>)>,
    judges: HashMap<H256, JudgeState>,
    submissions: Vec<(H256, ChallengeAction)>,
    deadline_period: u64,
    pending_failures: u32,
    /// Submissions at or past this count fail with a transient error until
    /// the script releases them, letting tests freeze a game mid-round.
    hold_from: Option<usize>,
    hash_nonce: u64,
}

impl Inner {
    fn tip(&self) -> &ScriptedBlock {
        self.chain.last().expect("chain always has a genesis")
    }

    fn next_hash(&mut self) -> H256 {
        self.hash_nonce += 1;
        keccak_256(&self.hash_nonce.to_be_bytes())
    }

    fn mine(&mut self, mut events: Vec<ChallengeEvent>) -> BlockId {
        let parent_hash = self.tip().id.hash;
        let id = BlockId::new(self.tip().id.height + 1, self.next_hash());
        for (log_index, event) in events.iter_mut().enumerate() {
            event.block_id = id;
            event.log_index = log_index as u64;
        }
        self.broadcast_events(&events);
        let turns = self
            .judges
            .iter()
            .map(|(challenge_id, judge)| (*challenge_id, judge.turn))
            .collect();
        self.chain.push(ScriptedBlock {
            id,
            parent_hash,
            events,
            turns,
        });
        self.broadcast_head(id, parent_hash);
        id
    }

    fn broadcast_events(&mut self, events: &[ChallengeEvent]) {
        for event in events {
            for (filter, sender) in &self.subscribers {
                if *filter == event.challenge_id {
                    let _ = sender.try_send(Ok(LedgerNotification::Event(event.clone())));
                }
            }
        }
    }

    fn broadcast_head(&mut self, block: BlockId, parent_hash: H256) {
        self.subscribers.retain(|(_, sender)| !sender.is_closed());
        for (_, sender) in &self.subscribers {
            let _ = sender.try_send(Ok(LedgerNotification::Head { block, parent_hash }));
        }
    }

    fn deadline(&self) -> BlockHeight {
        self.tip().id.height + 1 + self.deadline_period
    }
}

/// Shared handle to the scripted chain. Clones observe the same state.
#[derive(Clone)]
pub struct ScriptedLedger {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedLedger {
    pub fn new(deadline_period: u64) -> Self {
        let genesis = ScriptedBlock {
            id: BlockId::new(0, keccak_256(b"genesis")),
            parent_hash: H256::zero(),
            events: Vec::new(),
            turns: HashMap::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                chain: vec![genesis],
                subscribers: Vec::new(),
                judges: HashMap::new(),
                submissions: Vec::new(),
                deadline_period,
                pending_failures: 0,
                hold_from: None,
                hash_nonce: 0,
            })),
        }
    }

    /// Opens a challenge and returns the initiation event the judge emitted.
    #[allow(clippy::too_many_arguments)]
    pub fn initiate_challenge(
        &self,
        challenge_id: H256,
        kind: ChallengeKind,
        asserter: Address,
        challenger: Address,
        segment_start: BigUint,
        segment_length: BigUint,
        cut_hashes: Vec<H256>,
    ) -> ChallengeEvent {
        let mut inner = self.inner.lock();
        inner.judges.insert(
            challenge_id,
            JudgeState {
                asserter,
                challenger,
                turn: Role::Asserter,
            },
        );
        let event = ChallengeEvent {
            challenge_id,
            // Rewritten by `mine`.
            block_id: BlockId::new(0, H256::zero()),
            log_index: 0,
            poster: asserter,
            kind: ChallengeEventKind::Initiated {
                kind,
                asserter,
                challenger,
                segment_start,
                segment_length,
                cut_hashes,
                deadline: inner.deadline(),
            },
        };
        let block = inner.mine(vec![event.clone()]);
        let mut event = event;
        event.block_id = block;
        event
    }

    /// Mines an empty block, advancing the head the deadline watchdog sees.
    pub fn advance_block(&self) {
        self.inner.lock().mine(Vec::new());
    }

    pub fn height(&self) -> BlockHeight {
        self.inner.lock().tip().id.height
    }

    /// Drops the last `depth` blocks and mines a replacement tip with a
    /// different hash, discarding the events the dropped blocks carried.
    pub fn reorg(&self, depth: usize) {
        let mut inner = self.inner.lock();
        assert!(depth < inner.chain.len(), "cannot reorg out the genesis");
        let keep = inner.chain.len() - depth;
        inner.chain.truncate(keep);
        let turns = inner.tip().turns.clone();
        for (challenge_id, turn) in turns {
            if let Some(judge) = inner.judges.get_mut(&challenge_id) {
                judge.turn = turn;
            }
        }
        inner.mine(Vec::new());
    }

    /// Makes the next `count` submissions fail with a transient error.
    pub fn inject_transient_failures(&self, count: u32) {
        self.inner.lock().pending_failures = count;
    }

    /// Holds every submission once `count` have been accepted; held
    /// submissions fail transiently and succeed on retry after
    /// [`ScriptedLedger::release_submissions`].
    pub fn hold_submissions_from(&self, count: usize) {
        self.inner.lock().hold_from = Some(count);
    }

    pub fn release_submissions(&self) {
        self.inner.lock().hold_from = None;
    }

    pub fn submissions(&self) -> Vec<ChallengeAction> {
        self.inner
            .lock()
            .submissions
            .iter()
            .map(|(_, action)| action.clone())
            .collect()
    }

    pub fn submission_count(&self) -> usize {
        self.inner.lock().submissions.len()
    }

    /// Translates an accepted action into the event the judge would emit,
    /// advancing the judge's own idea of whose turn it is.
    fn echo(
        judge: &mut JudgeState,
        action: &ChallengeAction,
        deadline: BlockHeight,
    ) -> Result<(Address, ChallengeEventKind), LedgerError> {
        match action {
            ChallengeAction::Bisect {
                sub_cuts,
                segment_length,
                ..
            } => {
                if judge.turn != Role::Asserter {
                    return Err(LedgerError::Reverted("bisection out of turn".into()));
                }
                judge.turn = Role::Challenger;
                Ok((
                    judge.asserter,
                    ChallengeEventKind::Bisected {
                        cut_hashes: sub_cuts.clone(),
                        total_length: segment_length.clone(),
                        deadline,
                    },
                ))
            }
            ChallengeAction::ChooseSegment { segment_index, .. } => {
                if judge.turn != Role::Challenger {
                    return Err(LedgerError::Reverted("segment choice out of turn".into()));
                }
                judge.turn = Role::Asserter;
                Ok((
                    judge.challenger,
                    ChallengeEventKind::ContinuedChallenge {
                        segment_index: *segment_index,
                        deadline,
                    },
                ))
            }
            ChallengeAction::OneStepProof { .. } => {
                if judge.turn != Role::Asserter {
                    return Err(LedgerError::Reverted("proof out of turn".into()));
                }
                Ok((judge.asserter, ChallengeEventKind::OneStepProofCompleted))
            }
            ChallengeAction::ProveContinuedExecution { .. } => {
                if judge.turn != Role::Challenger {
                    return Err(LedgerError::Reverted("proof out of turn".into()));
                }
                Ok((
                    judge.challenger,
                    ChallengeEventKind::ContinuedExecutionProved,
                ))
            }
            ChallengeAction::TimedOut { .. } => {
                let (loser, claimant) = match judge.turn {
                    Role::Asserter => (judge.asserter, judge.challenger),
                    Role::Challenger => (judge.challenger, judge.asserter),
                };
                Ok((
                    claimant,
                    ChallengeEventKind::TimedOut {
                        losing_party: loser,
                    },
                ))
            }
        }
    }
}

#[async_trait]
impl LedgerConnection for ScriptedLedger {
    async fn submit(
        &self,
        challenge_id: H256,
        action: ChallengeAction,
    ) -> Result<TxReceipt, LedgerError> {
        let mut inner = self.inner.lock();
        if inner.pending_failures > 0 {
            inner.pending_failures -= 1;
            return Err(LedgerError::Transient("scripted RPC failure".into()));
        }
        if matches!(inner.hold_from, Some(limit) if inner.submissions.len() >= limit) {
            return Err(LedgerError::Transient("submission held by the script".into()));
        }
        let deadline = inner.deadline();
        let judge = inner
            .judges
            .get_mut(&challenge_id)
            .ok_or_else(|| LedgerError::Reverted("unknown challenge".into()))?;
        let (poster, kind) = Self::echo(judge, &action, deadline)?;

        inner.submissions.push((challenge_id, action.clone()));
        let tx_hash = keccak_256(&action.calldata()?);
        let event = ChallengeEvent {
            challenge_id,
            block_id: BlockId::new(0, H256::zero()),
            log_index: 0,
            poster,
            kind,
        };
        let block = inner.mine(vec![event]);
        Ok(TxReceipt { block, tx_hash })
    }

    async fn subscribe(
        &self,
        challenge_id: H256,
        from_height: BlockHeight,
    ) -> Result<NotificationStream, LedgerError> {
        let (sender, receiver) = unbounded();
        let mut inner = self.inner.lock();
        for block in &inner.chain {
            if block.id.height < from_height {
                continue;
            }
            for event in &block.events {
                if event.challenge_id == challenge_id {
                    let _ = sender.try_send(Ok(LedgerNotification::Event(event.clone())));
                }
            }
            let _ = sender.try_send(Ok(LedgerNotification::Head {
                block: block.id,
                parent_hash: block.parent_hash,
            }));
        }
        inner.subscribers.push((challenge_id, sender));
        Ok(receiver.boxed())
    }

    async fn block_id_for_height(
        &self,
        height: BlockHeight,
    ) -> Result<Option<BlockId>, LedgerError> {
        Ok(self
            .inner
            .lock()
            .chain
            .iter()
            .find(|block| block.id.height == height)
            .map(|block| block.id))
    }
}
