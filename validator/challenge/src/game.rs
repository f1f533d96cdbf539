// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{
    metrics, Bisection, ChallengeError, ChallengeSegment, DisputeOps, UNREACHABLE_CUT_HASH,
};
use alder_ledger::{
    BlockHeight, ChallengeAction, ChallengeEvent, ChallengeEventKind, ChallengeKind,
};
use ethereum_types::{Address, H256};
use log::{debug, info, warn};
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the dispute a party argues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Defends the assertion; posts bisections and the final one-step proof.
    Asserter,
    /// Attacks the assertion; chooses divergent segments.
    Challenger,
}

impl Role {
    pub fn opponent(self) -> Role {
        match self {
            Role::Asserter => Role::Challenger,
            Role::Challenger => Role::Asserter,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Asserter => write!(f, "asserter"),
            Role::Challenger => write!(f, "challenger"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Asserter,
    Challenger,
}

/// Progress of one challenge through the bisection game. Every phase except
/// the terminal one has an owning role and a deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GamePhase {
    /// The asserter owes a bisection, or a one-step proof at the base case.
    AsserterTurn { one_step: bool },
    /// The challenger owes a segment choice for the posted bisection.
    ChallengerTurn,
    Resolved(Winner),
}

/// The serializable heart of a challenge: everything the judge's events have
/// established so far. Mutated only by events arriving from the judge, never
/// by locally submitted actions, so replaying the event stream reproduces it
/// exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeState {
    pub kind: ChallengeKind,
    pub asserter: Address,
    pub challenger: Address,
    /// The segment currently under dispute.
    pub segment: ChallengeSegment,
    /// Root of the bisection whose sub-segment `chosen_index` is `segment`;
    /// referenced by the next outbound action.
    pub prev_root: H256,
    pub chosen_index: u64,
    /// The bisection posted this round, pending the challenger's choice.
    pub current_bisection: Option<Bisection>,
    /// Cut both parties agree on at `segment`'s start.
    pub agreed_start: H256,
    /// The asserter's claimed cut at `segment`'s end.
    pub claimed_end: H256,
    pub phase: GamePhase,
    /// Ledger block by which the owning party must act.
    pub deadline: BlockHeight,
    /// Monotonically increasing count of judge moves applied.
    pub round: u64,
}

/// Drives one challenge through the dispute state machine. The game is
/// reactive: a local action is only ever computed in response to the judge
/// event that invited it, and state advances only when the judge confirms a
/// move, so the engine never speculates ahead of the chain.
pub struct ChallengeGame {
    challenge_id: H256,
    local_role: Role,
    ops: Box<dyn DisputeOps>,
    state: ChallengeState,
}

impl ChallengeGame {
    /// Builds a game from the judge's `ChallengeInitiated` event.
    pub fn new(
        event: &ChallengeEvent,
        local_role: Role,
        ops: Box<dyn DisputeOps>,
    ) -> Result<Self, ChallengeError> {
        let (kind, asserter, challenger, segment, cut_hashes, deadline) = match &event.kind {
            ChallengeEventKind::Initiated {
                kind,
                asserter,
                challenger,
                segment_start,
                segment_length,
                cut_hashes,
                deadline,
            } => (
                *kind,
                *asserter,
                *challenger,
                ChallengeSegment::new(segment_start.clone(), segment_length.clone()),
                cut_hashes.clone(),
                *deadline,
            ),
            other => {
                return Err(ChallengeError::ProtocolViolation(format!(
                    "challenge created from a non-initiation event: {:?}",
                    other,
                )))
            }
        };
        if kind != ops.kind() {
            return Err(ChallengeError::ProtocolViolation(format!(
                "dispute ops for {:?} attached to a {:?} challenge",
                ops.kind(),
                kind,
            )));
        }
        if cut_hashes.len() != 2 {
            return Err(ChallengeError::ProtocolViolation(format!(
                "challenge initiated with {} cuts, expected the boundary pair",
                cut_hashes.len(),
            )));
        }
        let initial = Bisection::initial(segment.clone(), cut_hashes[0], cut_hashes[1]);
        info!(
            "Joined challenge {:#x} as {} over segment {}",
            event.challenge_id, local_role, segment,
        );
        Ok(Self {
            challenge_id: event.challenge_id,
            local_role,
            ops,
            state: ChallengeState {
                kind,
                asserter,
                challenger,
                prev_root: initial.root(),
                chosen_index: 0,
                current_bisection: None,
                agreed_start: cut_hashes[0],
                claimed_end: cut_hashes[1],
                phase: GamePhase::AsserterTurn {
                    one_step: segment.is_one_step(),
                },
                segment,
                deadline,
                round: 0,
            },
        })
    }

    /// Rebuilds a game from a checkpointed state, e.g. after a restart or a
    /// reorg rewind.
    pub fn restore(
        challenge_id: H256,
        local_role: Role,
        state: ChallengeState,
        ops: Box<dyn DisputeOps>,
    ) -> Result<Self, ChallengeError> {
        if state.kind != ops.kind() {
            return Err(ChallengeError::ProtocolViolation(format!(
                "dispute ops for {:?} attached to a {:?} challenge",
                ops.kind(),
                state.kind,
            )));
        }
        Ok(Self {
            challenge_id,
            local_role,
            ops,
            state,
        })
    }

    pub fn challenge_id(&self) -> H256 {
        self.challenge_id
    }

    pub fn local_role(&self) -> Role {
        self.local_role
    }

    pub fn state(&self) -> &ChallengeState {
        &self.state
    }

    pub fn phase(&self) -> &GamePhase {
        &self.state.phase
    }

    pub fn round(&self) -> u64 {
        self.state.round
    }

    pub fn deadline(&self) -> BlockHeight {
        self.state.deadline
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state.phase, GamePhase::Resolved(_))
    }

    pub fn winner(&self) -> Option<Winner> {
        match self.state.phase {
            GamePhase::Resolved(winner) => Some(winner),
            _ => None,
        }
    }

    /// The role currently obliged to act, `None` once resolved.
    pub fn turn(&self) -> Option<Role> {
        match self.state.phase {
            GamePhase::AsserterTurn { .. } => Some(Role::Asserter),
            GamePhase::ChallengerTurn => Some(Role::Challenger),
            GamePhase::Resolved(_) => None,
        }
    }

    fn party(&self, role: Role) -> Address {
        match role {
            Role::Asserter => self.state.asserter,
            Role::Challenger => self.state.challenger,
        }
    }

    /// Applies one judge event. Returns `true` when the game advanced.
    /// Duplicate or out-of-turn events are dropped as stale: at-least-once
    /// delivery and replay make them ordinary, and the judge is the
    /// authority on turn legality. Events that match the expected turn but
    /// violate the game's invariants are fatal.
    pub fn process_event(&mut self, event: &ChallengeEvent) -> Result<bool, ChallengeError> {
        if event.challenge_id != self.challenge_id {
            warn!(
                "Dropping event for foreign challenge {:#x}",
                event.challenge_id,
            );
            metrics::STALE_EVENTS_TOTAL.inc();
            return Ok(false);
        }
        let advanced = match &event.kind {
            ChallengeEventKind::Initiated { .. } => {
                // The constructor consumed the initiation; a second one for
                // the same id is a redelivery.
                false
            }
            ChallengeEventKind::Bisected {
                cut_hashes,
                total_length,
                deadline,
            } => self.apply_bisected(event, cut_hashes, total_length, *deadline)?,
            ChallengeEventKind::ContinuedChallenge {
                segment_index,
                deadline,
            } => self.apply_continued_challenge(event, *segment_index, *deadline)?,
            ChallengeEventKind::OneStepProofCompleted => {
                self.resolve(event, Role::Asserter, Winner::Asserter)
            }
            ChallengeEventKind::ContinuedExecutionProved => {
                self.resolve(event, Role::Challenger, Winner::Challenger)
            }
            ChallengeEventKind::TimedOut { losing_party } => {
                self.apply_timed_out(*losing_party)?
            }
        };
        if advanced {
            self.state.round += 1;
            metrics::ROUNDS_TOTAL.inc();
        } else {
            metrics::STALE_EVENTS_TOTAL.inc();
        }
        Ok(advanced)
    }

    fn apply_bisected(
        &mut self,
        event: &ChallengeEvent,
        cut_hashes: &[H256],
        total_length: &BigUint,
        deadline: BlockHeight,
    ) -> Result<bool, ChallengeError> {
        if !matches!(self.state.phase, GamePhase::AsserterTurn { one_step: false }) {
            warn!("Dropping stale bisection in phase {:?}", self.state.phase);
            return Ok(false);
        }
        if event.poster != self.state.asserter {
            warn!("Dropping bisection posted by non-asserter {}", event.poster);
            return Ok(false);
        }
        let expected_count = self
            .state
            .segment
            .sub_segment_count(self.ops.segment_target());
        let bisection = Bisection::from_claim(
            self.state.segment.clone(),
            cut_hashes.to_vec(),
            total_length,
            &self.state.agreed_start,
            &self.state.claimed_end,
            expected_count,
        )?;
        debug!(
            "Round {}: segment {} bisected into {} pieces",
            self.state.round,
            self.state.segment,
            bisection.sub_segment_count(),
        );
        self.state.current_bisection = Some(bisection);
        self.state.phase = GamePhase::ChallengerTurn;
        self.state.deadline = deadline;
        Ok(true)
    }

    fn apply_continued_challenge(
        &mut self,
        event: &ChallengeEvent,
        segment_index: u64,
        deadline: BlockHeight,
    ) -> Result<bool, ChallengeError> {
        if !matches!(self.state.phase, GamePhase::ChallengerTurn) {
            warn!(
                "Dropping stale segment choice in phase {:?}",
                self.state.phase,
            );
            return Ok(false);
        }
        if event.poster != self.state.challenger {
            warn!(
                "Dropping segment choice posted by non-challenger {}",
                event.poster,
            );
            return Ok(false);
        }
        let bisection = self
            .state
            .current_bisection
            .take()
            .ok_or_else(|| {
                ChallengeError::ProtocolViolation(
                    "segment chosen with no bisection on record".into(),
                )
            })?;
        let segment = bisection.sub_segment(segment_index)?;
        let agreed_start = bisection.cut_hashes[segment_index as usize];
        let claimed_end = bisection.cut_hashes[segment_index as usize + 1];
        debug!(
            "Round {}: dispute narrowed to sub-segment {} = {}",
            self.state.round, segment_index, segment,
        );
        self.state.prev_root = bisection.root();
        self.state.chosen_index = segment_index;
        self.state.agreed_start = agreed_start;
        self.state.claimed_end = claimed_end;
        self.state.phase = GamePhase::AsserterTurn {
            one_step: segment.is_one_step(),
        };
        self.state.segment = segment;
        self.state.deadline = deadline;
        Ok(true)
    }

    fn resolve(&mut self, event: &ChallengeEvent, expected: Role, winner: Winner) -> bool {
        if self.is_resolved() {
            return false;
        }
        if event.poster != self.party(expected) {
            warn!("Dropping resolution posted by {}", event.poster);
            return false;
        }
        info!("Challenge {:#x} resolved: {:?} wins", self.challenge_id, winner);
        metrics::RESOLVED_TOTAL
            .with_label_values(&[match winner {
                Winner::Asserter => metrics::values::ASSERTER,
                Winner::Challenger => metrics::values::CHALLENGER,
            }])
            .inc();
        self.state.phase = GamePhase::Resolved(winner);
        true
    }

    fn apply_timed_out(&mut self, losing_party: Address) -> Result<bool, ChallengeError> {
        if self.is_resolved() {
            return Ok(false);
        }
        let winner = if losing_party == self.state.asserter {
            Winner::Challenger
        } else if losing_party == self.state.challenger {
            Winner::Asserter
        } else {
            return Err(ChallengeError::ProtocolViolation(format!(
                "timeout lost by {}, who is not a party to this challenge",
                losing_party,
            )));
        };
        info!(
            "Challenge {:#x} timed out against {}; {:?} wins",
            self.challenge_id, losing_party, winner,
        );
        metrics::RESOLVED_TOTAL
            .with_label_values(&[match winner {
                Winner::Asserter => metrics::values::ASSERTER,
                Winner::Challenger => metrics::values::CHALLENGER,
            }])
            .inc();
        self.state.phase = GamePhase::Resolved(winner);
        Ok(true)
    }

    /// The move the local role owes in the current phase, if any. Pure with
    /// respect to game state: replaying a checkpointed game recomputes the
    /// same action.
    pub fn local_action(&self) -> Result<Option<ChallengeAction>, ChallengeError> {
        match (&self.state.phase, self.local_role) {
            (GamePhase::AsserterTurn { one_step }, Role::Asserter) => {
                if *one_step || self.local_segment_is_base()? {
                    self.one_step_action().map(Some)
                } else {
                    self.bisect_action().map(Some)
                }
            }
            (GamePhase::ChallengerTurn, Role::Challenger) => self.choose_action().map(Some),
            _ => Ok(None),
        }
    }

    /// The asserter cannot split a segment its replay crosses in a single
    /// micro-step, however much gas that step burned.
    fn local_segment_is_base(&self) -> Result<bool, ChallengeError> {
        Ok(self.ops.segment_steps(&self.state.segment)? <= BigUint::one())
    }

    fn bisect_action(&self) -> Result<ChallengeAction, ChallengeError> {
        let segment = &self.state.segment;
        let count = segment.sub_segment_count(self.ops.segment_target());
        let offsets = segment.cut_offsets(count);
        let cuts = self.ops.cuts(&offsets)?;
        let sub_cuts: Vec<H256> = cuts.iter().map(|cut| cut.hash()).collect();
        debug!(
            "Bisecting {} into {} sub-segments",
            segment,
            count,
        );
        Ok(ChallengeAction::Bisect {
            prev_bisection_root: self.state.prev_root,
            segment_to_challenge: self.state.chosen_index,
            segment_start: segment.start.clone(),
            segment_length: segment.length.clone(),
            sub_cuts,
        })
    }

    fn one_step_action(&self) -> Result<ChallengeAction, ChallengeError> {
        let data = self.ops.one_step_data(&self.state.segment)?;
        metrics::ONE_STEP_PROOFS_TOTAL.inc();
        debug!(
            "Posting one-step proof for {} (opcode {:#x})",
            self.state.segment, data.opcode,
        );
        Ok(ChallengeAction::OneStepProof {
            pre_cut: data.pre_cut.words(),
            proof: data.proof,
            buffer_proof: data.buffer_proof,
            opcode: data.opcode,
        })
    }

    fn choose_action(&self) -> Result<ChallengeAction, ChallengeError> {
        let bisection = self.state.current_bisection.as_ref().ok_or_else(|| {
            ChallengeError::ProtocolViolation("challenger turn with no bisection on record".into())
        })?;
        let count = bisection.sub_segment_count();
        let offsets = bisection.segment.cut_offsets(count);
        let divergence = self
            .ops
            .find_first_divergence(&offsets, &bisection.cut_hashes)?;
        let index = divergence.different_index;
        let their_end = bisection.cut_hashes[index as usize + 1];

        // The opponent declared the boundary unreachable but the local
        // machine steps past it: prove the execution continues instead of
        // recursing into a segment that cannot be one-step proved.
        if their_end == UNREACHABLE_CUT_HASH && !divergence.end_is_unreachable {
            let sub_segment = bisection.sub_segment(index)?;
            let pre_cut = self.ops.segment_start_cut(&sub_segment)?;
            debug!(
                "Opponent claims {} unreachable; proving continued execution",
                sub_segment,
            );
            return Ok(ChallengeAction::ProveContinuedExecution {
                prev_bisection_root: bisection.root(),
                segment_index: index,
                segment_start: sub_segment.start,
                segment_length: sub_segment.length,
                pre_cut: pre_cut.words(),
            });
        }

        debug!(
            "Choosing divergent sub-segment {} ({} local steps)",
            index, divergence.segment_steps,
        );
        Ok(ChallengeAction::ChooseSegment {
            prev_bisection_root: bisection.root(),
            segment_index: index,
            sub_cuts: vec![divergence.local_cut.hash()],
        })
    }

    /// The timeout move available once `head` passed the opponent's
    /// deadline. The judge's clock is the block number; wall time never
    /// enters the decision.
    pub fn deadline_action(&self, head: BlockHeight) -> Option<ChallengeAction> {
        if self.is_resolved() || head <= self.state.deadline {
            return None;
        }
        match self.turn() {
            Some(turn) if turn != self.local_role => {
                info!(
                    "Opponent missed deadline {} (head {}); claiming timeout",
                    self.state.deadline, head,
                );
                Some(ChallengeAction::TimedOut {
                    challenge_id: self.challenge_id,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChallengeConfig, Cut, ExecutionDispute};
    use alder_execution::testing::{CountingMachine, FaultyMachine};
    use alder_execution::{Assertion, ExecutionState, Machine};
    use alder_ledger::BlockId;

    const ASSERTER: Address = Address::repeat_byte(0xAA);
    const CHALLENGER: Address = Address::repeat_byte(0xBB);

    fn challenge_id() -> H256 {
        H256::repeat_byte(0xCC)
    }

    fn run_to(machine: &CountingMachine, gas: u64) -> CountingMachine {
        let mut post = machine.clone();
        while post.total_gas_consumed() < BigUint::from(gas) {
            if post.step_once().is_none() {
                break;
            }
        }
        post
    }

    fn assertion(machine: &CountingMachine, gas: u64) -> Assertion {
        Assertion::new(
            ExecutionState::from_machine(machine),
            ExecutionState::from_machine(&run_to(machine, gas)),
        )
    }

    fn event(height: u64, poster: Address, kind: ChallengeEventKind) -> ChallengeEvent {
        ChallengeEvent {
            challenge_id: challenge_id(),
            block_id: BlockId::new(height, H256::repeat_byte(height as u8)),
            log_index: 0,
            poster,
            kind,
        }
    }

    fn initiated(segment_length: u64, start_cut: H256, end_cut: H256) -> ChallengeEvent {
        event(
            1,
            ASSERTER,
            ChallengeEventKind::Initiated {
                kind: ChallengeKind::Execution,
                asserter: ASSERTER,
                challenger: CHALLENGER,
                segment_start: BigUint::from(0u8),
                segment_length: BigUint::from(segment_length),
                cut_hashes: vec![start_cut, end_cut],
                deadline: 100,
            },
        )
    }

    /// Translates a submitted action into the event the judge would emit,
    /// the way the on-chain dispatcher echoes every accepted move.
    fn echo(action: &ChallengeAction, poster: Address, height: u64) -> ChallengeEvent {
        let kind = match action {
            ChallengeAction::Bisect {
                sub_cuts,
                segment_length,
                ..
            } => ChallengeEventKind::Bisected {
                cut_hashes: sub_cuts.clone(),
                total_length: segment_length.clone(),
                deadline: height + 20,
            },
            ChallengeAction::ChooseSegment { segment_index, .. } => {
                ChallengeEventKind::ContinuedChallenge {
                    segment_index: *segment_index,
                    deadline: height + 20,
                }
            }
            ChallengeAction::OneStepProof { .. } => ChallengeEventKind::OneStepProofCompleted,
            ChallengeAction::ProveContinuedExecution { .. } => {
                ChallengeEventKind::ContinuedExecutionProved
            }
            ChallengeAction::TimedOut { .. } => ChallengeEventKind::TimedOut {
                losing_party: ASSERTER,
            },
        };
        event(height, poster, kind)
    }

    fn ops(machine: CountingMachine, assertion: &Assertion, target: u64) -> Box<dyn DisputeOps> {
        Box::new(ExecutionDispute::new(machine, assertion.clone(), target))
    }

    fn faulty_ops(
        machine: CountingMachine,
        fault_gas: u64,
        assertion: &Assertion,
        target: u64,
    ) -> Box<dyn DisputeOps> {
        Box::new(ExecutionDispute::new(
            FaultyMachine::new(machine, fault_gas),
            assertion.clone(),
            target,
        ))
    }

    #[test]
    fn honest_challenger_chooses_the_divergent_segment() {
        // The asserter's machine diverges past gas 3200, so of the four
        // boundary cuts at 1000/2000/3000/4000 only the last disagrees.
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let faulty_after = {
            let mut faulty = FaultyMachine::new(machine.clone(), 3_200);
            while faulty.total_gas_consumed() < BigUint::from(4_000u64) {
                faulty.step_once().unwrap();
            }
            ExecutionState::from_machine(&faulty)
        };
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), faulty_after.hash());

        let mut asserter_game = ChallengeGame::new(
            &init,
            Role::Asserter,
            faulty_ops(machine.clone(), 3_200, &claim, 4),
        )
        .unwrap();
        let mut challenger_game =
            ChallengeGame::new(&init, Role::Challenger, ops(machine, &claim, 4)).unwrap();

        // Round 1: the asserter bisects.
        let bisect = asserter_game.local_action().unwrap().unwrap();
        assert!(matches!(bisect, ChallengeAction::Bisect { .. }));
        assert!(challenger_game.local_action().unwrap().is_none());

        let bisected = echo(&bisect, ASSERTER, 2);
        assert!(asserter_game.process_event(&bisected).unwrap());
        assert!(challenger_game.process_event(&bisected).unwrap());
        assert_eq!(challenger_game.turn(), Some(Role::Challenger));

        // The challenger locates the minimal divergent sub-segment.
        let choose = challenger_game.local_action().unwrap().unwrap();
        match &choose {
            ChallengeAction::ChooseSegment {
                segment_index,
                sub_cuts,
                ..
            } => {
                assert_eq!(*segment_index, 3);
                assert_eq!(sub_cuts.len(), 1);
            }
            other => panic!("expected a segment choice, got {:?}", other),
        }

        let continued = echo(&choose, CHALLENGER, 3);
        assert!(asserter_game.process_event(&continued).unwrap());
        assert!(challenger_game.process_event(&continued).unwrap());

        // The dispute recursed onto [3000, 4000).
        assert_eq!(
            asserter_game.state().segment,
            ChallengeSegment::new(BigUint::from(3_000u64), BigUint::from(1_000u64)),
        );
        assert_eq!(asserter_game.round(), 2);
        assert_eq!(asserter_game.turn(), Some(Role::Asserter));

        // Round 2: the asserter bisects the narrowed segment.
        match asserter_game.local_action().unwrap().unwrap() {
            ChallengeAction::Bisect {
                segment_start,
                segment_length,
                ..
            } => {
                assert_eq!(segment_start, BigUint::from(3_000u64));
                assert_eq!(segment_length, BigUint::from(1_000u64));
            }
            other => panic!("expected a bisection, got {:?}", other),
        }
    }

    #[test]
    fn game_runs_to_a_one_step_proof() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let faulty_after = {
            let mut faulty = FaultyMachine::new(machine.clone(), 35);
            while faulty.total_gas_consumed() < BigUint::from(40u64) {
                faulty.step_once().unwrap();
            }
            ExecutionState::from_machine(&faulty)
        };
        let claim = assertion(&machine, 40);
        let init = initiated(40, claim.before.hash(), faulty_after.hash());

        let mut asserter_game = ChallengeGame::new(
            &init,
            Role::Asserter,
            faulty_ops(machine.clone(), 35, &claim, 4),
        )
        .unwrap();
        let mut challenger_game =
            ChallengeGame::new(&init, Role::Challenger, ops(machine, &claim, 4)).unwrap();

        let mut height = 2;
        loop {
            let turn = asserter_game.turn().unwrap();
            let (game, poster) = match turn {
                Role::Asserter => (&asserter_game, ASSERTER),
                Role::Challenger => (&challenger_game, CHALLENGER),
            };
            let action = game.local_action().unwrap().unwrap();
            let is_proof = matches!(action, ChallengeAction::OneStepProof { .. });
            let ev = echo(&action, poster, height);
            asserter_game.process_event(&ev).unwrap();
            challenger_game.process_event(&ev).unwrap();
            height += 1;
            if is_proof {
                break;
            }
            assert!(height < 20, "game did not converge");
        }

        assert_eq!(asserter_game.winner(), Some(Winner::Asserter));
        assert_eq!(challenger_game.winner(), Some(Winner::Asserter));
        assert!(asserter_game.local_action().unwrap().is_none());
    }

    #[test]
    fn single_step_segments_skip_the_bisection() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 10);
        let init = initiated(1, claim.before.hash(), claim.after.hash());

        let game =
            ChallengeGame::new(&init, Role::Asserter, ops(machine, &claim, 400)).unwrap();
        assert!(matches!(
            game.phase(),
            GamePhase::AsserterTurn { one_step: true }
        ));
        assert!(matches!(
            game.local_action().unwrap().unwrap(),
            ChallengeAction::OneStepProof { .. }
        ));
    }

    #[test]
    fn stale_and_foreign_events_are_dropped() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), claim.after.hash());
        let mut game =
            ChallengeGame::new(&init, Role::Challenger, ops(machine, &claim, 4)).unwrap();

        // A segment choice before any bisection is out of turn.
        let premature = event(
            2,
            CHALLENGER,
            ChallengeEventKind::ContinuedChallenge {
                segment_index: 0,
                deadline: 120,
            },
        );
        assert!(!game.process_event(&premature).unwrap());

        // A bisection posted by the wrong party is dropped.
        let forged = event(
            2,
            CHALLENGER,
            ChallengeEventKind::Bisected {
                cut_hashes: vec![H256::zero(); 5],
                total_length: BigUint::from(4_000u64),
                deadline: 120,
            },
        );
        assert!(!game.process_event(&forged).unwrap());

        // Events for another challenge never touch this game.
        let mut foreign = event(2, ASSERTER, ChallengeEventKind::OneStepProofCompleted);
        foreign.challenge_id = H256::repeat_byte(0x12);
        assert!(!game.process_event(&foreign).unwrap());
        assert!(!game.is_resolved());
        assert_eq!(game.round(), 0);
    }

    #[test]
    fn malformed_bisections_are_protocol_violations() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), claim.after.hash());
        let mut game =
            ChallengeGame::new(&init, Role::Challenger, ops(machine, &claim, 4)).unwrap();

        // Right poster and phase, wrong start cut.
        let mut cuts = vec![H256::repeat_byte(0xEE); 5];
        cuts[4] = claim.after.hash();
        let forged = event(
            2,
            ASSERTER,
            ChallengeEventKind::Bisected {
                cut_hashes: cuts,
                total_length: BigUint::from(4_000u64),
                deadline: 120,
            },
        );
        assert!(matches!(
            game.process_event(&forged),
            Err(ChallengeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn deadline_claims_belong_to_the_waiting_party() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), claim.after.hash());

        let challenger_game = ChallengeGame::new(
            &init,
            Role::Challenger,
            ops(machine.clone(), &claim, 4),
        )
        .unwrap();
        let asserter_game =
            ChallengeGame::new(&init, Role::Asserter, ops(machine, &claim, 4)).unwrap();

        // It is the asserter's turn: only the challenger may claim, and only
        // once the head is past the deadline.
        assert!(challenger_game.deadline_action(100).is_none());
        assert!(asserter_game.deadline_action(101).is_none());
        assert!(matches!(
            challenger_game.deadline_action(101),
            Some(ChallengeAction::TimedOut { .. })
        ));
    }

    #[test]
    fn timeout_event_resolves_against_the_losing_party() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), claim.after.hash());
        let mut game = ChallengeGame::new(
            &init,
            Role::Challenger,
            ops(machine, &claim, 4),
        )
        .unwrap();

        let timed_out = event(
            101,
            CHALLENGER,
            ChallengeEventKind::TimedOut {
                losing_party: ASSERTER,
            },
        );
        assert!(game.process_event(&timed_out).unwrap());
        assert_eq!(game.winner(), Some(Winner::Challenger));

        // An outsider as losing party would be inconsistent.
        let mut fresh = ChallengeGame::new(
            &init,
            Role::Challenger,
            ops(CountingMachine::new(10, 0, 0, u64::MAX), &claim, 4),
        )
        .unwrap();
        let bogus = event(
            101,
            CHALLENGER,
            ChallengeEventKind::TimedOut {
                losing_party: Address::repeat_byte(0x99),
            },
        );
        assert!(matches!(
            fresh.process_event(&bogus),
            Err(ChallengeError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn no_divergence_is_a_caller_bug() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), claim.after.hash());

        let asserter_game = ChallengeGame::new(
            &init,
            Role::Asserter,
            ops(machine.clone(), &claim, 4),
        )
        .unwrap();
        let mut challenger_game =
            ChallengeGame::new(&init, Role::Challenger, ops(machine, &claim, 4)).unwrap();

        // An honest bisection against an identical local replay leaves the
        // challenger with nothing to dispute.
        let bisect = asserter_game.local_action().unwrap().unwrap();
        challenger_game
            .process_event(&echo(&bisect, ASSERTER, 2))
            .unwrap();
        assert!(matches!(
            challenger_game.local_action(),
            Err(ChallengeError::NoDivergence)
        ));
    }

    #[test]
    fn unreachable_claims_are_met_with_continued_execution() {
        // The asserter's machine halts after 50 steps (gas 500), so its cuts
        // past that point are unreachable; the honest machine runs on.
        let halting = CountingMachine::new(10, 0, 0, 50);
        let honest = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&honest, 4_000);
        let init = initiated(4_000, claim.before.hash(), crate::UNREACHABLE_CUT_HASH);

        let asserter_game = ChallengeGame::new(
            &init,
            Role::Asserter,
            ops(halting, &claim, 4),
        )
        .unwrap();
        let mut challenger_game =
            ChallengeGame::new(&init, Role::Challenger, ops(honest, &claim, 4)).unwrap();

        let bisect = asserter_game.local_action().unwrap().unwrap();
        if let ChallengeAction::Bisect { sub_cuts, .. } = &bisect {
            assert_eq!(*sub_cuts.last().unwrap(), crate::UNREACHABLE_CUT_HASH);
        } else {
            panic!("expected a bisection");
        }
        challenger_game
            .process_event(&echo(&bisect, ASSERTER, 2))
            .unwrap();

        let action = challenger_game.local_action().unwrap().unwrap();
        match action {
            ChallengeAction::ProveContinuedExecution { ref pre_cut, .. } => {
                assert!(!pre_cut.is_empty());
            }
            other => panic!("expected a continued-execution proof, got {:?}", other),
        }

        let proved = echo(&action, CHALLENGER, 3);
        challenger_game.process_event(&proved).unwrap();
        assert_eq!(challenger_game.winner(), Some(Winner::Challenger));
    }

    #[test]
    fn checkpoint_restore_recomputes_the_same_action() {
        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let faulty_after = {
            let mut faulty = FaultyMachine::new(machine.clone(), 3_200);
            while faulty.total_gas_consumed() < BigUint::from(4_000u64) {
                faulty.step_once().unwrap();
            }
            ExecutionState::from_machine(&faulty)
        };
        let claim = assertion(&machine, 4_000);
        let init = initiated(4_000, claim.before.hash(), faulty_after.hash());

        let asserter_game = ChallengeGame::new(
            &init,
            Role::Asserter,
            faulty_ops(machine.clone(), 3_200, &claim, 4),
        )
        .unwrap();
        let mut challenger_game = ChallengeGame::new(
            &init,
            Role::Challenger,
            ops(machine.clone(), &claim, 4),
        )
        .unwrap();

        let bisect = asserter_game.local_action().unwrap().unwrap();
        challenger_game
            .process_event(&echo(&bisect, ASSERTER, 2))
            .unwrap();
        let expected = challenger_game.local_action().unwrap().unwrap();

        let checkpoint = crate::ChallengeCheckpoint::capture(&challenger_game, None);
        let restored = checkpoint.into_game(ops(machine, &claim, 4)).unwrap();
        assert_eq!(restored.local_action().unwrap().unwrap(), expected);
        assert_eq!(restored.state(), challenger_game.state());
    }

    #[test]
    fn segment_targets_come_from_protocol_config() {
        let config = ChallengeConfig::default();
        assert_eq!(config.segment_target(ChallengeKind::Execution), 400);
        assert_eq!(config.segment_target(ChallengeKind::InboxDelta), 250);

        let machine = CountingMachine::new(10, 0, 0, u64::MAX);
        let claim = assertion(&machine, 4_000);
        let dispute = ExecutionDispute::new(
            machine,
            claim,
            config.segment_target(ChallengeKind::Execution),
        );
        assert_eq!(dispute.segment_target(), 400);
        // Unused in this test but part of the cut surface.
        let _ = Cut::Unreachable.words();
    }
}
