// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChallengeError, ChallengeSegment, Cut, DisputeOps, DivergenceInfo, OneStepData};
use alder_execution::{Assertion, ExecutionTracker, Machine};
use alder_ledger::ChallengeKind;
use ethereum_types::H256;
use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;

/// Execution-kind dispute computation. Owns a pristine machine at the
/// assertion's pre-state and replays a clone of it for every query, so the
/// unreachable policy is re-derived from scratch each round.
pub struct ExecutionDispute<M> {
    machine: M,
    assertion: Assertion,
    segment_target: u64,
}

impl<M: Machine> ExecutionDispute<M> {
    /// `machine` must stand at the assertion's pre-state.
    pub fn new(machine: M, assertion: Assertion, segment_target: u64) -> Self {
        Self {
            machine,
            assertion,
            segment_target,
        }
    }

    /// Applies the unreachable policy to one tracker query: execution that
    /// read past the assertion's message bound, or blocked short of the
    /// offset, should have stopped short, so the offset is unreachable.
    fn cut_at(
        &self,
        tracker: &mut ExecutionTracker<M>,
        offset: &BigUint,
    ) -> Result<(Cut, BigUint), ChallengeError> {
        let (state, steps) = tracker.execution_state_at(offset)?;
        if state.total_messages_read > *self.assertion.max_total_messages_read()
            || state.total_gas_consumed < *offset
        {
            return Ok((Cut::Unreachable, steps));
        }
        Ok((Cut::Execution(state), steps))
    }

    /// The machine and cut at a segment's start. Errors if the start is not
    /// a real state: one-step proving a blocked machine is a caller bug.
    fn segment_start_info(
        &self,
        segment: &ChallengeSegment,
    ) -> Result<(Cut, M), ChallengeError> {
        let targets = [segment.start.clone()];
        let mut tracker = ExecutionTracker::new(self.machine.clone(), &targets, true);
        let (cut, _) = self.cut_at(&mut tracker, &segment.start)?;
        if cut.is_unreachable() {
            return Err(ChallengeError::FirstCutUnreachable);
        }
        let machine = tracker.machine_at(&segment.start)?;
        Ok((cut, (*machine).clone()))
    }
}

impl<M: Machine> DisputeOps for ExecutionDispute<M> {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::Execution
    }

    fn segment_target(&self) -> u64 {
        self.segment_target
    }

    fn cuts(&self, offsets: &[BigUint]) -> Result<Vec<Cut>, ChallengeError> {
        let mut tracker = ExecutionTracker::new(self.machine.clone(), offsets, false);
        let mut cuts = Vec::with_capacity(offsets.len());
        for (i, offset) in offsets.iter().enumerate() {
            let (cut, _) = self.cut_at(&mut tracker, offset)?;
            if i == 0 && cut.is_unreachable() {
                return Err(ChallengeError::FirstCutUnreachable);
            }
            cuts.push(cut);
        }
        Ok(cuts)
    }

    fn find_first_divergence(
        &self,
        offsets: &[BigUint],
        their_hashes: &[H256],
    ) -> Result<DivergenceInfo, ChallengeError> {
        if offsets.len() != their_hashes.len() {
            return Err(ChallengeError::ProtocolViolation(format!(
                "{} cut hashes posted for {} offsets",
                their_hashes.len(),
                offsets.len(),
            )));
        }
        let mut tracker = ExecutionTracker::new(self.machine.clone(), offsets, false);
        let mut last_steps = BigUint::zero();
        for (i, offset) in offsets.iter().enumerate() {
            let (local_cut, steps) = self.cut_at(&mut tracker, offset)?;
            if local_cut.hash() != their_hashes[i] {
                if i == 0 {
                    return Err(ChallengeError::ProtocolViolation(
                        "bisection diverges at the agreed segment start".into(),
                    ));
                }
                debug!(
                    "Divergent cut at offset {} (boundary {} of {})",
                    offset,
                    i,
                    offsets.len() - 1,
                );
                return Ok(DivergenceInfo {
                    different_index: i as u64 - 1,
                    segment_steps: steps - last_steps,
                    end_is_unreachable: local_cut.is_unreachable(),
                    local_cut,
                });
            }
            last_steps = steps;
        }
        Err(ChallengeError::NoDivergence)
    }

    fn segment_steps(&self, segment: &ChallengeSegment) -> Result<BigUint, ChallengeError> {
        let targets = [segment.start.clone(), segment.end()];
        let mut tracker = ExecutionTracker::new(self.machine.clone(), &targets, false);
        let (_, start_steps) = tracker.execution_state_at(&segment.start)?;
        let (_, end_steps) = tracker.execution_state_at(&segment.end())?;
        Ok(end_steps - start_steps)
    }

    fn one_step_data(&self, segment: &ChallengeSegment) -> Result<OneStepData, ChallengeError> {
        let (pre_cut, machine) = self.segment_start_info(segment)?;
        let proof = machine.marshal_for_proof()?;
        let opcode = proof.opcode()?;
        Ok(OneStepData {
            pre_cut,
            proof: proof.proof,
            buffer_proof: proof.buffer_proof,
            opcode,
        })
    }

    fn segment_start_cut(&self, segment: &ChallengeSegment) -> Result<Cut, ChallengeError> {
        let (cut, _) = self.segment_start_info(segment)?;
        Ok(cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_execution::testing::{CountingMachine, FaultyMachine};
    use alder_execution::ExecutionState;

    fn assertion_for(machine: &CountingMachine, gas: u64) -> Assertion {
        let mut post = machine.clone();
        while post.total_gas_consumed() < BigUint::from(gas) {
            if post.step_once().is_none() {
                break;
            }
        }
        Assertion::new(
            ExecutionState::from_machine(machine),
            ExecutionState::from_machine(&post),
        )
    }

    fn offsets(raw: &[u64]) -> Vec<BigUint> {
        raw.iter().map(|v| BigUint::from(*v)).collect()
    }

    #[test]
    fn cuts_agree_between_honest_parties() {
        let machine = CountingMachine::with_defaults();
        let assertion = assertion_for(&machine, 4_000);
        let a = ExecutionDispute::new(machine.clone(), assertion.clone(), 400);
        let b = ExecutionDispute::new(machine, assertion, 400);

        let offsets = offsets(&[0, 1_000, 2_000, 3_000, 4_000]);
        let cuts_a = a.cuts(&offsets).unwrap();
        let cuts_b = b.cuts(&offsets).unwrap();
        let hashes_a: Vec<_> = cuts_a.iter().map(Cut::hash).collect();
        let hashes_b: Vec<_> = cuts_b.iter().map(Cut::hash).collect();
        assert_eq!(hashes_a, hashes_b);
    }

    #[test]
    fn divergence_is_minimal_against_a_faulty_machine() {
        let machine = CountingMachine::with_defaults();
        let assertion = assertion_for(&machine, 4_000);
        let honest = ExecutionDispute::new(machine.clone(), assertion.clone(), 400);
        let faulty = ExecutionDispute::new(
            FaultyMachine::new(machine, 2_500),
            assertion,
            400,
        );

        let offsets = offsets(&[0, 1_000, 2_000, 3_000, 4_000]);
        let their_hashes: Vec<_> = faulty
            .cuts(&offsets)
            .unwrap()
            .iter()
            .map(Cut::hash)
            .collect();

        let info = honest
            .find_first_divergence(&offsets, &their_hashes)
            .unwrap();
        // Boundaries 0..=2 agree (fault triggers past gas 2500), boundary 3
        // diverges, so sub-segment 2 is the first disputed one.
        assert_eq!(info.different_index, 2);
        assert!(!info.end_is_unreachable);
        assert!(info.segment_steps > BigUint::zero());
    }

    #[test]
    fn agreement_everywhere_is_a_caller_bug() {
        let machine = CountingMachine::with_defaults();
        let assertion = assertion_for(&machine, 2_000);
        let dispute = ExecutionDispute::new(machine, assertion, 400);

        let offsets = offsets(&[0, 1_000, 2_000]);
        let hashes: Vec<_> = dispute
            .cuts(&offsets)
            .unwrap()
            .iter()
            .map(Cut::hash)
            .collect();
        assert!(matches!(
            dispute.find_first_divergence(&offsets, &hashes),
            Err(ChallengeError::NoDivergence)
        ));
    }

    #[test]
    fn message_bound_makes_later_offsets_unreachable() {
        // The machine reads one message every 4 steps of 10 gas; an
        // assertion bound of 2 messages is exhausted within ~80 gas.
        let machine = CountingMachine::new(10, 4, 1_000, u64::MAX);
        let mut post = machine.clone();
        for _ in 0..6 {
            post.step_once().unwrap();
        }
        let assertion = Assertion::new(
            ExecutionState::from_machine(&machine),
            ExecutionState::from_machine(&post),
        );
        let dispute = ExecutionDispute::new(machine, assertion, 400);

        let cuts = dispute.cuts(&offsets(&[0, 40, 400])).unwrap();
        assert!(!cuts[0].is_unreachable());
        assert!(cuts[2].is_unreachable());
    }

    #[test]
    fn blocked_machine_yields_unreachable_cuts() {
        let machine = CountingMachine::new(10, 0, 0, 10);
        let assertion = assertion_for(&machine, 100);
        let dispute = ExecutionDispute::new(machine, assertion, 400);

        let cuts = dispute.cuts(&offsets(&[0, 50, 500])).unwrap();
        assert!(!cuts[1].is_unreachable());
        assert!(cuts[2].is_unreachable());
    }

    #[test]
    fn unreachable_first_cut_fails_fast() {
        let machine = CountingMachine::new(10, 0, 0, 10);
        let assertion = assertion_for(&machine, 100);
        let dispute = ExecutionDispute::new(machine, assertion, 400);

        assert!(matches!(
            dispute.cuts(&offsets(&[500, 600])),
            Err(ChallengeError::FirstCutUnreachable)
        ));
        assert!(matches!(
            dispute.one_step_data(&ChallengeSegment::new(
                BigUint::from(500u64),
                BigUint::from(1u8),
            )),
            Err(ChallengeError::FirstCutUnreachable)
        ));
    }

    #[test]
    fn one_step_data_carries_the_machine_witness() {
        let machine = CountingMachine::with_defaults();
        let assertion = assertion_for(&machine, 1_000);
        let dispute = ExecutionDispute::new(machine, assertion, 400);

        let segment = ChallengeSegment::new(BigUint::from(500u64), BigUint::from(1u8));
        let data = dispute.one_step_data(&segment).unwrap();
        assert_eq!(data.opcode, data.proof[0]);
        assert!(!data.pre_cut.is_unreachable());
    }
}
