// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChallengeError, ChallengeSegment, Cut, DisputeOps, DivergenceInfo, OneStepData};
use alder_execution::{extend_inbox_acc, InboxLookup};
use alder_ledger::ChallengeKind;
use ethereum_types::H256;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use std::sync::Arc;

/// Inbox-delta dispute computation. Offsets count messages walking backward
/// from the disputed node's final inbox position: at offset `o` the cut
/// pairs the inbox accumulator over the first `count - o` messages with the
/// delta accumulator over the last `o`. One offset step is one message, so
/// the base-case proof is a single delivered message, not a VM opcode.
pub struct InboxDeltaDispute<L> {
    lookup: Arc<L>,
    node_after_inbox_count: BigUint,
    /// `delta_accs[o]` accumulates the last `o` messages before
    /// `node_after_inbox_count`, precomputed once per challenge.
    delta_accs: Vec<H256>,
    segment_target: u64,
}

impl<L: InboxLookup> InboxDeltaDispute<L> {
    /// Dispute computation whose claimed deltas are derived from `lookup`
    /// itself, the honest party's position.
    pub fn new(
        lookup: Arc<L>,
        node_after_inbox_count: BigUint,
        max_offset: u64,
        segment_target: u64,
    ) -> Result<Self, ChallengeError> {
        let delta_accs = Self::delta_accumulators(&lookup, &node_after_inbox_count, max_offset)?;
        Self::with_claimed_deltas(
            lookup,
            node_after_inbox_count,
            delta_accs,
            segment_target,
        )
    }

    /// Dispute computation for a party whose claimed deltas were computed
    /// elsewhere (from the node under challenge). The inbox accumulator side
    /// of every cut still comes from `lookup`, the shared on-chain inbox.
    pub fn with_claimed_deltas(
        lookup: Arc<L>,
        node_after_inbox_count: BigUint,
        delta_accs: Vec<H256>,
        segment_target: u64,
    ) -> Result<Self, ChallengeError> {
        if BigUint::from(delta_accs.len() as u64) > &node_after_inbox_count + BigUint::one() {
            return Err(ChallengeError::ProtocolViolation(format!(
                "inbox delta over {} messages but the node consumed only {}",
                delta_accs.len() - 1,
                node_after_inbox_count,
            )));
        }
        Ok(Self {
            lookup,
            node_after_inbox_count,
            delta_accs,
            segment_target,
        })
    }

    /// Accumulators over the last `0..=max_offset` messages before
    /// `after_count`, chained newest-first.
    pub fn delta_accumulators(
        lookup: &L,
        after_count: &BigUint,
        max_offset: u64,
    ) -> Result<Vec<H256>, ChallengeError> {
        if BigUint::from(max_offset) > *after_count {
            return Err(ChallengeError::ProtocolViolation(format!(
                "inbox delta over {} messages but the node consumed only {}",
                max_offset, after_count,
            )));
        }
        let mut delta_accs = Vec::with_capacity(max_offset as usize + 1);
        delta_accs.push(H256::zero());
        for offset in 1..=max_offset {
            let index = after_count - BigUint::from(offset);
            let message = lookup.message(&index)?;
            let prev = delta_accs[offset as usize - 1];
            delta_accs.push(extend_inbox_acc(prev, &message));
        }
        Ok(delta_accs)
    }

    fn cut_at(&self, offset: &BigUint) -> Result<Cut, ChallengeError> {
        let index = offset
            .to_usize()
            .filter(|i| *i < self.delta_accs.len())
            .ok_or_else(|| {
                ChallengeError::ProtocolViolation(format!(
                    "inbox delta offset {} beyond the challenged range",
                    offset,
                ))
            })?;
        let inbox_count = &self.node_after_inbox_count - offset;
        let inbox_acc = self.lookup.inbox_acc(&inbox_count)?;
        Ok(Cut::InboxDelta {
            inbox_acc,
            delta_acc: self.delta_accs[index],
        })
    }
}

impl<L: InboxLookup + Send + Sync + 'static> DisputeOps for InboxDeltaDispute<L> {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::InboxDelta
    }

    fn segment_target(&self) -> u64 {
        self.segment_target
    }

    fn cuts(&self, offsets: &[BigUint]) -> Result<Vec<Cut>, ChallengeError> {
        offsets.iter().map(|offset| self.cut_at(offset)).collect()
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
        for (i, offset) in offsets.iter().enumerate() {
            let local_cut = self.cut_at(offset)?;
            if local_cut.hash() != their_hashes[i] {
                if i == 0 {
                    return Err(ChallengeError::ProtocolViolation(
                        "bisection diverges at the agreed segment start".into(),
                    ));
                }
                return Ok(DivergenceInfo {
                    different_index: i as u64 - 1,
                    segment_steps: offset - &offsets[i - 1],
                    end_is_unreachable: false,
                    local_cut,
                });
            }
        }
        Err(ChallengeError::NoDivergence)
    }

    fn segment_steps(&self, segment: &ChallengeSegment) -> Result<BigUint, ChallengeError> {
        // One message per offset step.
        Ok(segment.length.clone())
    }

    fn one_step_data(&self, segment: &ChallengeSegment) -> Result<OneStepData, ChallengeError> {
        let pre_cut = self.cut_at(&segment.start)?;
        let index = &self.node_after_inbox_count - &segment.start - BigUint::one();
        let message = self.lookup.message(&index)?;
        Ok(OneStepData {
            pre_cut,
            proof: message.data,
            buffer_proof: Vec::new(),
            opcode: 0,
        })
    }

    fn segment_start_cut(&self, segment: &ChallengeSegment) -> Result<Cut, ChallengeError> {
        self.cut_at(&segment.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_execution::testing::VecInbox;

    fn dispute(inbox: VecInbox, after: u64, max: u64) -> InboxDeltaDispute<VecInbox> {
        InboxDeltaDispute::new(Arc::new(inbox), BigUint::from(after), max, 250).unwrap()
    }

    fn offsets(raw: &[u64]) -> Vec<BigUint> {
        raw.iter().map(|v| BigUint::from(*v)).collect()
    }

    #[test]
    fn honest_parties_agree_on_every_offset() {
        let a = dispute(VecInbox::generate(300, 3), 300, 250);
        let b = dispute(VecInbox::generate(300, 3), 300, 250);
        for offset in offsets(&[0, 1, 100, 250]) {
            assert_eq!(
                a.cut_at(&offset).unwrap().hash(),
                b.cut_at(&offset).unwrap().hash()
            );
        }
    }

    #[test]
    fn corrupted_claim_is_located_minimally() {
        let honest = dispute(VecInbox::generate(300, 3), 300, 250);
        // The faulty party claims deltas derived from a corrupted message 5
        // from the end: delta accumulators with offset >= 5 cover it. Both
        // parties read the same on-chain inbox accumulators.
        let claimed = InboxDeltaDispute::delta_accumulators(
            &VecInbox::generate(300, 3).corrupt(295),
            &BigUint::from(300u64),
            250,
        )
        .unwrap();
        let faulty = InboxDeltaDispute::with_claimed_deltas(
            Arc::new(VecInbox::generate(300, 3)),
            BigUint::from(300u64),
            claimed,
            250,
        )
        .unwrap();

        let offsets = offsets(&[0, 2, 4, 6, 8, 10]);
        let their_hashes: Vec<_> = faulty
            .cuts(&offsets)
            .unwrap()
            .iter()
            .map(Cut::hash)
            .collect();
        let info = honest
            .find_first_divergence(&offsets, &their_hashes)
            .unwrap();
        // Boundary at offset 6 is the first covering the corrupt message.
        assert_eq!(info.different_index, 2);
        assert_eq!(info.segment_steps, BigUint::from(2u8));
        assert!(!info.end_is_unreachable);
    }

    #[test]
    fn one_step_proof_is_the_delivered_message() {
        let inbox = VecInbox::generate(300, 3);
        let d = dispute(inbox.clone(), 300, 250);
        let segment = ChallengeSegment::new(BigUint::from(4u8), BigUint::from(1u8));

        let data = d.one_step_data(&segment).unwrap();
        // Offset 4 disputes the message 5 from the end: index 295.
        assert_eq!(
            data.proof,
            inbox.message(&BigUint::from(295u64)).unwrap().data
        );
        assert!(data.buffer_proof.is_empty());
    }

    #[test]
    fn range_overruns_are_protocol_violations() {
        assert!(matches!(
            InboxDeltaDispute::new(
                Arc::new(VecInbox::generate(10, 1)),
                BigUint::from(10u8),
                20,
                250,
            ),
            Err(ChallengeError::ProtocolViolation(_))
        ));

        let d = dispute(VecInbox::generate(300, 3), 300, 250);
        assert!(matches!(
            d.cut_at(&BigUint::from(251u64)),
            Err(ChallengeError::ProtocolViolation(_))
        ));
    }
}
