// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{ChallengeError, ChallengeSegment, Cut};
use alder_ledger::ChallengeKind;
use ethereum_types::H256;
use num_bigint::BigUint;

/// Where the local replay first disagrees with a counterparty's bisection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceInfo {
    /// Index of the first sub-segment whose end cut disagrees. Minimal over
    /// the bisection: every earlier boundary matched.
    pub different_index: u64,
    /// Micro-steps the local replay executes across that sub-segment, the
    /// tie-breaker deciding whether it can be bisected further.
    pub segment_steps: BigUint,
    /// Whether the local replay declares that sub-segment's end unreachable.
    pub end_is_unreachable: bool,
    /// The local cut at the divergent boundary, posted alongside the choice.
    pub local_cut: Cut,
}

/// Material for the judge's base-case verification of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneStepData {
    /// The local cut at the disputed segment's start.
    pub pre_cut: Cut,
    pub proof: Vec<u8>,
    pub buffer_proof: Vec<u8>,
    pub opcode: u8,
}

/// Kind-specific computation one party runs locally to drive a dispute:
/// producing cuts for a bisection, locating the first divergence in the
/// opponent's, and assembling base-case proofs. Implementations exist per
/// [`ChallengeKind`]; the game engine is agnostic of the kind behind it.
pub trait DisputeOps: Send {
    fn kind(&self) -> ChallengeKind;

    /// Sub-segments one bisection round divides a segment into.
    fn segment_target(&self) -> u64;

    /// One cut per offset, offsets ascending. Fails fast with
    /// [`ChallengeError::FirstCutUnreachable`] when the first offset is not
    /// a real state: a segment whose start is already unreachable is a
    /// caller bug.
    fn cuts(&self, offsets: &[BigUint]) -> Result<Vec<Cut>, ChallengeError>;

    /// Locates the first divergence between the local replay and
    /// `their_hashes`, the counterparty's cut hashes at `offsets`. Errors
    /// with [`ChallengeError::NoDivergence`] when every hash agrees.
    fn find_first_divergence(
        &self,
        offsets: &[BigUint],
        their_hashes: &[H256],
    ) -> Result<DivergenceInfo, ChallengeError>;

    /// Micro-steps the local replay executes across `segment`.
    fn segment_steps(&self, segment: &ChallengeSegment) -> Result<BigUint, ChallengeError>;

    /// Base-case proof material for the step at `segment`'s start.
    fn one_step_data(&self, segment: &ChallengeSegment) -> Result<OneStepData, ChallengeError>;

    /// The local cut at `segment`'s start, posted when proving that
    /// execution continues past a boundary the opponent declared
    /// unreachable.
    fn segment_start_cut(&self, segment: &ChallengeSegment) -> Result<Cut, ChallengeError>;
}
