// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use ethereum_types::H256;
use num_bigint::BigUint;

/// Serialized witness of a machine, consumed by the judge's one-step
/// verifier. `proof` starts with the opcode about to execute; `buffer_proof`
/// carries any buffer bytes the instruction prefetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineProof {
    pub proof: Vec<u8>,
    pub buffer_proof: Vec<u8>,
}

impl MachineProof {
    pub fn opcode(&self) -> Result<u8, Error> {
        self.proof
            .first()
            .copied()
            .ok_or_else(|| Error::Proof("empty proof data".into()))
    }
}

/// Capability surface the dispute core requires from the deterministic VM.
///
/// A machine is a pure function of its own state and the inbox it was loaded
/// with: stepping performs no I/O and consults no clock, so two clones
/// stepped the same distance are bit-identical.
pub trait Machine: Clone + Send + Sync + 'static {
    /// Executes one instruction and returns the gas it consumed, or `None`
    /// when the machine cannot advance (halted, errored, or waiting on a
    /// message past the loaded inbox).
    fn step_once(&mut self) -> Option<u64>;

    /// Digest of the full machine state.
    fn hash(&self) -> H256;

    /// Gas consumed since the reference start state.
    fn total_gas_consumed(&self) -> BigUint;

    /// Messages consumed from the inbox since the reference start state.
    fn total_messages_read(&self) -> BigUint;

    /// Accumulator over every value the machine sent.
    fn send_acc(&self) -> H256;

    /// Accumulator over every log the machine emitted.
    fn log_acc(&self) -> H256;

    /// Serializes the machine for the judge's one-step verifier.
    fn marshal_for_proof(&self) -> Result<MachineProof, Error>;
}
