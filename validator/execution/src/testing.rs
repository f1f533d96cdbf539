// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Deterministic machine and inbox doubles used across the dispute core's
//! test suites. None of this is gated behind `cfg(test)` so that dependent
//! crates can drive full games against it.

use crate::{extend_inbox_acc, InboxLookup, InboxMessage, Machine, MachineProof};
use crate::{Error, ExecutionState};
use alder_encoding::{keccak_256, word_from_u64};
use ethereum_types::H256;
use num_bigint::BigUint;

/// A toy VM whose state is a counter advanced by a fixed linear-congruential
/// rule. Per-step gas varies with the counter, instructions are atomic, and
/// the machine reads one inbox message every `read_interval` steps, so it
/// exercises overshoot, message bounds, and blocking exactly like a real VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountingMachine {
    counter: u64,
    gas: u64,
    steps: u64,
    messages_read: u64,
    log_acc: H256,
    send_acc: H256,
    gas_per_step: u64,
    gas_spread: u64,
    read_interval: u64,
    inbox_messages: u64,
    max_steps: u64,
}

impl CountingMachine {
    /// Fixed-gas machine: every step costs exactly `gas_per_step`.
    pub fn new(gas_per_step: u64, read_interval: u64, inbox_messages: u64, max_steps: u64) -> Self {
        Self {
            counter: 0,
            gas: 0,
            steps: 0,
            messages_read: 0,
            log_acc: H256::zero(),
            send_acc: H256::zero(),
            gas_per_step,
            gas_spread: 0,
            read_interval,
            inbox_messages,
            max_steps,
        }
    }

    /// A long-running machine with uneven per-step gas and a large inbox.
    pub fn with_defaults() -> Self {
        let mut machine = Self::new(3, 7, 1_000_000, u64::MAX);
        machine.gas_spread = 4;
        machine
    }

    /// Caps the number of steps the machine executes before halting. A lower
    /// cap than the honest one models a party whose execution stops short.
    pub fn with_step_limit(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState::from_machine(self)
    }

    fn absorb(acc: H256, value: u64) -> H256 {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(acc.as_bytes());
        buf.extend_from_slice(word_from_u64(value).as_bytes());
        keccak_256(&buf)
    }
}

impl Machine for CountingMachine {
    fn step_once(&mut self) -> Option<u64> {
        if self.steps >= self.max_steps {
            return None;
        }
        if self.read_interval > 0 && self.steps % self.read_interval == 0 {
            if self.messages_read >= self.inbox_messages {
                return None;
            }
            self.messages_read += 1;
        }
        self.steps += 1;
        self.counter = self
            .counter
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.log_acc = Self::absorb(self.log_acc, self.counter);
        if self.counter % 5 == 0 {
            self.send_acc = Self::absorb(self.send_acc, self.counter);
        }
        let gas = self.gas_per_step
            + if self.gas_spread > 0 {
                self.counter % (self.gas_spread + 1)
            } else {
                0
            };
        self.gas += gas;
        Some(gas)
    }

    fn hash(&self) -> H256 {
        keccak_256(
            &[
                word_from_u64(self.counter),
                word_from_u64(self.steps),
                word_from_u64(self.messages_read),
                word_from_u64(self.gas),
                self.log_acc,
                self.send_acc,
            ]
            .iter()
            .flat_map(|w| w.as_bytes().to_vec())
            .collect::<Vec<_>>(),
        )
    }

    fn total_gas_consumed(&self) -> BigUint {
        BigUint::from(self.gas)
    }

    fn total_messages_read(&self) -> BigUint {
        BigUint::from(self.messages_read)
    }

    fn send_acc(&self) -> H256 {
        self.send_acc
    }

    fn log_acc(&self) -> H256 {
        self.log_acc
    }

    fn marshal_for_proof(&self) -> Result<MachineProof, Error> {
        let mut proof = vec![(self.counter & 0xff) as u8];
        proof.extend_from_slice(self.hash().as_bytes());
        Ok(MachineProof {
            proof,
            buffer_proof: self.counter.to_be_bytes().to_vec(),
        })
    }
}

/// Wraps a machine and corrupts its reported hash once consumed gas reaches
/// `fault_gas`, emulating a party whose execution silently diverged.
#[derive(Debug, Clone)]
pub struct FaultyMachine<M> {
    inner: M,
    fault_gas: u64,
}

impl<M: Machine> FaultyMachine<M> {
    pub fn new(inner: M, fault_gas: u64) -> Self {
        Self { inner, fault_gas }
    }

    fn faulted(&self) -> bool {
        self.inner.total_gas_consumed() >= BigUint::from(self.fault_gas)
    }
}

impl<M: Machine> Machine for FaultyMachine<M> {
    fn step_once(&mut self) -> Option<u64> {
        self.inner.step_once()
    }

    fn hash(&self) -> H256 {
        let hash = self.inner.hash();
        if self.faulted() {
            let mut buf = hash.as_bytes().to_vec();
            buf.push(0xff);
            keccak_256(&buf)
        } else {
            hash
        }
    }

    fn total_gas_consumed(&self) -> BigUint {
        self.inner.total_gas_consumed()
    }

    fn total_messages_read(&self) -> BigUint {
        self.inner.total_messages_read()
    }

    fn send_acc(&self) -> H256 {
        self.inner.send_acc()
    }

    fn log_acc(&self) -> H256 {
        self.inner.log_acc()
    }

    fn marshal_for_proof(&self) -> Result<MachineProof, Error> {
        self.inner.marshal_for_proof()
    }
}

/// In-memory inbox with precomputed accumulators.
#[derive(Debug, Clone)]
pub struct VecInbox {
    messages: Vec<InboxMessage>,
    accs: Vec<H256>,
}

impl VecInbox {
    pub fn new(payloads: Vec<Vec<u8>>) -> Self {
        let messages: Vec<_> = payloads.into_iter().map(InboxMessage::new).collect();
        let mut accs = Vec::with_capacity(messages.len() + 1);
        accs.push(H256::zero());
        for message in &messages {
            let prev = *accs.last().expect("accs is never empty");
            accs.push(extend_inbox_acc(prev, message));
        }
        Self { messages, accs }
    }

    /// An inbox of `count` single-byte messages derived from `seed`.
    pub fn generate(count: u64, seed: u8) -> Self {
        Self::new(
            (0..count)
                .map(|i| vec![seed, (i % 251) as u8, (i / 251) as u8])
                .collect(),
        )
    }

    /// Replaces one message's payload, yielding an inbox that disagrees with
    /// the original from `index` onward.
    pub fn corrupt(mut self, index: usize) -> Self {
        let mut payloads: Vec<_> = self.messages.drain(..).map(|m| m.data).collect();
        payloads[index].push(0xff);
        Self::new(payloads)
    }
}

impl InboxLookup for VecInbox {
    fn inbox_acc(&self, count: &BigUint) -> Result<H256, Error> {
        let count_idx =
            usize::try_from(count.clone()).map_err(|_| Error::InboxAccumulator(count.clone()))?;
        self.accs
            .get(count_idx)
            .copied()
            .ok_or_else(|| Error::InboxAccumulator(count.clone()))
    }

    fn message(&self, index: &BigUint) -> Result<InboxMessage, Error> {
        let idx = usize::try_from(index.clone()).map_err(|_| Error::InboxIndex(index.clone()))?;
        self.messages
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::InboxIndex(index.clone()))
    }

    fn message_count(&self) -> BigUint {
        BigUint::from(self.messages.len())
    }
}
