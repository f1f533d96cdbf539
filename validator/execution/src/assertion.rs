// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::ExecutionState;
use alder_encoding::Cbor;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// An immutable claim that, starting from `before`, the machine reaches
/// `after` while consuming at most the message and gas bounds visible in the
/// two states. Challenges dispute exactly one assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub before: ExecutionState,
    pub after: ExecutionState,
}

impl Assertion {
    pub fn new(before: ExecutionState, after: ExecutionState) -> Self {
        Self { before, after }
    }

    /// Gas the assertion claims the machine consumed.
    pub fn gas_used(&self) -> BigUint {
        &self.after.total_gas_consumed - &self.before.total_gas_consumed
    }

    /// Messages the assertion claims the machine read.
    pub fn messages_read(&self) -> BigUint {
        &self.after.total_messages_read - &self.before.total_messages_read
    }

    /// The message-consumption bound execution may not exceed. Reading past
    /// it means the assertion should have stopped short, which makes every
    /// later offset unreachable.
    pub fn max_total_messages_read(&self) -> &BigUint {
        &self.after.total_messages_read
    }
}

impl Cbor for Assertion {}
