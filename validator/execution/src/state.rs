// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Error, Machine};
use alder_encoding::{keccak_words, word_from_biguint};
use ethereum_types::H256;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// The five-field machine summary the judge hashes. Its on-wire form is
/// fixed by the judge's contract: each field as a 32-byte big-endian word,
/// concatenated in declaration order, then Keccak-256.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub machine_hash: H256,
    pub total_messages_read: BigUint,
    pub total_gas_consumed: BigUint,
    pub total_send_acc: H256,
    pub total_log_acc: H256,
}

impl ExecutionState {
    /// Summarizes a machine at its current position.
    pub fn from_machine<M: Machine>(machine: &M) -> Self {
        Self {
            machine_hash: machine.hash(),
            total_messages_read: machine.total_messages_read(),
            total_gas_consumed: machine.total_gas_consumed(),
            total_send_acc: machine.send_acc(),
            total_log_acc: machine.log_acc(),
        }
    }

    /// The judge's 5-word tuple form.
    pub fn words(&self) -> Result<[H256; 5], Error> {
        Ok([
            self.machine_hash,
            word_from_biguint(&self.total_messages_read)
                .map_err(|e| Error::Proof(e.to_string()))?,
            word_from_biguint(&self.total_gas_consumed)
                .map_err(|e| Error::Proof(e.to_string()))?,
            self.total_send_acc,
            self.total_log_acc,
        ])
    }

    /// Digest the judge compares cut commitments against.
    pub fn hash(&self) -> H256 {
        // The counters are always machine-produced and fit a word.
        let words = self.words().expect("machine counters exceed 256 bits");
        keccak_words(&words)
    }
}
