// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use alder_encoding::keccak_words;
use alder_execution::ExecutionState;
use ethereum_types::H256;
use serde::{Deserialize, Serialize};

/// Wire hash of the [`Cut::Unreachable`] sentinel: the all-zero word, which
/// no Keccak output of a real state collides with. In memory the sentinel is
/// its own variant so equality against it is type-checked, never
/// data-dependent; the constant exists only for comparing against hashes a
/// counterparty posted.
pub const UNREACHABLE_CUT_HASH: H256 = H256([0u8; 32]);

/// A cryptographic summary of one party's computation at a gas offset. Two
/// parties agree at an offset exactly when their cut hashes are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cut {
    /// Machine state the execution actually reached.
    Execution(ExecutionState),
    /// Inbox accumulator pair for inbox-delta disputes.
    InboxDelta { inbox_acc: H256, delta_acc: H256 },
    /// Execution could not reach this offset under the declared bounds,
    /// either because the machine blocked or because it would have read
    /// more messages than the assertion allows.
    Unreachable,
}

impl Cut {
    /// The 32-byte digest the judge compares. Serialisation per variant is
    /// fixed by the judge's contract.
    pub fn hash(&self) -> H256 {
        match self {
            Cut::Execution(state) => state.hash(),
            Cut::InboxDelta {
                inbox_acc,
                delta_acc,
            } => keccak_words(&[*inbox_acc, *delta_acc]),
            Cut::Unreachable => UNREACHABLE_CUT_HASH,
        }
    }

    /// The word tuple the judge reconstructs the cut from before hashing.
    pub fn words(&self) -> Vec<H256> {
        match self {
            Cut::Execution(state) => {
                // The counters are machine-produced and fit a word.
                state
                    .words()
                    .expect("machine counters exceed 256 bits")
                    .to_vec()
            }
            Cut::InboxDelta {
                inbox_acc,
                delta_acc,
            } => vec![*inbox_acc, *delta_acc],
            Cut::Unreachable => Vec::new(),
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Cut::Unreachable)
    }

    pub fn execution_state(&self) -> Option<&ExecutionState> {
        match self {
            Cut::Execution(state) => Some(state),
            _ => None,
        }
    }
}
