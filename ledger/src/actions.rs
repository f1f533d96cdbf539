// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use alder_encoding::{keccak_256, word_from_biguint, word_from_u64};
use ethereum_types::H256;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// An on-chain move in the bisection game. Each variant corresponds to one
/// judge method; [`ChallengeAction::calldata`] produces the exact byte string
/// the judge dispatches on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChallengeAction {
    /// Commit to interior cuts of the sub-segment chosen in the previous
    /// round (or of the initial segment in the first round).
    Bisect {
        prev_bisection_root: H256,
        segment_to_challenge: u64,
        segment_start: BigUint,
        segment_length: BigUint,
        sub_cuts: Vec<H256>,
    },
    /// Select the first divergent sub-segment of the opponent's bisection,
    /// committing to the local cut at its end boundary.
    ChooseSegment {
        prev_bisection_root: H256,
        segment_index: u64,
        sub_cuts: Vec<H256>,
    },
    /// Prove the disputed single step by serializing the machine at the
    /// segment start and letting the judge re-execute it.
    OneStepProof {
        pre_cut: Vec<H256>,
        proof: Vec<u8>,
        buffer_proof: Vec<u8>,
        opcode: u8,
    },
    /// Prove that execution steps past a boundary the opponent declared
    /// unreachable.
    ProveContinuedExecution {
        prev_bisection_root: H256,
        segment_index: u64,
        segment_start: BigUint,
        segment_length: BigUint,
        pre_cut: Vec<H256>,
    },
    /// Collect the win after the opponent missed its deadline.
    TimedOut { challenge_id: H256 },
}

impl ChallengeAction {
    /// The judge method this action invokes.
    pub fn method(&self) -> &'static str {
        match self {
            ChallengeAction::Bisect { .. } => "bisect",
            ChallengeAction::ChooseSegment { .. } => "chooseSegment",
            ChallengeAction::OneStepProof { .. } => "oneStepProof",
            ChallengeAction::ProveContinuedExecution { .. } => "proveContinuedExecution",
            ChallengeAction::TimedOut { .. } => "timedOut",
        }
    }

    /// Encodes the action for submission. Layout: a 4-byte method selector
    /// (leading bytes of the Keccak-256 of the signature), the static
    /// arguments as 32-byte words in declaration order, then each dynamic
    /// argument with a 32-byte length prefix, payloads padded to a word
    /// boundary.
    pub fn calldata(&self) -> Result<Vec<u8>, Error> {
        match self {
            ChallengeAction::Bisect {
                prev_bisection_root,
                segment_to_challenge,
                segment_start,
                segment_length,
                sub_cuts,
            } => {
                let mut data =
                    Calldata::new("bisect(bytes32,uint256,uint256,uint256,bytes32[])");
                data.word(*prev_bisection_root);
                data.word(word_from_u64(*segment_to_challenge));
                data.uint(segment_start)?;
                data.uint(segment_length)?;
                data.words(sub_cuts);
                Ok(data.finish())
            }
            ChallengeAction::ChooseSegment {
                prev_bisection_root,
                segment_index,
                sub_cuts,
            } => {
                let mut data = Calldata::new("chooseSegment(bytes32,uint256,bytes32[])");
                data.word(*prev_bisection_root);
                data.word(word_from_u64(*segment_index));
                data.words(sub_cuts);
                Ok(data.finish())
            }
            ChallengeAction::OneStepProof {
                pre_cut,
                proof,
                buffer_proof,
                opcode,
            } => {
                let mut data = Calldata::new("oneStepProof(bytes32[],bytes,bytes,uint8)");
                data.word(word_from_u64(u64::from(*opcode)));
                data.words(pre_cut);
                data.bytes(proof);
                data.bytes(buffer_proof);
                Ok(data.finish())
            }
            ChallengeAction::ProveContinuedExecution {
                prev_bisection_root,
                segment_index,
                segment_start,
                segment_length,
                pre_cut,
            } => {
                let mut data = Calldata::new(
                    "proveContinuedExecution(bytes32,uint256,uint256,uint256,bytes32[])",
                );
                data.word(*prev_bisection_root);
                data.word(word_from_u64(*segment_index));
                data.uint(segment_start)?;
                data.uint(segment_length)?;
                data.words(pre_cut);
                Ok(data.finish())
            }
            ChallengeAction::TimedOut { challenge_id } => {
                let mut data = Calldata::new("timedOut(bytes32)");
                data.word(*challenge_id);
                Ok(data.finish())
            }
        }
    }
}

/// Incremental calldata assembly. Static words go first; dynamic sections
/// are buffered and appended by [`Calldata::finish`] in push order.
struct Calldata {
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl Calldata {
    fn new(signature: &str) -> Self {
        let selector = keccak_256(signature.as_bytes());
        Self {
            head: selector.as_bytes()[..4].to_vec(),
            tail: Vec::new(),
        }
    }

    fn word(&mut self, word: H256) {
        self.head.extend_from_slice(word.as_bytes());
    }

    fn uint(&mut self, value: &BigUint) -> Result<(), Error> {
        let word = word_from_biguint(value)?;
        self.word(word);
        Ok(())
    }

    fn words(&mut self, words: &[H256]) {
        self.tail
            .extend_from_slice(word_from_u64(words.len() as u64).as_bytes());
        for word in words {
            self.tail.extend_from_slice(word.as_bytes());
        }
    }

    fn bytes(&mut self, payload: &[u8]) {
        self.tail
            .extend_from_slice(word_from_u64(payload.len() as u64).as_bytes());
        self.tail.extend_from_slice(payload);
        let trailing = payload.len() % 32;
        if trailing != 0 {
            self.tail.extend(std::iter::repeat(0u8).take(32 - trailing));
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.head.append(&mut self.tail);
        self.head
    }
}
