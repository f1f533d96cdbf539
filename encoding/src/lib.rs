// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod cbor;
mod errors;
mod hash;
mod word;

pub use cbor::Cbor;
pub use errors::Error;
pub use hash::{keccak_256, keccak_words};
pub use word::{biguint_from_word, word_from_biguint, word_from_u64};
