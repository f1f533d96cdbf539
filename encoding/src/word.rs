// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use ethereum_types::H256;
use num_bigint::BigUint;

/// Packs an arbitrary-precision unsigned integer into a 32-byte big-endian
/// word, the representation the judge hashes for every numeric tuple field.
pub fn word_from_biguint(value: &BigUint) -> Result<H256, Error> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(Error::WordOverflow);
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(H256(word))
}

/// Packs a `u64` into a 32-byte big-endian word.
pub fn word_from_u64(value: u64) -> H256 {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    H256(word)
}

/// Reads a 32-byte big-endian word back into an arbitrary-precision integer.
pub fn biguint_from_word(word: &H256) -> BigUint {
    BigUint::from_bytes_be(word.as_bytes())
}
