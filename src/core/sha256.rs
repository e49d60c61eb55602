// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/sha256.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements SHA256d (double SHA-256) as a PowHash, located in the
// core subdirectory.

use crate::core::pow::PowHash;
use sha2::{Digest, Sha256};

/// Double SHA-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256d;

pub fn sha256d_hash(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

impl PowHash for Sha256d {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        sha256d_hash(data)
    }

    fn name(&self) -> &'static str {
        "sha256d"
    }
}


// Changelog:
// - v1.1.0 (2025-07-02): Generalized to arbitrary input.
//   - Dropped the fixed 80-byte header check and the 4-nonce batch helper;
//     coinbase and merkle hashing go through the same function.
//   - Implements PowHash for the worker pool.
// - v1.0.4 (2025-06-18): Fixed type mismatches and compilation errors.
