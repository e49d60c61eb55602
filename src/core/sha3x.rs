// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/sha3x.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the triple SHA3-256 hash as a PowHash, located in the
// core subdirectory.
//
// Tree Location:
// - src/core/sha3x.rs (triple SHA3-256)
// - Depends on: sha3 crate

use crate::core::pow::PowHash;
use sha3::{Digest, Sha3_256};

/// Triple SHA3-256
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha3x;

pub fn sha3x_hash(data: &[u8]) -> [u8; 32] {
    let hash1 = Sha3_256::digest(data);
    let hash2 = Sha3_256::digest(hash1);
    Sha3_256::digest(hash2).into()
}

impl PowHash for Sha3x {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        sha3x_hash(data)
    }

    fn name(&self) -> &'static str {
        "sha3x"
    }
}


// Changelog:
// - v1.1.0 (2025-07-02): Hash raw bytes instead of nonce||header||1.
//   - Header layout is now owned by the worker; this file only hashes.
// - v1.0.1 (2025-06-14): Added batch hashing optimization.
