// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/pow.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the proof-of-work hash seam used by the mining workers,
// located in the core subdirectory. Workers only rely on the input/output
// contract: arbitrary bytes in, 32-byte digest out.
//
// Tree Location:
// - src/core/pow.rs (hash function trait and algorithm selection)
// - Depends on: core::sha256, core::sha3x

use crate::core::error::MinerError;
use crate::core::sha256::Sha256d;
use crate::core::sha3x::Sha3x;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Opaque proof-of-work hash function.
///
/// Implementations must be pure: identical input always yields the
/// identical digest. They are shared by every worker thread.
pub trait PowHash: Send + Sync {
    /// Hash arbitrary bytes into a 32-byte digest
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// Short algorithm name for logs
    fn name(&self) -> &'static str;
}

/// Bundled hash algorithms selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha256d,
    Sha3x,
}

impl Algorithm {
    /// Build the shared hasher for this algorithm
    pub fn hasher(self) -> Arc<dyn PowHash> {
        match self {
            Algorithm::Sha256d => Arc::new(Sha256d),
            Algorithm::Sha3x => Arc::new(Sha3x),
        }
    }
}

impl FromStr for Algorithm {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256d" | "sha256" => Ok(Algorithm::Sha256d),
            "sha3x" => Ok(Algorithm::Sha3x),
            other => Err(MinerError::Config(format!("unknown algorithm: {}", other))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Sha256d => write!(f, "sha256d"),
            Algorithm::Sha3x => write!(f, "sha3x"),
        }
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Introduced the PowHash trait.
//   - Workers hash through Arc<dyn PowHash> so the algorithm is pluggable.
//   - Algorithm moved here from core/types.rs with FromStr/Display for CLI use.
