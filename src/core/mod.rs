// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the core functionality of the
// miner, located in the core subdirectory. It declares submodules and
// re-exports key types for use throughout the project.

pub mod difficulty;
pub mod error;
pub mod pow;
pub mod sha256;
pub mod sha3x;
pub mod types;

// Re-export the most commonly used items
pub use difficulty::{Compact, TargetSource, U256, compute_target, hash_meets_target};
pub use error::MinerError;
pub use pow::{Algorithm, PowHash};
pub use types::{Args, Job, MinerConfig, PartitionPolicy, SessionParams, Share};

// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 layout.
//   - Added error and pow modules; re-exported target helpers and session types.
// - v1.0.1 (2025-06-16): Added simple SHA-256 support.
