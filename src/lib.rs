// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file serves as the main library entry point for the miner, located at
// the root of the source tree. It exports all public modules and types that
// the binary and the integration tests use.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: core, miner, pool, utils

pub mod core;
pub mod miner;
pub mod pool;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use crate::core::{Algorithm, MinerConfig, MinerError, PartitionPolicy};
pub use crate::miner::{CpuMiner, JobBoard, MinerStats};
pub use crate::pool::PoolClient;

pub type Result<T> = std::result::Result<T, MinerError>;

// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 pool client.
//   - Result now carries MinerError instead of a boxed error.
//   - Removed benchmark, help and tui modules.
// - v1.0.2 (2025-06-15): Added help module support.
// - v1.0.1 (2025-06-14): Added benchmark module support.
// - v1.0.0 (2025-06-14): Initial modular breakout from monolithic main.rs.
