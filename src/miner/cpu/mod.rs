// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/mod.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the CPU mining functionality,
// located in the cpu subdirectory of the miner module. It declares
// submodules and re-exports key types for use throughout the project.
//
// Tree Location:
// - src/miner/cpu/mod.rs (CPU miner module entry point)
// - Submodules: miner, thread, work

pub mod miner;
pub mod thread;
pub mod work;

// Re-export key types for convenience
pub use miner::CpuMiner;
pub use thread::{AttemptOutcome, SUPERSEDE_CHECK_INTERVAL, WorkerContext};
pub use work::WorkTemplate;

// Changelog:
// - v1.1.0 (2025-07-02): Added the work submodule for header construction.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
