// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the miner functionality, located
// in the miner subdirectory. It declares submodules and re-exports key types
// for use throughout the project.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: cpu, job_board, stats

pub mod cpu;
pub mod job_board;
pub mod stats;

// Re-export key types for convenience
pub use cpu::CpuMiner;
pub use job_board::{JobBoard, WorkSnapshot};
pub use stats::{MinerStats, ThreadStats};

// Changelog:
// - v2.0.0 (2025-07-02): Added the job_board module shared by the listener
//   and the workers; removed the GPU module.
// - v1.1.0 (2025-06-24): Added GPU mining module.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
