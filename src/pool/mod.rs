// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the pool communication
// functionality, located in the pool subdirectory. It declares submodules and
// re-exports key types for use throughout the project.
//
// Tree Location:
// - src/pool/mod.rs (pool module entry point)
// - Submodules: client, listener, messages, protocol, session, submitter

pub mod client;
pub mod listener;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod submitter;

// Re-export key types for convenience
pub use client::{PoolClient, PoolReader, PoolWriter};
pub use listener::JobListener;
pub use messages::PoolMessage;
pub use session::{SessionState, StratumSession};
pub use submitter::{PendingSubmits, ShareSubmitter};

// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 session split into tasks.
//   - Added session (handshake), listener (job updates) and submitter
//     (share submission) submodules.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
