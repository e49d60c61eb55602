// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/mod.rs
// Version: 1.0.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for utility functions, located in the
// utils subdirectory. It declares submodules for shared utility logic used
// across the project.
//
// Tree Location:
// - src/utils/mod.rs (utils module entry point)
// - Submodules: format

pub mod format;

pub use format::FormatUtils;

// Changelog:
// - v1.0.1 (2025-07-02): Re-exported FormatUtils; removed user_agent.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
