// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/thread_stats.rs
// Version: 2.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements per-worker statistics tracking, located in the stats
// subdirectory of the miner module. It monitors individual worker
// performance, including hashes, shares found and hashrate.
//
// Tree Location:
// - src/miner/stats/thread_stats.rs (per-worker statistics logic)
// - Depends on: std

use crate::utils::format::FormatUtils;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

pub struct ThreadStats {
    pub worker_id: usize,
    pub hashes_computed: AtomicU64,
    pub shares_found: AtomicU64,
    pub best_difficulty: AtomicU64,
    /// Attempts abandoned because a newer snapshot was published
    pub restarts: AtomicU64,
    /// Attempts aborted by a malformed job field
    pub computation_errors: AtomicU64,
    /// Extranonce2 rounds fully scanned
    pub rounds_completed: AtomicUsize,
    start_time: Instant,
    last_share_time: Mutex<Option<Instant>>,
}

impl ThreadStats {
    /// Create a new ThreadStats instance for a specific worker
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            hashes_computed: AtomicU64::new(0),
            shares_found: AtomicU64::new(0),
            best_difficulty: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            computation_errors: AtomicU64::new(0),
            rounds_completed: AtomicUsize::new(0),
            start_time: Instant::now(),
            last_share_time: Mutex::new(None),
        }
    }

    /// Record a share found by this worker
    pub fn record_share(&self, difficulty: u64) {
        self.shares_found.fetch_add(1, Ordering::Relaxed);
        self.best_difficulty.fetch_max(difficulty, Ordering::Relaxed);
        if let Ok(mut last) = self.last_share_time.lock() {
            *last = Some(Instant::now());
        }
    }

    /// Add a batch of computed hashes
    pub fn add_hashes(&self, hashes: u64) {
        self.hashes_computed.fetch_add(hashes, Ordering::Relaxed);
    }

    /// Average hashrate since the worker started
    pub fn get_hashrate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.hashes_computed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn last_share_time(&self) -> Option<Instant> {
        self.last_share_time.lock().ok().and_then(|last| *last)
    }

    /// One dashboard row for this worker
    pub fn summary(&self) -> String {
        let last_share = self
            .last_share_time()
            .map(|time| FormatUtils::format_duration(time.elapsed()))
            .unwrap_or_else(|| "never".to_string());
        format!(
            "Thread {:>3}: {} | {} shares (best {}) | {} rounds, {} restarts, {} errors | last {}",
            self.worker_id,
            FormatUtils::format_hashrate(self.get_hashrate()),
            self.shares_found.load(Ordering::Relaxed),
            FormatUtils::format_number(self.best_difficulty.load(Ordering::Relaxed)),
            self.rounds_completed.load(Ordering::Relaxed),
            self.restarts.load(Ordering::Relaxed),
            self.computation_errors.load(Ordering::Relaxed),
            last_share
        )
    }
}


// Changelog:
// - v2.1.0 (2025-07-09): Added summary() row for the dashboard.
// - v2.0.0 (2025-07-02): Per-worker counters for the pool client.
//   - Replaced rejected/peak/target fields with restarts, computation errors
//     and completed extranonce2 rounds.
//   - Hashes are added in batches; hashrate is derived on read.
//   - Removed share dots and peak reset used by the TUI and benchmark.
// - v1.0.1 (2025-06-14): Added peak hashrate tracking for benchmarking.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
