// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/miner_stats.rs
// Version: 2.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements miner-wide statistics tracking, located in the stats
// subdirectory of the miner module. It counts shares through their life
// cycle (found, submitted, accepted, rejected, stale) and logs a periodic
// dashboard.
//
// Tree Location:
// - src/miner/stats/miner_stats.rs (miner-wide statistics logic)
// - Depends on: log, thread_stats, utils::format

use super::thread_stats::ThreadStats;
use crate::core::difficulty::TargetSource;
use crate::utils::format::FormatUtils;
use log::info;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const LOG_TARGET: &str = "strata::miner::stats";

/// Share difficulties kept for the dashboard
const RECENT_SHARES: usize = 100;

pub struct MinerStats {
    pub shares_found: AtomicU64,
    pub shares_submitted: AtomicU64,
    pub shares_accepted: AtomicU64,
    pub shares_rejected: AtomicU64,
    /// Dropped before submission: job retired or target raised
    pub shares_stale: AtomicU64,
    pub jobs_received: AtomicU64,
    start_time: Instant,
    pub thread_stats: Vec<Arc<ThreadStats>>,
    recent_shares: Mutex<VecDeque<(Instant, u64)>>,
}

impl MinerStats {
    pub fn new(num_threads: usize) -> Self {
        Self {
            shares_found: AtomicU64::new(0),
            shares_submitted: AtomicU64::new(0),
            shares_accepted: AtomicU64::new(0),
            shares_rejected: AtomicU64::new(0),
            shares_stale: AtomicU64::new(0),
            jobs_received: AtomicU64::new(0),
            start_time: Instant::now(),
            thread_stats: (0..num_threads).map(|i| Arc::new(ThreadStats::new(i))).collect(),
            recent_shares: Mutex::new(VecDeque::with_capacity(RECENT_SHARES)),
        }
    }

    pub fn record_share_found(&self, worker_id: usize, difficulty: u64) {
        self.shares_found.fetch_add(1, Ordering::Relaxed);
        if let Some(thread) = self.thread_stats.get(worker_id) {
            thread.record_share(difficulty);
        }
        if let Ok(mut shares) = self.recent_shares.lock() {
            shares.push_back((Instant::now(), difficulty));
            if shares.len() > RECENT_SHARES {
                shares.pop_front();
            }
        }
    }

    pub fn total_hashes(&self) -> u64 {
        self.thread_stats
            .iter()
            .map(|t| t.hashes_computed.load(Ordering::Relaxed))
            .sum()
    }

    pub fn get_total_hashrate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_hashes() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Accepted share percentage of all answered submissions
    pub fn acceptance_rate(&self) -> f64 {
        let accepted = self.shares_accepted.load(Ordering::Relaxed);
        let answered = accepted + self.shares_rejected.load(Ordering::Relaxed);
        if answered > 0 {
            accepted as f64 / answered as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Log a text dashboard with miner statistics
    pub fn display_dashboard(&self, algorithm: &str, target: Option<TargetSource>) {
        let shares_found = self.shares_found.load(Ordering::Relaxed);
        let shares_submitted = self.shares_submitted.load(Ordering::Relaxed);
        let shares_accepted = self.shares_accepted.load(Ordering::Relaxed);
        let shares_rejected = self.shares_rejected.load(Ordering::Relaxed);
        let shares_stale = self.shares_stale.load(Ordering::Relaxed);

        let (top_shares, last_share) = match self.recent_shares.lock() {
            Ok(shares) => {
                let mut difficulties: Vec<u64> = shares.iter().map(|(_, d)| *d).collect();
                difficulties.sort_unstable_by(|a, b| b.cmp(a));
                (difficulties, shares.back().map(|(time, _)| time.elapsed()))
            }
            Err(_) => (Vec::new(), None),
        };
        let top_shares_str = if top_shares.is_empty() {
            "None".to_string()
        } else {
            top_shares
                .iter()
                .take(5)
                .map(|d| FormatUtils::format_number(*d))
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let active_threads = self
            .thread_stats
            .iter()
            .filter(|t| t.hashes_computed.load(Ordering::Relaxed) > 0)
            .count();
        let restarts: u64 = self.thread_stats.iter().map(|t| t.restarts.load(Ordering::Relaxed)).sum();

        info!(target: LOG_TARGET, "📊 MINER DASHBOARD");
        info!(target: LOG_TARGET, "├─ Algorithm: {}", algorithm);
        info!(target: LOG_TARGET, "├─ Hashrate: {}", FormatUtils::format_hashrate(self.get_total_hashrate()));
        info!(target: LOG_TARGET, "├─ Total Work: {} hashes", FormatUtils::format_number(self.total_hashes()));
        info!(
            target: LOG_TARGET,
            "├─ Share Target: {}",
            target.map(|t| t.to_string()).unwrap_or_else(|| "waiting for job".to_string())
        );
        info!(target: LOG_TARGET, "├─ Jobs Received: {} ({} restarts)", self.jobs_received.load(Ordering::Relaxed), restarts);
        info!(target: LOG_TARGET, "├─ Top 5 Shares: {}", top_shares_str);
        info!(
            target: LOG_TARGET,
            "├─ Shares: {} found, {} submitted, {}/{} accepted ({:.1}%)",
            shares_found,
            shares_submitted,
            shares_accepted,
            shares_accepted + shares_rejected,
            self.acceptance_rate()
        );
        info!(target: LOG_TARGET, "├─ Rejected / Stale: {} / {}", shares_rejected, shares_stale);
        info!(
            target: LOG_TARGET,
            "├─ Last Share: {}",
            last_share.map(FormatUtils::format_duration).unwrap_or_else(|| "never".to_string())
        );
        info!(target: LOG_TARGET, "├─ Session Time: {}", FormatUtils::format_elapsed(self.session_time()));
        info!(target: LOG_TARGET, "└─ Active Threads: {}/{}", active_threads, self.thread_stats.len());
        for thread in &self.thread_stats {
            info!(target: LOG_TARGET, "   {}", thread.summary());
        }
    }

    pub fn session_time(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_found_updates_thread() {
        let stats = MinerStats::new(2);
        stats.record_share_found(1, 42);
        stats.record_share_found(7, 1);
        assert_eq!(stats.shares_found.load(Ordering::Relaxed), 2);
        assert_eq!(stats.thread_stats[1].shares_found.load(Ordering::Relaxed), 1);
        assert_eq!(stats.thread_stats[0].shares_found.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_acceptance_rate() {
        let stats = MinerStats::new(1);
        assert_eq!(stats.acceptance_rate(), 0.0);
        stats.shares_accepted.store(3, Ordering::Relaxed);
        stats.shares_rejected.store(1, Ordering::Relaxed);
        assert_eq!(stats.acceptance_rate(), 75.0);
    }

    #[test]
    fn test_total_hashes_sums_threads() {
        let stats = MinerStats::new(3);
        for thread in &stats.thread_stats {
            thread.add_hashes(100);
        }
        assert_eq!(stats.total_hashes(), 300);
        stats.display_dashboard("sha256d", Some(TargetSource::Difficulty(1.0)));
        stats.display_dashboard("sha3x", None);
    }

    #[test]
    fn test_session_time_advances() {
        let stats = MinerStats::new(1);
        let first = stats.session_time();
        std::thread::sleep(Duration::from_millis(5));
        assert!(stats.session_time() > first);
    }
}

// Changelog:
// - v2.1.0 (2025-07-09): Dashboard lists one row per worker thread.
// - v2.0.0 (2025-07-02): Share life cycle counters for Stratum V1.
//   - Added found and stale counters and the share target source to the dashboard.
//   - Total hashes are summed from the per-worker counters.
//   - Dashboard logs through the log facade; formatting moved to FormatUtils.
//   - Removed the TUI activity feed, luck and hashrate history.
// - v1.0.3 (2025-06-14): Fixed Top 5 Shares sorting.
// - v1.0.2 (2025-06-14): Enhanced dashboard display.
// - v1.0.1 (2025-06-14): Added dashboard display.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
