// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/job_board.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file holds the current unit of work shared between the job listener
// and the mining workers, located in the miner subdirectory. The listener
// swaps in whole immutable snapshots; workers clone the Arc once per attempt
// and poll the generation counter to notice supersession without locking.
//
// Tree Location:
// - src/miner/job_board.rs (shared job snapshot)
// - Depends on: std, crate::core::types

use crate::core::types::{Job, SessionParams};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Jobs remembered as live between clean notifications
const MAX_LIVE_JOBS: usize = 16;

/// Self-consistent view of the work: one job plus the session values in force
#[derive(Debug, Clone)]
pub struct WorkSnapshot {
    /// Bumped on every publish, starting at 1
    pub generation: u64,
    pub job: Arc<Job>,
    pub params: SessionParams,
}

#[derive(Default)]
struct BoardState {
    current: Option<Arc<WorkSnapshot>>,
    /// Job ids published since the last clean_jobs notification, oldest first
    live_jobs: VecDeque<String>,
}

/// Single-writer, many-reader holder of the current WorkSnapshot
#[derive(Default)]
pub struct JobBoard {
    state: Mutex<BoardState>,
    generation: AtomicU64,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // A panicking reader cannot leave BoardState half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the current job; clean_jobs retires every earlier job
    pub fn publish(&self, job: Arc<Job>, params: SessionParams) -> Arc<WorkSnapshot> {
        let mut state = self.lock();
        if job.clean_jobs {
            state.live_jobs.clear();
        }
        if !state.live_jobs.contains(&job.job_id) {
            state.live_jobs.push_back(job.job_id.clone());
            if state.live_jobs.len() > MAX_LIVE_JOBS {
                state.live_jobs.pop_front();
            }
        }
        self.swap(&mut state, job, params)
    }

    /// Republish the current job with new session values (target, extranonce)
    pub fn update_params(&self, params: SessionParams) -> Option<Arc<WorkSnapshot>> {
        let mut state = self.lock();
        let job = state.current.as_ref().map(|snapshot| Arc::clone(&snapshot.job))?;
        Some(self.swap(&mut state, job, params))
    }

    fn swap(&self, state: &mut BoardState, job: Arc<Job>, params: SessionParams) -> Arc<WorkSnapshot> {
        let generation = self.generation.load(Ordering::Acquire) + 1;
        let snapshot = Arc::new(WorkSnapshot {
            generation,
            job,
            params,
        });
        state.current = Some(Arc::clone(&snapshot));
        self.generation.store(generation, Ordering::Release);
        snapshot
    }

    /// Current snapshot, if any job has been published yet
    pub fn snapshot(&self) -> Option<Arc<WorkSnapshot>> {
        self.lock().current.clone()
    }

    /// Generation of the current snapshot; 0 before the first publish
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether a snapshot taken at `generation` is still the current one
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Whether shares for `job_id` may still be submitted
    pub fn is_job_live(&self, job_id: &str) -> bool {
        self.lock().live_jobs.iter().any(|id| id == job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::{TargetSource, U256};
    use std::thread;

    fn job(id: &str, clean: bool) -> Arc<Job> {
        Arc::new(Job {
            job_id: id.to_string(),
            prevhash: "00".repeat(32),
            coinb1: "01".to_string(),
            coinb2: "02".to_string(),
            merkle_branch: vec![],
            version: "20000000".to_string(),
            nbits: "1d00ffff".to_string(),
            ntime: "5f5e1000".to_string(),
            clean_jobs: clean,
        })
    }

    fn params(target: u64) -> SessionParams {
        SessionParams {
            extranonce1: "f000000f".to_string(),
            extranonce2_size: 4,
            target: U256::from(target),
            target_source: TargetSource::Difficulty(1.0),
        }
    }

    #[test]
    fn test_empty_board() {
        let board = JobBoard::new();
        assert!(board.snapshot().is_none());
        assert_eq!(board.generation(), 0);
        assert!(board.update_params(params(1)).is_none());
        assert!(!board.is_job_live("a"));
    }

    #[test]
    fn test_publish_replaces_snapshot() {
        let board = JobBoard::new();
        let first = board.publish(job("a", true), params(1));
        assert_eq!(first.generation, 1);
        assert!(board.is_current(1));

        let second = board.publish(job("b", false), params(2));
        assert_eq!(second.generation, 2);
        assert!(!board.is_current(first.generation));

        let current = board.snapshot().unwrap();
        assert_eq!(current.job.job_id, "b");
        assert_eq!(current.params.target, U256::from(2u64));
    }

    #[test]
    fn test_clean_jobs_retires_older_jobs() {
        let board = JobBoard::new();
        board.publish(job("a", true), params(1));
        board.publish(job("b", false), params(1));
        assert!(board.is_job_live("a"));
        assert!(board.is_job_live("b"));

        board.publish(job("c", true), params(1));
        assert!(!board.is_job_live("a"));
        assert!(!board.is_job_live("b"));
        assert!(board.is_job_live("c"));
    }

    #[test]
    fn test_live_jobs_are_bounded() {
        let board = JobBoard::new();
        for i in 0..(MAX_LIVE_JOBS + 4) {
            board.publish(job(&i.to_string(), false), params(1));
        }
        assert!(!board.is_job_live("0"));
        assert!(board.is_job_live(&(MAX_LIVE_JOBS + 3).to_string()));
    }

    #[test]
    fn test_update_params_keeps_job() {
        let board = JobBoard::new();
        let original = board.publish(job("a", true), params(10));
        let updated = board.update_params(params(5)).unwrap();
        assert!(Arc::ptr_eq(&original.job, &updated.job));
        assert_eq!(updated.generation, 2);
        assert_eq!(board.snapshot().unwrap().params.target, U256::from(5u64));
        assert!(board.is_job_live("a"));
    }

    #[test]
    fn test_readers_never_see_torn_snapshots() {
        let board = Arc::new(JobBoard::new());
        board.publish(job("0", true), params(0));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let board = Arc::clone(&board);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let snapshot = board.snapshot().unwrap();
                        // Each publish pairs job id N with target N
                        let id: u64 = snapshot.job.job_id.parse().unwrap();
                        assert_eq!(U256::from(id), snapshot.params.target);
                    }
                })
            })
            .collect();

        for i in 1..2_000u64 {
            board.publish(job(&i.to_string(), i % 7 == 0), params(i));
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Shared job snapshot.
//   - Whole-snapshot Arc swap under a mutex with an atomic generation counter.
//   - Tracks live job ids so stale shares can be dropped after clean_jobs.
