// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/thread.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the implementation of individual mining threads,
// located in the cpu subdirectory of the miner module. Each thread takes a
// snapshot from the job board, builds its own coinbase and header, scans its
// nonce range and hands shares to the submitter.
//
// Tree Location:
// - src/miner/cpu/thread.rs (worker thread loop)
// - Depends on: log, tokio (mpsc), miner::{cpu::work, job_board, stats}

use super::work::{WorkTemplate, encode_extranonce2, extranonce2_value, nonce_range, set_header_nonce};
use crate::core::difficulty::{calculate_difficulty, hash_meets_target};
use crate::core::error::MinerError;
use crate::core::pow::PowHash;
use crate::core::types::{PartitionPolicy, Share};
use crate::miner::job_board::{JobBoard, WorkSnapshot};
use crate::miner::stats::{MinerStats, ThreadStats};
use crate::utils::format::FormatUtils;
use crate::Result;
use log::{debug, error, info, warn};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

const LOG_TARGET: &str = "strata::miner::cpu::thread";

/// Nonces hashed between supersession and shutdown checks
pub const SUPERSEDE_CHECK_INTERVAL: u32 = 4096;

/// Pause while there is no job, or the current one cannot be worked
const IDLE_WAIT: Duration = Duration::from_millis(10);

/// Everything one worker thread needs
#[derive(Clone)]
pub struct WorkerContext {
    pub worker_id: usize,
    pub worker_count: usize,
    pub partition: PartitionPolicy,
    pub board: Arc<JobBoard>,
    pub hasher: Arc<dyn PowHash>,
    pub share_tx: UnboundedSender<Share>,
    pub running: Arc<AtomicBool>,
    pub stats: Arc<MinerStats>,
    pub thread_stats: Arc<ThreadStats>,
}

/// How one attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The whole nonce range was scanned
    Exhausted,
    /// A newer snapshot was published mid-search
    Superseded,
    /// The running flag was cleared
    Stopped,
}

pub fn start_mining_thread(ctx: WorkerContext) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("miner-{}", ctx.worker_id))
        .spawn(move || mining_thread(ctx))
}

fn mining_thread(ctx: WorkerContext) {
    debug!(target: LOG_TARGET, "Thread {} started", ctx.worker_id);
    let mut round = 0u64;
    let mut last_job_id: Option<String> = None;

    while ctx.running.load(Ordering::Relaxed) {
        let Some(snapshot) = ctx.board.snapshot() else {
            std::thread::sleep(IDLE_WAIT);
            continue;
        };

        if last_job_id.as_deref() != Some(snapshot.job.job_id.as_str()) {
            last_job_id = Some(snapshot.job.job_id.clone());
            round = 0;
        }

        match run_attempt(&ctx, &snapshot, round) {
            Ok(AttemptOutcome::Stopped) => break,
            Ok(outcome) => {
                if outcome == AttemptOutcome::Superseded {
                    ctx.thread_stats.restarts.fetch_add(1, Ordering::Relaxed);
                } else {
                    ctx.thread_stats.rounds_completed.fetch_add(1, Ordering::Relaxed);
                }
                // A retargeted job keeps its id; moving on keeps the
                // extranonce2 already scanned from being searched again
                round += 1;
            }
            Err(e) if e.is_fatal() => {
                error!(target: LOG_TARGET, "Thread {}: {}", ctx.worker_id, e);
                ctx.running.store(false, Ordering::Relaxed);
                break;
            }
            Err(e) => {
                warn!(
                    target: LOG_TARGET,
                    "Thread {}: abandoning job {}: {}", ctx.worker_id, snapshot.job.job_id, e
                );
                ctx.thread_stats.computation_errors.fetch_add(1, Ordering::Relaxed);
                wait_for_new_work(&ctx, snapshot.generation);
            }
        }
    }
    debug!(target: LOG_TARGET, "Thread {} stopped", ctx.worker_id);
}

/// Sleep until the board moves past `generation` or shutdown
fn wait_for_new_work(ctx: &WorkerContext, generation: u64) {
    while ctx.running.load(Ordering::Relaxed) && ctx.board.is_current(generation) {
        std::thread::sleep(IDLE_WAIT);
    }
}

/// Search one extranonce2 of one snapshot
pub fn run_attempt(ctx: &WorkerContext, snapshot: &WorkSnapshot, round: u64) -> Result<AttemptOutcome> {
    let job = &snapshot.job;
    let params = &snapshot.params;

    let value = extranonce2_value(round, ctx.worker_id, ctx.worker_count)
        .ok_or_else(|| MinerError::Computation("extranonce2 round counter overflowed".to_string()))?;
    let (extranonce2, extranonce2_hex) = encode_extranonce2(value, params.extranonce2_size)?;

    let template = WorkTemplate::from_snapshot(job, params)?;
    let merkle_root = template.merkle_root(ctx.hasher.as_ref(), &extranonce2)?;
    let mut header = template.header(&merkle_root);

    let range = nonce_range(ctx.partition, ctx.worker_id, ctx.worker_count);
    let start = *range.start();
    debug!(
        target: LOG_TARGET,
        "Thread {}: job {} generation {} extranonce2={} nonces {:08x}..={:08x}",
        ctx.worker_id,
        job.job_id,
        snapshot.generation,
        extranonce2_hex,
        start,
        range.end()
    );

    let thread_stats = &ctx.thread_stats;
    let mut hashes = 0u64;

    for nonce in range {
        if (nonce - start) % SUPERSEDE_CHECK_INTERVAL == 0 {
            thread_stats.add_hashes(hashes);
            hashes = 0;
            if !ctx.running.load(Ordering::Relaxed) {
                return Ok(AttemptOutcome::Stopped);
            }
            if !ctx.board.is_current(snapshot.generation) {
                return Ok(AttemptOutcome::Superseded);
            }
        }

        set_header_nonce(&mut header, nonce);
        let hash = ctx.hasher.hash(&header);
        hashes += 1;

        if !hash_meets_target(&hash, &params.target) {
            continue;
        }

        if !still_valid(ctx, snapshot, &hash) {
            thread_stats.add_hashes(hashes);
            return Ok(AttemptOutcome::Superseded);
        }

        let share = Share {
            job_id: job.job_id.clone(),
            extranonce2: extranonce2_hex.clone(),
            ntime: job.ntime.clone(),
            nonce,
            worker_id: ctx.worker_id,
            hash,
            difficulty: calculate_difficulty(&hash),
        };
        ctx.stats.record_share_found(ctx.worker_id, share.difficulty);
        info!(
            target: LOG_TARGET,
            "💎 Thread {} found share! job={} nonce={} difficulty={} hash={}…",
            ctx.worker_id,
            share.job_id,
            share.nonce_hex(),
            FormatUtils::format_number(share.difficulty),
            FormatUtils::short_hash(&hash)
        );
        if ctx.share_tx.send(share).is_err() {
            // Submitter is gone; the session is over
            thread_stats.add_hashes(hashes);
            return Ok(AttemptOutcome::Stopped);
        }
    }

    thread_stats.add_hashes(hashes);
    Ok(AttemptOutcome::Exhausted)
}

/// Re-check a candidate against the snapshot in force right now.
///
/// A newer snapshot only keeps the share if it is the same job with the same
/// extranonce1 and the hash also meets its target.
fn still_valid(ctx: &WorkerContext, snapshot: &WorkSnapshot, hash: &[u8; 32]) -> bool {
    if ctx.board.is_current(snapshot.generation) {
        return true;
    }
    let Some(current) = ctx.board.snapshot() else {
        return false;
    };
    current.job.job_id == snapshot.job.job_id
        && current.params.extranonce1 == snapshot.params.extranonce1
        && current.params.extranonce2_size == snapshot.params.extranonce2_size
        && hash_meets_target(hash, &current.params.target)
}


// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 worker loop.
//   - Workers read immutable snapshots from the job board instead of a
//     broadcast channel and restart when the generation changes.
//   - Coinbase, merkle root and header are built per extranonce2 from the
//     pool's raw fields; nonces follow the partition policy.
//   - Shares are re-validated against the current snapshot before sending.
//   - Removed the random nonce start and the Tari SHA3x header path.
// - v1.1.4 (2025-06-19): Fixed SHA-256 share validation.
