// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/miner.rs
// Version: 3.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the CPU miner orchestrator, located in the cpu
// subdirectory of the miner module. It connects to the pool, runs the
// Stratum handshake, then starts the job listener, the share submitter, the
// stats printer and one worker thread per configured CPU, and tears them all
// down together.
//
// Tree Location:
// - src/miner/cpu/miner.rs (session orchestration)
// - Depends on: tokio, log, pool, miner::{job_board, stats, cpu::thread}

use super::thread::{WorkerContext, start_mining_thread};
use crate::core::error::MinerError;
use crate::core::types::{MinerConfig, Share};
use crate::miner::job_board::JobBoard;
use crate::miner::stats::MinerStats;
use crate::pool::{
    JobListener, PendingSubmits, PoolClient, PoolMessage, PoolReader, PoolWriter, SessionState,
    ShareSubmitter, StratumSession,
};
use crate::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

const LOG_TARGET: &str = "strata::miner::cpu::miner";

/// Time the submitter gets to finish at shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

pub struct CpuMiner {
    config: MinerConfig,
    stats: Arc<MinerStats>,
    board: Arc<JobBoard>,
    running: Arc<AtomicBool>,
}

impl CpuMiner {
    pub fn new(config: MinerConfig) -> Self {
        let threads = config.threads.max(1);
        Self {
            stats: Arc::new(MinerStats::new(threads)),
            board: Arc::new(JobBoard::new()),
            running: Arc::new(AtomicBool::new(true)),
            config: MinerConfig { threads, ..config },
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Shared statistics, live while the session runs
    pub fn get_stats(&self) -> Arc<MinerStats> {
        Arc::clone(&self.stats)
    }

    pub fn job_board(&self) -> Arc<JobBoard> {
        Arc::clone(&self.board)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ask every task and worker to finish; `run` then returns
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    async fn handshake(&self) -> Result<(PoolReader, PoolWriter, SessionState, Vec<PoolMessage>)> {
        let client = PoolClient::new(self.config.connect_timeout, self.config.read_timeout);
        let (reader, writer) = client.connect(&self.config.pool_host, self.config.pool_port).await?;
        info!(target: LOG_TARGET, "✅ Connected to pool {}", self.config.pool_address());

        let mut session = StratumSession::new(reader, writer);
        let state = session.subscribe().await?;
        session.authorize(&self.config.wallet, &self.config.password).await?;

        let (reader, writer, backlog) = session.into_parts();
        Ok((reader, writer, state, backlog))
    }

    fn start_workers(&self, share_tx: &mpsc::UnboundedSender<Share>) -> Result<Vec<thread::JoinHandle<()>>> {
        let hasher = self.config.algorithm.hasher();
        let mut handles = Vec::with_capacity(self.config.threads);
        for worker_id in 0..self.config.threads {
            let ctx = WorkerContext {
                worker_id,
                worker_count: self.config.threads,
                partition: self.config.partition,
                board: Arc::clone(&self.board),
                hasher: Arc::clone(&hasher),
                share_tx: share_tx.clone(),
                running: Arc::clone(&self.running),
                stats: Arc::clone(&self.stats),
                thread_stats: Arc::clone(&self.stats.thread_stats[worker_id]),
            };
            match start_mining_thread(ctx) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.stop();
                    join_workers(handles);
                    return Err(MinerError::Io(e));
                }
            }
        }
        debug!(target: LOG_TARGET, "Started {} mining threads", handles.len());
        Ok(handles)
    }

    fn start_stats_printer(&self) -> JoinHandle<()> {
        let stats = Arc::clone(&self.stats);
        let board = Arc::clone(&self.board);
        let algorithm = self.config.algorithm.to_string();
        let period = self.config.stats_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let target = board.snapshot().map(|snapshot| snapshot.params.target_source);
                stats.display_dashboard(&algorithm, target);
            }
        })
    }

    /// Run one pool session to completion.
    ///
    /// Returns Ok after Ctrl-C or `stop()`, and the fatal error otherwise
    /// (handshake failure, lost connection).
    pub async fn run(&self) -> Result<()> {
        info!(
            target: LOG_TARGET,
            "🚀 Starting {} miner with {} threads ({:?} partition)",
            self.config.algorithm,
            self.config.threads,
            self.config.partition
        );
        let (reader, writer, state, backlog) = match self.handshake().await {
            Ok(parts) => parts,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };

        let pending = Arc::new(PendingSubmits::new());
        let (share_tx, share_rx) = mpsc::unbounded_channel();

        let listener = JobListener::new(
            reader,
            state,
            Arc::clone(&self.board),
            Arc::clone(&self.stats),
            Arc::clone(&pending),
            Arc::clone(&self.running),
        )
        .with_backlog(backlog);
        let mut listener_task = tokio::spawn(listener.run());

        let submitter = ShareSubmitter::new(
            writer.clone(),
            self.config.wallet.clone(),
            Arc::clone(&self.board),
            Arc::clone(&self.stats),
            pending,
            Arc::clone(&self.running),
        );
        let mut submitter_task = tokio::spawn(submitter.run(share_rx));
        let stats_task = self.start_stats_printer();

        let workers = match self.start_workers(&share_tx) {
            Ok(workers) => workers,
            Err(e) => {
                listener_task.abort();
                submitter_task.abort();
                stats_task.abort();
                return Err(e);
            }
        };
        // Workers hold the only senders; the submitter ends once they exit
        drop(share_tx);

        let joined = tokio::select! {
            biased;
            joined = &mut listener_task => Some(listener_outcome(joined)),
            _ = tokio::signal::ctrl_c() => {
                info!(target: LOG_TARGET, "🛑 Shutdown requested");
                None
            }
            _ = wait_for_stop(Arc::clone(&self.running)) => None,
        };

        self.stop();
        let outcome = match joined {
            Some(outcome) => outcome,
            None => settle_listener(listener_task).await,
        };

        if let Err(e) = tokio::task::spawn_blocking(move || join_workers(workers)).await {
            error!(target: LOG_TARGET, "Failed to join mining threads: {}", e);
        }

        let submitter_outcome = match tokio::time::timeout(SHUTDOWN_GRACE, &mut submitter_task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MinerError::Connection(format!("share submitter task failed: {}", e))),
            Err(_) => {
                warn!(target: LOG_TARGET, "Share submitter did not finish in time");
                submitter_task.abort();
                Ok(())
            }
        };
        stats_task.abort();

        if let Err(e) = writer.shutdown().await {
            debug!(target: LOG_TARGET, "Closing pool connection: {}", e);
        }

        let target = self.board.snapshot().map(|snapshot| snapshot.params.target_source);
        self.stats.display_dashboard(&self.config.algorithm.to_string(), target);
        info!(target: LOG_TARGET, "Mining session ended");

        // A submitter failure only matters if the listener did not already fail
        outcome.and(submitter_outcome)
    }
}

fn listener_outcome(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) => Err(MinerError::Connection(format!("job listener task failed: {}", e))),
    }
}

/// Cancel the listener, keeping its error if it had already finished with one
async fn settle_listener(listener_task: JoinHandle<Result<()>>) -> Result<()> {
    listener_task.abort();
    listener_outcome(listener_task.await)
}

async fn wait_for_stop(running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(STOP_POLL).await;
    }
}

/// Block until every worker thread has exited
fn join_workers(handles: Vec<thread::JoinHandle<()>>) {
    for handle in handles {
        let name = handle.thread().name().unwrap_or("miner").to_string();
        if handle.join().is_err() {
            error!(target: LOG_TARGET, "Mining thread {} panicked", name);
        }
    }
}


// Changelog:
// - v3.1.0 (2025-07-09): A listener error is kept even when shutdown was
//   observed first; the select is biased towards the listener.
// - v3.0.0 (2025-07-02): Stratum V1 session orchestration.
//   - run() performs subscribe/authorize, then starts the job listener,
//     share submitter, stats printer and worker threads around a shared
//     JobBoard.
//   - Connection loss, Ctrl-C or stop() clear the running flag; all tasks and
//     threads are joined before run() returns.
//   - Removed reconnect loop, SHA3x login, SV2 test and web dashboard hooks.
// - v2.0.4-dns (2025-06-23): Added DNS resolution support.
// - v2.0.3-web (2025-06-23): Fixed start_mining_thread import.
// - v2.0.0-sv2-test: Complete rewrite for SV2 testing.
