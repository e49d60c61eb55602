// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/submitter.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the share submitter, located in the pool
// subdirectory. It drains the workers' share channel, drops shares that went
// stale while queued and sends the rest as mining.submit requests.
//
// Tree Location:
// - src/pool/submitter.rs (share submission task)
// - Depends on: tokio, log, pool::{client, protocol}, miner::{job_board, stats}

use crate::core::difficulty::hash_meets_target;
use crate::core::types::Share;
use crate::miner::job_board::JobBoard;
use crate::miner::stats::MinerStats;
use crate::pool::client::PoolWriter;
use crate::pool::protocol::{FIRST_SUBMIT_ID, StratumProtocol};
use crate::utils::format::FormatUtils;
use crate::Result;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

const LOG_TARGET: &str = "strata::miner::pool::submitter";

/// A submitted share awaiting the pool's verdict
#[derive(Debug, Clone)]
pub struct PendingShare {
    pub job_id: String,
    pub worker_id: usize,
    pub difficulty: u64,
    pub sent_at: Instant,
}

/// Submit ids shared between the submitter (insert) and the listener (resolve)
#[derive(Default)]
pub struct PendingSubmits {
    inner: Mutex<HashMap<u64, PendingShare>>,
}

impl PendingSubmits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: u64, share: PendingShare) {
        if let Ok(mut pending) = self.inner.lock() {
            pending.insert(id, share);
        }
    }

    /// Remove and return the share submitted under `id`
    pub fn resolve(&self, id: u64) -> Option<PendingShare> {
        self.inner.lock().ok().and_then(|mut pending| pending.remove(&id))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|pending| pending.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What happened to one share taken off the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Sent under this request id
    Sent(u64),
    /// Job retired or target raised before the share could be sent
    Stale,
}

pub struct ShareSubmitter {
    writer: PoolWriter,
    wallet: String,
    board: Arc<JobBoard>,
    stats: Arc<MinerStats>,
    pending: Arc<PendingSubmits>,
    running: Arc<AtomicBool>,
    next_id: u64,
}

impl ShareSubmitter {
    pub fn new(
        writer: PoolWriter,
        wallet: impl Into<String>,
        board: Arc<JobBoard>,
        stats: Arc<MinerStats>,
        pending: Arc<PendingSubmits>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            writer,
            wallet: wallet.into(),
            board,
            stats,
            pending,
            running,
            next_id: FIRST_SUBMIT_ID,
        }
    }

    /// Whether the share may still earn credit: its job is live and the hash
    /// is below the target in force now
    fn is_fresh(&self, share: &Share) -> bool {
        if !self.board.is_job_live(&share.job_id) {
            return false;
        }
        self.board
            .snapshot()
            .is_some_and(|snapshot| hash_meets_target(&share.hash, &snapshot.params.target))
    }

    /// Send one share, or drop it if it went stale while queued
    pub async fn submit(&mut self, share: Share) -> Result<SubmitOutcome> {
        if !self.is_fresh(&share) {
            self.stats.shares_stale.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: LOG_TARGET,
                "Dropping stale share from thread {} for job {}", share.worker_id, share.job_id
            );
            return Ok(SubmitOutcome::Stale);
        }

        let id = self.next_id;
        self.next_id += 1;

        // Registered first so a fast reply always finds its entry
        self.pending.insert(
            id,
            PendingShare {
                job_id: share.job_id.clone(),
                worker_id: share.worker_id,
                difficulty: share.difficulty,
                sent_at: Instant::now(),
            },
        );
        let request = StratumProtocol::create_submit_request(id, &self.wallet, &share);
        if let Err(e) = self.writer.send_line(&request).await {
            self.pending.resolve(id);
            return Err(e);
        }

        self.stats.shares_submitted.fetch_add(1, Ordering::Relaxed);
        info!(
            target: LOG_TARGET,
            "📤 Submitted share #{} from thread {}: job={} extranonce2={} nonce={} hash={}…",
            id,
            share.worker_id,
            share.job_id,
            share.extranonce2,
            share.nonce_hex(),
            FormatUtils::short_hash(&share.hash)
        );
        Ok(SubmitOutcome::Sent(id))
    }

    /// Drain the share channel until every worker has hung up or the session ends
    pub async fn run(mut self, mut share_rx: UnboundedReceiver<Share>) -> Result<()> {
        while let Some(share) = share_rx.recv().await {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.submit(share).await {
                error!(target: LOG_TARGET, "Failed to submit share: {}", e);
                if e.is_connection_loss() {
                    self.running.store(false, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }
        if !self.pending.is_empty() {
            warn!(target: LOG_TARGET, "{} submitted shares never got an answer", self.pending.len());
        }
        debug!(target: LOG_TARGET, "Share submitter stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::{TargetSource, U256};
    use crate::core::types::{Job, SessionParams};
    use crate::pool::client::split_stream;
    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

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

    fn params(target: U256) -> SessionParams {
        SessionParams {
            extranonce1: "f000000f".to_string(),
            extranonce2_size: 4,
            target,
            target_source: TargetSource::Difficulty(1.0),
        }
    }

    fn share(job_id: &str, hash_byte: u8) -> Share {
        Share {
            job_id: job_id.to_string(),
            extranonce2: "00000001".to_string(),
            ntime: "5f5e1000".to_string(),
            nonce: 7,
            worker_id: 1,
            hash: [hash_byte; 32],
            difficulty: 1,
        }
    }

    async fn submitter() -> (ShareSubmitter, Arc<JobBoard>, Arc<MinerStats>, BufReader<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (_reader, writer) = split_stream(client.unwrap(), None);
        let board = Arc::new(JobBoard::new());
        let stats = Arc::new(MinerStats::new(2));
        let submitter = ShareSubmitter::new(
            writer,
            "wallet",
            Arc::clone(&board),
            Arc::clone(&stats),
            Arc::new(PendingSubmits::new()),
            Arc::new(AtomicBool::new(true)),
        );
        (submitter, board, stats, BufReader::new(accepted.unwrap().0))
    }

    #[tokio::test]
    async fn test_submit_ids_start_at_100() {
        let (mut submitter, board, stats, mut pool) = submitter().await;
        board.publish(job("a", true), params(U256::MAX));

        assert_eq!(submitter.submit(share("a", 0)).await.unwrap(), SubmitOutcome::Sent(100));
        assert_eq!(submitter.submit(share("a", 0)).await.unwrap(), SubmitOutcome::Sent(101));
        assert_eq!(submitter.pending.len(), 2);
        assert_eq!(stats.shares_submitted.load(Ordering::Relaxed), 2);

        let mut line = String::new();
        pool.read_line(&mut line).await.unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(request["id"], 100);
        assert_eq!(request["method"], "mining.submit");
        assert_eq!(
            request["params"],
            serde_json::json!(["wallet", "a", "00000001", "5f5e1000", "00000007"])
        );
    }

    #[tokio::test]
    async fn test_stale_after_clean_jobs() {
        let (mut submitter, board, stats, _pool) = submitter().await;
        board.publish(job("a", true), params(U256::MAX));
        board.publish(job("b", true), params(U256::MAX));

        assert_eq!(submitter.submit(share("a", 0)).await.unwrap(), SubmitOutcome::Stale);
        assert_eq!(stats.shares_stale.load(Ordering::Relaxed), 1);
        assert!(submitter.pending.is_empty());
    }

    #[tokio::test]
    async fn test_stale_after_target_raised() {
        let (mut submitter, board, _stats, _pool) = submitter().await;
        board.publish(job("a", true), params(U256::MAX));
        board.update_params(params(U256::from(1u64) << 200));

        assert_eq!(submitter.submit(share("a", 0x10)).await.unwrap(), SubmitOutcome::Stale);
        assert_eq!(submitter.submit(share("a", 0x00)).await.unwrap(), SubmitOutcome::Sent(100));
    }

    #[test]
    fn test_pending_resolve_once() {
        let pending = PendingSubmits::new();
        pending.insert(
            100,
            PendingShare {
                job_id: "a".into(),
                worker_id: 0,
                difficulty: 1,
                sent_at: Instant::now(),
            },
        );
        assert_eq!(pending.resolve(100).unwrap().job_id, "a");
        assert!(pending.resolve(100).is_none());
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Share submission task.
//   - Drains the worker channel; stale shares are dropped and counted.
//   - Submit ids start at 100 and are registered for the listener to resolve.
