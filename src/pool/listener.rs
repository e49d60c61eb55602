// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/listener.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the job listener, located in the pool subdirectory.
// It is the only reader of the pool connection after the handshake: it
// publishes new jobs and session changes to the job board and logs the
// pool's verdict on submitted shares.
//
// Tree Location:
// - src/pool/listener.rs (pool message loop)
// - Depends on: log, pool::{client, messages, session, submitter}, miner::{job_board, stats}

use crate::core::types::Job;
use crate::miner::job_board::JobBoard;
use crate::miner::stats::MinerStats;
use crate::pool::client::PoolReader;
use crate::pool::messages::{PoolMessage, describe_error, parse_pool_message};
use crate::pool::session::SessionState;
use crate::pool::submitter::PendingSubmits;
use crate::Result;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const LOG_TARGET: &str = "strata::miner::pool::listener";

pub struct JobListener {
    reader: PoolReader,
    state: SessionState,
    board: Arc<JobBoard>,
    stats: Arc<MinerStats>,
    pending: Arc<PendingSubmits>,
    running: Arc<AtomicBool>,
    backlog: Vec<PoolMessage>,
}

impl JobListener {
    pub fn new(
        reader: PoolReader,
        state: SessionState,
        board: Arc<JobBoard>,
        stats: Arc<MinerStats>,
        pending: Arc<PendingSubmits>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            state,
            board,
            stats,
            pending,
            running,
            backlog: Vec::new(),
        }
    }

    /// Messages read during the handshake, applied before the first read
    pub fn with_backlog(mut self, backlog: Vec<PoolMessage>) -> Self {
        self.backlog = backlog;
        self
    }

    /// Read and apply pool messages until shutdown or connection loss.
    ///
    /// Malformed messages are skipped; losing the connection clears the
    /// running flag and returns the error.
    pub async fn run(mut self) -> Result<()> {
        for message in std::mem::take(&mut self.backlog) {
            self.handle_message(message);
        }

        while self.running.load(Ordering::Relaxed) {
            let value = match self.reader.receive_line().await {
                Ok(value) => value,
                Err(e) if e.is_connection_loss() => {
                    error!(target: LOG_TARGET, "Lost pool connection: {}", e);
                    self.running.store(false, Ordering::Relaxed);
                    return Err(e);
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "Skipping unreadable pool message: {}", e);
                    continue;
                }
            };

            match parse_pool_message(&value) {
                Ok(message) => self.handle_message(message),
                Err(e) => warn!(target: LOG_TARGET, "Skipping malformed pool message: {}", e),
            }
        }

        debug!(target: LOG_TARGET, "Job listener stopped");
        Ok(())
    }

    /// Apply one classified message to the session and the job board
    pub fn handle_message(&mut self, message: PoolMessage) {
        match message {
            PoolMessage::Notify(job) => self.handle_notify(job),
            PoolMessage::SetDifficulty(difficulty) => match self.state.set_difficulty(difficulty) {
                Ok(()) => {
                    info!(target: LOG_TARGET, "🎯 Pool difficulty set to {}", difficulty);
                    self.republish();
                }
                Err(e) => warn!(target: LOG_TARGET, "Ignoring mining.set_difficulty: {}", e),
            },
            PoolMessage::SetExtranonce {
                extranonce1,
                extranonce2_size,
            } => {
                info!(
                    target: LOG_TARGET,
                    "Extranonce changed: extranonce1={} extranonce2_size={}", extranonce1, extranonce2_size
                );
                self.state.set_extranonce(extranonce1, extranonce2_size);
                self.republish();
            }
            PoolMessage::ShowMessage(text) => info!(target: LOG_TARGET, "📢 Pool message: {}", text),
            PoolMessage::Response { id, result, error } => self.handle_response(id, result, error),
            PoolMessage::Other(method) => debug!(target: LOG_TARGET, "Ignoring pool method {}", method),
        }
    }

    fn handle_notify(&mut self, job: Job) {
        let params = match self.state.params_for(&job.nbits) {
            Ok(params) => params,
            Err(e) => {
                warn!(target: LOG_TARGET, "Skipping job {}: {}", job.job_id, e);
                return;
            }
        };

        self.stats.jobs_received.fetch_add(1, Ordering::Relaxed);
        info!(
            target: LOG_TARGET,
            "📋 New job {} (clean_jobs={}, {}, {} branches)",
            job.job_id,
            job.clean_jobs,
            params.target_source,
            job.merkle_branch.len()
        );
        let snapshot = self.board.publish(Arc::new(job), params);
        debug!(
            target: LOG_TARGET,
            "Published generation {} target={:064x}", snapshot.generation, snapshot.params.target
        );
    }

    /// Re-derive the current job's parameters after a session change
    fn republish(&self) {
        let Some(current) = self.board.snapshot() else {
            return;
        };
        match self.state.params_for(&current.job.nbits) {
            Ok(params) => {
                if let Some(snapshot) = self.board.update_params(params) {
                    debug!(
                        target: LOG_TARGET,
                        "Republished job {} as generation {}", snapshot.job.job_id, snapshot.generation
                    );
                }
            }
            Err(e) => warn!(target: LOG_TARGET, "Cannot retarget job {}: {}", current.job.job_id, e),
        }
    }

    fn handle_response(&self, id: Option<u64>, result: Value, error: Option<Value>) {
        let Some(pending) = id.and_then(|id| self.pending.resolve(id)) else {
            debug!(target: LOG_TARGET, "Response to unknown request {:?}: {}", id, result);
            return;
        };

        let latency = pending.sent_at.elapsed().as_millis();
        if error.is_none() && result == Value::Bool(true) {
            self.stats.shares_accepted.fetch_add(1, Ordering::Relaxed);
            info!(
                target: LOG_TARGET,
                "✅ Share accepted: thread {} job {} difficulty {} ({} ms)",
                pending.worker_id,
                pending.job_id,
                pending.difficulty,
                latency
            );
        } else {
            self.stats.shares_rejected.fetch_add(1, Ordering::Relaxed);
            let reason = error.as_ref().map(describe_error).unwrap_or_else(|| result.to_string());
            warn!(
                target: LOG_TARGET,
                "❌ Share rejected: thread {} job {}: {}", pending.worker_id, pending.job_id, reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::{TargetSource, difficulty_to_target};
    use crate::core::error::MinerError;
    use crate::pool::client::split_stream;
    use crate::pool::submitter::PendingShare;
    use serde_json::json;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    struct Harness {
        board: Arc<JobBoard>,
        stats: Arc<MinerStats>,
        pending: Arc<PendingSubmits>,
        running: Arc<AtomicBool>,
    }

    async fn make_listener() -> (JobListener, Harness, TcpStream) {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), tcp.accept());
        let (reader, _writer) = split_stream(client.unwrap(), None);
        let harness = Harness {
            board: Arc::new(JobBoard::new()),
            stats: Arc::new(MinerStats::new(1)),
            pending: Arc::new(PendingSubmits::new()),
            running: Arc::new(AtomicBool::new(true)),
        };
        let listener = JobListener::new(
            reader,
            SessionState::new("f000000f", 4),
            Arc::clone(&harness.board),
            Arc::clone(&harness.stats),
            Arc::clone(&harness.pending),
            Arc::clone(&harness.running),
        );
        (listener, harness, accepted.unwrap().0)
    }

    fn notify(id: &str, nbits: &str, clean: bool) -> PoolMessage {
        PoolMessage::Notify(Job {
            job_id: id.to_string(),
            prevhash: "00".repeat(32),
            coinb1: "01".to_string(),
            coinb2: "02".to_string(),
            merkle_branch: vec![],
            version: "20000000".to_string(),
            nbits: nbits.to_string(),
            ntime: "5f5e1000".to_string(),
            clean_jobs: clean,
        })
    }

    #[tokio::test]
    async fn test_notify_publishes_with_nbits_target() {
        let (mut listener, h, _pool) = make_listener().await;
        listener.handle_message(notify("a", "1d00ffff", true));

        let snapshot = h.board.snapshot().unwrap();
        assert_eq!(snapshot.job.job_id, "a");
        assert_eq!(snapshot.params.target_source, TargetSource::Nbits(0x1d00ffff));
        assert_eq!(h.stats.jobs_received.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_set_difficulty_retargets_current_job() {
        let (mut listener, h, _pool) = make_listener().await;
        listener.handle_message(notify("a", "1d00ffff", true));
        let before = h.board.generation();

        listener.handle_message(PoolMessage::SetDifficulty(4.0));
        let snapshot = h.board.snapshot().unwrap();
        assert_eq!(snapshot.job.job_id, "a");
        assert!(snapshot.generation > before);
        assert_eq!(snapshot.params.target, difficulty_to_target(4.0).unwrap());

        // The override outlives the job that was current when it arrived
        listener.handle_message(notify("b", "1b0404cb", false));
        let snapshot = h.board.snapshot().unwrap();
        assert_eq!(snapshot.params.target_source, TargetSource::Difficulty(4.0));
    }

    #[tokio::test]
    async fn test_difficulty_before_first_job_applies_to_it() {
        let (mut listener, h, _pool) = make_listener().await;
        listener.handle_message(PoolMessage::SetDifficulty(0.5));
        assert!(h.board.snapshot().is_none());

        listener.handle_message(notify("a", "1d00ffff", true));
        assert_eq!(
            h.board.snapshot().unwrap().params.target_source,
            TargetSource::Difficulty(0.5)
        );
    }

    #[tokio::test]
    async fn test_bad_nbits_job_is_skipped() {
        let (mut listener, h, _pool) = make_listener().await;
        listener.handle_message(notify("a", "1d00ffff", true));
        listener.handle_message(notify("b", "nothex!!", true));
        assert_eq!(h.board.snapshot().unwrap().job.job_id, "a");
    }

    #[tokio::test]
    async fn test_set_extranonce_updates_params() {
        let (mut listener, h, _pool) = make_listener().await;
        listener.handle_message(notify("a", "1d00ffff", true));
        listener.handle_message(PoolMessage::SetExtranonce {
            extranonce1: "aabb".to_string(),
            extranonce2_size: 2,
        });
        let params = &h.board.snapshot().unwrap().params;
        assert_eq!(params.extranonce1, "aabb");
        assert_eq!(params.extranonce2_size, 2);
    }

    #[tokio::test]
    async fn test_submit_responses_update_stats() {
        let (mut listener, h, _pool) = make_listener().await;
        for id in [100, 101] {
            h.pending.insert(
                id,
                PendingShare {
                    job_id: "a".into(),
                    worker_id: 0,
                    difficulty: 1,
                    sent_at: Instant::now(),
                },
            );
        }
        listener.handle_message(PoolMessage::Response {
            id: Some(100),
            result: json!(true),
            error: None,
        });
        listener.handle_message(PoolMessage::Response {
            id: Some(101),
            result: Value::Null,
            error: Some(json!([23, "Low difficulty share", null])),
        });
        listener.handle_message(PoolMessage::Response {
            id: Some(555),
            result: json!(true),
            error: None,
        });

        assert_eq!(h.stats.shares_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(h.stats.shares_rejected.load(Ordering::Relaxed), 1);
        assert!(h.pending.is_empty());
    }

    #[tokio::test]
    async fn test_run_skips_invalid_utf8_line() {
        let (listener, h, mut pool) = make_listener().await;

        let notify = json!({
            "id": null,
            "method": "mining.notify",
            "params": ["j2", "00".repeat(32), "01", "02", [], "20000000", "1d00ffff", "5f5e1000", true]
        });
        pool.write_all(b"{\"method\":\"client.show_message\",\"params\":[\"\xff\xfe\"]}\n")
            .await
            .unwrap();
        pool.write_all(format!("{}\n", notify).as_bytes()).await.unwrap();
        pool.shutdown().await.unwrap();

        assert!(matches!(listener.run().await, Err(MinerError::ConnectionClosed)));
        assert_eq!(h.board.snapshot().unwrap().job.job_id, "j2");
        assert_eq!(h.stats.jobs_received.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_run_replays_backlog_skips_garbage_and_stops_on_eof() {
        let (listener, h, mut pool) = make_listener().await;
        let listener = listener.with_backlog(vec![PoolMessage::SetDifficulty(2.0)]);

        let notify = json!({
            "id": null,
            "method": "mining.notify",
            "params": ["j1", "00".repeat(32), "01", "02", [], "20000000", "1d00ffff", "5f5e1000", true]
        });
        pool.write_all(b"garbage\n{\"method\":\"mining.notify\",\"params\":[1]}\n").await.unwrap();
        pool.write_all(format!("{}\n", notify).as_bytes()).await.unwrap();
        pool.shutdown().await.unwrap();

        let result = listener.run().await;
        assert!(matches!(result, Err(MinerError::ConnectionClosed)));
        assert!(!h.running.load(Ordering::Relaxed));

        let snapshot = h.board.snapshot().unwrap();
        assert_eq!(snapshot.job.job_id, "j1");
        assert_eq!(snapshot.params.target_source, TargetSource::Difficulty(2.0));
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Pool message loop.
//   - Publishes notify jobs and retargets on set_difficulty/set_extranonce.
//   - Correlates submit responses with pending ids for accepted/rejected stats.
//   - Malformed messages are skipped; connection loss ends the session.
