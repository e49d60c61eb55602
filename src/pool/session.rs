// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/session.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file drives the Stratum V1 handshake and holds the per-session values
// negotiated with the pool, located in the pool subdirectory. Notifications
// that arrive while a response is awaited are kept for the job listener.
//
// Tree Location:
// - src/pool/session.rs (handshake and session state)
// - Depends on: serde_json, log, pool::{client, messages, protocol}

use crate::core::difficulty::{self, TargetSource, U256};
use crate::core::error::MinerError;
use crate::core::types::SessionParams;
use crate::pool::client::{PoolReader, PoolWriter};
use crate::pool::messages::{PoolMessage, describe_error, parse_pool_message, parse_subscribe_result};
use crate::pool::protocol::StratumProtocol;
use crate::Result;
use log::{debug, info, warn};
use serde_json::Value;

const LOG_TARGET: &str = "strata::miner::pool::session";

/// Values that shape every job's work: extranonce and difficulty override
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub extranonce1: String,
    pub extranonce2_size: usize,
    /// Once set by mining.set_difficulty it replaces nbits until changed again
    pub difficulty_override: Option<f64>,
}

impl SessionState {
    pub fn new(extranonce1: impl Into<String>, extranonce2_size: usize) -> Self {
        Self {
            extranonce1: extranonce1.into(),
            extranonce2_size,
            difficulty_override: None,
        }
    }

    /// Share target for a job with the given nbits
    pub fn compute_target(&self, nbits: &str) -> Result<(U256, TargetSource)> {
        difficulty::compute_target(nbits, self.difficulty_override)
    }

    /// Full session parameters for a job with the given nbits
    pub fn params_for(&self, nbits: &str) -> Result<SessionParams> {
        let (target, target_source) = self.compute_target(nbits)?;
        Ok(SessionParams {
            extranonce1: self.extranonce1.clone(),
            extranonce2_size: self.extranonce2_size,
            target,
            target_source,
        })
    }

    pub fn set_difficulty(&mut self, difficulty: f64) -> Result<()> {
        difficulty::difficulty_to_target(difficulty)?;
        self.difficulty_override = Some(difficulty);
        Ok(())
    }

    pub fn set_extranonce(&mut self, extranonce1: String, extranonce2_size: usize) {
        self.extranonce1 = extranonce1;
        self.extranonce2_size = extranonce2_size;
    }
}

/// A connection going through subscribe and authorize
pub struct StratumSession {
    reader: PoolReader,
    writer: PoolWriter,
    next_id: u64,
    backlog: Vec<PoolMessage>,
}

impl StratumSession {
    pub fn new(reader: PoolReader, writer: PoolWriter) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
            backlog: Vec::new(),
        }
    }

    /// Send a request and wait for the response carrying its id.
    ///
    /// Returns (result, error); anything else read meanwhile is kept in the
    /// backlog, or logged and dropped if it cannot be parsed.
    async fn request(&mut self, message: Value) -> Result<(Value, Option<Value>)> {
        let id = message["id"].as_u64().unwrap_or_default();
        self.writer.send_line(&message).await?;

        loop {
            let value = self.reader.receive_line().await?;
            match parse_pool_message(&value) {
                Ok(PoolMessage::Response {
                    id: Some(response_id),
                    result,
                    error,
                }) if response_id == id => return Ok((result, error)),
                Ok(PoolMessage::Response { id: other, .. }) => {
                    debug!(target: LOG_TARGET, "Ignoring response {:?} while waiting for {}", other, id);
                }
                Ok(message) => {
                    debug!(target: LOG_TARGET, "Buffering {:?} received during handshake", message);
                    self.backlog.push(message);
                }
                Err(e) => warn!(target: LOG_TARGET, "Skipping malformed message during handshake: {}", e),
            }
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// mining.subscribe; returns the state seeded with the pool's extranonce
    pub async fn subscribe(&mut self) -> Result<SessionState> {
        let id = self.take_id();
        let (result, error) = self.request(StratumProtocol::create_subscribe_request(id)).await?;
        if let Some(error) = error {
            return Err(MinerError::Protocol(format!(
                "mining.subscribe failed: {}",
                describe_error(&error)
            )));
        }

        let (extranonce1, extranonce2_size) = parse_subscribe_result(&result)?;
        info!(
            target: LOG_TARGET,
            "Subscribed: extranonce1={} extranonce2_size={}", extranonce1, extranonce2_size
        );
        Ok(SessionState::new(extranonce1, extranonce2_size))
    }

    /// mining.authorize; only a literal `true` result authorizes the worker
    pub async fn authorize(&mut self, wallet: &str, password: &str) -> Result<()> {
        let id = self.take_id();
        let (result, error) = self
            .request(StratumProtocol::create_authorize_request(id, wallet, password))
            .await?;
        if let Some(error) = error {
            return Err(MinerError::Authorization(describe_error(&error)));
        }
        if result != Value::Bool(true) {
            return Err(MinerError::Authorization(format!("pool answered {}", result)));
        }
        info!(target: LOG_TARGET, "Authorized as {}", wallet);
        Ok(())
    }

    /// Hand the connection to the listener and submitter.
    ///
    /// The backlog holds notifications seen during the handshake, oldest first.
    pub fn into_parts(self) -> (PoolReader, PoolWriter, Vec<PoolMessage>) {
        (self.reader, self.writer, self.backlog)
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Stratum V1 handshake.
//   - subscribe/authorize with id-matched responses; notifications read
//     during the handshake are buffered for the listener.
//   - SessionState keeps extranonce and the persistent difficulty override.
