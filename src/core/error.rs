// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/error.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the error taxonomy shared by the pool client, the job
// listener and the mining workers, located in the core subdirectory.
//
// Tree Location:
// - src/core/error.rs (error types)
// - Depends on: thiserror, serde_json

use thiserror::Error;

/// Errors raised by the miner.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Cannot establish or maintain the pool connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool closed the connection (end of stream)
    #[error("Connection closed by pool")]
    ConnectionClosed,

    /// Socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unexpected message shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Line was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// mining.authorize returned false or an error
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Malformed job field found while building work
    #[error("Computation error: {0}")]
    Computation(String),

    /// Invalid command-line or library configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MinerError {
    /// Whether this error must end the session.
    ///
    /// Only a computation error is confined to one attempt.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MinerError::Computation(_))
    }

    /// Whether this error came from the transport rather than message content.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            MinerError::Connection(_) | MinerError::ConnectionClosed | MinerError::Io(_)
        )
    }
}

impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::Computation(format!("invalid hex: {}", e))
    }
}


// Changelog:
// - v1.0.0 (2025-07-02): Initial error taxonomy.
//   - Connection, protocol, authorization and computation errors with
//     fatality and transport-loss classification.
