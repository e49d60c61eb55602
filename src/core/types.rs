// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines core data structures for the miner, located in the core
// subdirectory. It includes command-line arguments, the resolved miner
// configuration, pool jobs, session parameters and shares.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: clap, serde, core::difficulty, core::pow

use crate::core::difficulty::{TargetSource, U256};
use crate::core::error::MinerError;
use crate::core::pow::Algorithm;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Command-line arguments for the miner
#[derive(Parser, Debug)]
#[command(
    name = "strata-miner",
    version,
    about = "Stratum V1 pool mining client with concurrent CPU workers",
    long_about = "Strata Miner connects to a Stratum V1 pool, subscribes and authorizes,\n\
                  then searches for shares on every CPU thread and submits them back.\n\n\
                  Examples:\n\
                    strata-miner -o stratum+tcp://pool.example.com:3333 -u WALLET -p x\n\
                    strata-miner -o 127.0.0.1:3333 -u WALLET --threads 4 --algo sha3x\n\
                    strata-miner -o pool.example.com:3333 -u WALLET --partition nonce-range --read-timeout 300"
)]
pub struct Args {
    /// Mining pool address in format hostname:port, ip:port or stratum+tcp://host:port
    #[arg(short = 'o', long = "pool", value_name = "HOST:PORT")]
    pub pool: Option<String>,

    /// Wallet address (pool username) credited for shares
    #[arg(short = 'u', long = "wallet", value_name = "ADDRESS")]
    pub wallet: Option<String>,

    /// Pool password (often 'x' or coin/worker options such as c=RVN)
    #[arg(short = 'p', long = "password", value_name = "PASSWORD", default_value = "x")]
    pub password: String,

    /// Number of worker threads, 0 = one per logical CPU
    #[arg(short, long, default_value = "0", value_name = "COUNT")]
    pub threads: usize,

    /// Proof-of-work hash algorithm
    #[arg(long, default_value = "sha256d", value_name = "ALGO", help = "Hash algorithm (sha256d, sha3x)")]
    pub algo: String,

    /// How workers split the search space
    #[arg(
        long,
        default_value = "extranonce2",
        value_name = "POLICY",
        help = "Search partitioning (extranonce2, nonce-range)"
    )]
    pub partition: String,

    /// Seconds without any pool message before the connection is declared dead, 0 = wait forever
    #[arg(long, default_value = "0", value_name = "SECONDS")]
    pub read_timeout: u64,

    /// Seconds allowed for the TCP connect
    #[arg(long, default_value = "10", value_name = "SECONDS")]
    pub connect_timeout: u64,

    /// Seconds between hashrate reports in the log
    #[arg(long, default_value = "30", value_name = "SECONDS")]
    pub stats_interval: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

impl Args {
    /// Validate arguments and return helpful errors
    pub fn validate(&self) -> Result<(), String> {
        let wallet = self
            .wallet
            .as_deref()
            .ok_or_else(|| "Wallet address is required. Use --wallet YOUR_ADDRESS".to_string())?;
        if wallet.trim().is_empty() {
            return Err("Wallet address cannot be empty".to_string());
        }

        let pool = self
            .pool
            .as_deref()
            .ok_or_else(|| "Pool address is required. Use --pool HOST:PORT".to_string())?;
        parse_pool_address(pool).map_err(|e| e.to_string())?;

        Algorithm::from_str(&self.algo).map_err(|e| e.to_string())?;
        PartitionPolicy::from_str(&self.partition).map_err(|e| e.to_string())?;

        if self.threads > 1024 {
            return Err("Thread count cannot exceed 1024".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("Connect timeout must be greater than 0 seconds".to_string());
        }
        if self.stats_interval == 0 {
            return Err("Stats interval must be greater than 0 seconds".to_string());
        }

        Ok(())
    }

    /// Resolve the arguments into a miner configuration
    pub fn into_config(self) -> Result<MinerConfig, MinerError> {
        self.validate().map_err(MinerError::Config)?;

        let pool = self.pool.unwrap_or_default();
        let (pool_host, pool_port) = parse_pool_address(&pool)?;
        let threads = if self.threads == 0 { num_cpus::get() } else { self.threads };

        Ok(MinerConfig {
            pool_host,
            pool_port,
            wallet: self.wallet.unwrap_or_default(),
            password: self.password,
            threads,
            algorithm: self.algo.parse()?,
            partition: self.partition.parse()?,
            read_timeout: (self.read_timeout > 0).then(|| Duration::from_secs(self.read_timeout)),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            stats_interval: Duration::from_secs(self.stats_interval),
        })
    }
}

/// Split a pool address into host and port, accepting stratum+tcp:// and tcp:// prefixes
pub fn parse_pool_address(pool: &str) -> Result<(String, u16), MinerError> {
    let address = pool
        .strip_prefix("stratum+tcp://")
        .or_else(|| pool.strip_prefix("tcp://"))
        .unwrap_or(pool)
        .trim_end_matches('/');

    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        MinerError::Config(format!(
            "Pool address must be in format HOST:PORT (e.g., pool.example.com:3333), got {:?}",
            pool
        ))
    })?;
    if host.is_empty() {
        return Err(MinerError::Config(format!("Pool host is empty in {:?}", pool)));
    }
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| MinerError::Config(format!("Pool port must be a valid number (1-65535), got {:?}", port)))?;

    Ok((host.to_string(), port))
}

/// How concurrent workers keep their search spaces disjoint.
///
/// Every policy gives each worker a distinct extranonce2 for the same job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionPolicy {
    /// Distinct extranonce2 per worker; each worker scans the whole nonce space
    #[default]
    Extranonce2,
    /// Distinct extranonce2 per worker and a disjoint slice of the nonce space
    NonceRange,
}

impl FromStr for PartitionPolicy {
    type Err = MinerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "extranonce2" => Ok(PartitionPolicy::Extranonce2),
            "nonce-range" | "nonce_range" => Ok(PartitionPolicy::NonceRange),
            other => Err(MinerError::Config(format!("unknown partition policy: {}", other))),
        }
    }
}

/// Resolved settings for one mining session
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub pool_host: String,
    pub pool_port: u16,
    pub wallet: String,
    pub password: String,
    /// Worker thread count (already resolved, never 0)
    pub threads: usize,
    pub algorithm: Algorithm,
    pub partition: PartitionPolicy,
    /// None blocks on the socket indefinitely
    pub read_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub stats_interval: Duration,
}

impl MinerConfig {
    pub fn new(pool_host: impl Into<String>, pool_port: u16, wallet: impl Into<String>) -> Self {
        Self {
            pool_host: pool_host.into(),
            pool_port,
            wallet: wallet.into(),
            password: "x".to_string(),
            threads: num_cpus::get(),
            algorithm: Algorithm::Sha256d,
            partition: PartitionPolicy::default(),
            read_timeout: None,
            connect_timeout: Duration::from_secs(10),
            stats_interval: Duration::from_secs(30),
        }
    }

    pub fn pool_address(&self) -> String {
        format!("{}:{}", self.pool_host, self.pool_port)
    }
}

/// A unit of work announced by mining.notify.
///
/// Hex fields are kept exactly as the pool sent them and decoded by the
/// workers; a malformed field then only costs one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    /// Previous block hash (32 bytes hex)
    pub prevhash: String,
    /// Coinbase part before the extranonces (hex)
    pub coinb1: String,
    /// Coinbase part after the extranonces (hex)
    pub coinb2: String,
    /// Merkle branch hashes, folded in order (32 bytes hex each)
    pub merkle_branch: Vec<String>,
    /// Block version (4 bytes hex)
    pub version: String,
    /// Compact network target (4 bytes hex)
    pub nbits: String,
    /// Block time (4 bytes hex)
    pub ntime: String,
    /// Work on earlier jobs is worthless once this is set
    pub clean_jobs: bool,
}

/// Per-session values negotiated with the pool
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Pool-assigned extranonce1 (hex)
    pub extranonce1: String,
    /// Byte length of the miner-chosen extranonce2
    pub extranonce2_size: usize,
    /// Share target; a hash must be strictly below it
    pub target: U256,
    pub target_source: TargetSource,
}

/// A found share ready for submission
#[derive(Debug, Clone)]
pub struct Share {
    pub job_id: String,
    /// Fixed-width hex, 2 * extranonce2_size characters
    pub extranonce2: String,
    /// ntime hex as received in the job
    pub ntime: String,
    pub nonce: u32,
    /// Worker that found this share
    pub worker_id: usize,
    /// Header hash, kept for logs only
    pub hash: [u8; 32],
    /// Share difficulty relative to difficulty 1
    pub difficulty: u64,
}

impl Share {
    /// Nonce as submitted: 8 hex characters, same bytes as in the header
    pub fn nonce_hex(&self) -> String {
        format!("{:08x}", self.nonce)
    }
}


// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 pool client types.
//   - Replaced the benchmark/SV2/web Args with pool, wallet, partition and
//     timeout options; added MinerConfig resolved from Args.
//   - Job now mirrors the nine mining.notify fields; added SessionParams.
//   - Share carries extranonce2, ntime and a 32-bit nonce for mining.submit.
//   - Algorithm moved to core/pow.rs.
// - v1.1.1-web (2025-06-22): Added web dashboard support.
