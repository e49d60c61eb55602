// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/protocol.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file builds the Stratum V1 requests the miner sends to the pool,
// located in the pool subdirectory: subscribe, authorize and submit.
//
// Tree Location:
// - src/pool/protocol.rs (Stratum request construction)
// - Depends on: serde_json, crate::core::types

use crate::core::types::Share;
use serde_json::{Value, json};

/// First id handed out to mining.submit requests
pub const FIRST_SUBMIT_ID: u64 = 100;

/// Constructs messages for the Stratum protocol
pub struct StratumProtocol;

impl StratumProtocol {
    /// mining.subscribe with empty params
    pub fn create_subscribe_request(id: u64) -> Value {
        json!({
            "id": id,
            "method": "mining.subscribe",
            "params": []
        })
    }

    /// mining.authorize with [wallet, password]
    pub fn create_authorize_request(id: u64, wallet: &str, password: &str) -> Value {
        json!({
            "id": id,
            "method": "mining.authorize",
            "params": [wallet, password]
        })
    }

    /// mining.submit with [wallet, job_id, extranonce2, ntime, nonce]
    pub fn create_submit_request(id: u64, wallet: &str, share: &Share) -> Value {
        json!({
            "id": id,
            "method": "mining.submit",
            "params": [
                wallet,
                share.job_id,
                share.extranonce2,
                share.ntime,
                share.nonce_hex()
            ]
        })
    }
}


// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 only.
//   - Subscribe sends empty params; authorize sends the configured password.
//   - Submit sends [wallet, job_id, extranonce2, ntime, nonce] from a Share.
//   - Removed the Tari login/submit variants and to_message; framing now lives
//     in the transport.
// - v1.0.2 (2025-06-23): Fixed algo field format for pool compatibility.
