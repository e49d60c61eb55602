// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/messages.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file classifies messages received from the pool, located in the pool
// subdirectory. It turns raw JSON values into typed notifications and
// responses and validates the handshake result shapes.
//
// Tree Location:
// - src/pool/messages.rs (incoming message parsing)
// - Depends on: serde, serde_json, crate::core::types

use crate::core::error::MinerError;
use crate::core::types::Job;
use crate::Result;
use serde::Deserialize;
use serde_json::Value;

/// Message received from the pool
#[derive(Debug, Clone, PartialEq)]
pub enum PoolMessage {
    /// mining.notify
    Notify(Job),
    /// mining.set_difficulty
    SetDifficulty(f64),
    /// mining.set_extranonce
    SetExtranonce {
        extranonce1: String,
        extranonce2_size: usize,
    },
    /// client.show_message
    ShowMessage(String),
    /// Reply to one of our requests
    Response {
        id: Option<u64>,
        result: Value,
        error: Option<Value>,
    },
    /// Any other method; ignored
    Other(String),
}

/// Positional mining.notify parameters
#[derive(Deserialize)]
struct NotifyParams(
    String,
    String,
    String,
    String,
    Vec<String>,
    String,
    String,
    String,
    bool,
);

/// Classify one JSON value read from the pool
pub fn parse_pool_message(message: &Value) -> Result<PoolMessage> {
    if !message.is_object() {
        return Err(MinerError::Protocol(format!("expected a JSON object, got {}", message)));
    }

    if let Some(method) = message.get("method").and_then(Value::as_str) {
        let params = message.get("params").unwrap_or(&Value::Null);
        return match method {
            "mining.notify" => parse_notify(params).map(PoolMessage::Notify),
            "mining.set_difficulty" => parse_set_difficulty(params).map(PoolMessage::SetDifficulty),
            "mining.set_extranonce" => {
                let (extranonce1, extranonce2_size) = parse_extranonce_pair(params, 0)?;
                Ok(PoolMessage::SetExtranonce {
                    extranonce1,
                    extranonce2_size,
                })
            }
            "client.show_message" => Ok(PoolMessage::ShowMessage(
                params
                    .get(0)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            )),
            other => Ok(PoolMessage::Other(other.to_string())),
        };
    }

    if message.get("result").is_some() || message.get("error").is_some() {
        let error = message.get("error").filter(|e| !e.is_null()).cloned();
        return Ok(PoolMessage::Response {
            id: message.get("id").and_then(Value::as_u64),
            result: message.get("result").cloned().unwrap_or(Value::Null),
            error,
        });
    }

    Err(MinerError::Protocol(format!("unrecognized message: {}", message)))
}

/// Parse the nine positional mining.notify fields into a Job
pub fn parse_notify(params: &Value) -> Result<Job> {
    let fields = params
        .as_array()
        .ok_or_else(|| MinerError::Protocol(format!("mining.notify params must be an array, got {}", params)))?;
    if fields.len() < 9 {
        return Err(MinerError::Protocol(format!(
            "mining.notify needs 9 params, got {}",
            fields.len()
        )));
    }

    // Some pools append extra fields; only the first nine are defined
    let NotifyParams(job_id, prevhash, coinb1, coinb2, merkle_branch, version, nbits, ntime, clean_jobs) =
        serde_json::from_value(Value::Array(fields[..9].to_vec()))
            .map_err(|e| MinerError::Protocol(format!("malformed mining.notify: {}", e)))?;

    if job_id.is_empty() {
        return Err(MinerError::Protocol("mining.notify with empty job_id".to_string()));
    }

    Ok(Job {
        job_id,
        prevhash,
        coinb1,
        coinb2,
        merkle_branch,
        version,
        nbits,
        ntime,
        clean_jobs,
    })
}

/// Parse [difficulty] from mining.set_difficulty
pub fn parse_set_difficulty(params: &Value) -> Result<f64> {
    let difficulty = params
        .get(0)
        .and_then(Value::as_f64)
        .ok_or_else(|| MinerError::Protocol(format!("malformed mining.set_difficulty params: {}", params)))?;
    if !difficulty.is_finite() || difficulty <= 0.0 {
        return Err(MinerError::Protocol(format!("invalid difficulty {}", difficulty)));
    }
    Ok(difficulty)
}

/// Extract (extranonce1, extranonce2_size) from the subscribe result
pub fn parse_subscribe_result(result: &Value) -> Result<(String, usize)> {
    if !result.is_array() {
        return Err(MinerError::Protocol(format!(
            "mining.subscribe result must be an array, got {}",
            result
        )));
    }
    parse_extranonce_pair(result, 1)
}

fn parse_extranonce_pair(values: &Value, offset: usize) -> Result<(String, usize)> {
    let extranonce1 = values
        .get(offset)
        .and_then(Value::as_str)
        .ok_or_else(|| MinerError::Protocol(format!("missing extranonce1 in {}", values)))?;
    if extranonce1.len() % 2 != 0 || hex::decode(extranonce1).is_err() {
        return Err(MinerError::Protocol(format!("extranonce1 is not hex: {:?}", extranonce1)));
    }

    let extranonce2_size = values
        .get(offset + 1)
        .and_then(Value::as_u64)
        .ok_or_else(|| MinerError::Protocol(format!("missing extranonce2_size in {}", values)))?;
    if extranonce2_size == 0 || extranonce2_size > 16 {
        return Err(MinerError::Protocol(format!(
            "unsupported extranonce2_size {}",
            extranonce2_size
        )));
    }

    Ok((extranonce1.to_string(), extranonce2_size as usize))
}

/// Describe a pool error object for logs: [code, message, traceback] or any JSON
pub fn describe_error(error: &Value) -> String {
    match error {
        Value::Array(items) => {
            let code = items.first().map(|c| c.to_string()).unwrap_or_default();
            let message = items.get(1).and_then(Value::as_str).unwrap_or("unknown error");
            format!("{} (code {})", message, code)
        }
        Value::Object(map) => {
            let message = map.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            format!("{} (code {})", message, map.get("code").cloned().unwrap_or(Value::Null))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notify_json(clean: bool) -> Value {
        json!({
            "id": null,
            "method": "mining.notify",
            "params": [
                "bf",
                "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000",
                "01000000010000000000000000000000000000000000000000000000000000000000000000ffffffff20020862062f503253482f04b8864e5008",
                "072f736c7573682f000000000100f2052a010000001976a914d23fcdf86f7e756a64a7a9688ef9903327048ed988ac00000000",
                ["a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f90"],
                "00000002",
                "1c2ac4af",
                "504e86b9",
                clean
            ]
        })
    }

    #[test]
    fn test_parse_notify() {
        match parse_pool_message(&notify_json(true)).unwrap() {
            PoolMessage::Notify(job) => {
                assert_eq!(job.job_id, "bf");
                assert_eq!(job.merkle_branch.len(), 1);
                assert_eq!(job.version, "00000002");
                assert_eq!(job.nbits, "1c2ac4af");
                assert_eq!(job.ntime, "504e86b9");
                assert!(job.clean_jobs);
            }
            other => panic!("expected notify, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_notify_ignores_trailing_fields() {
        let mut message = notify_json(false);
        message["params"].as_array_mut().unwrap().push(json!("extra"));
        assert!(matches!(parse_pool_message(&message), Ok(PoolMessage::Notify(_))));
    }

    #[test]
    fn test_parse_notify_rejects_bad_shape() {
        let short = json!({"method": "mining.notify", "params": ["bf", "00"]});
        assert!(matches!(parse_pool_message(&short), Err(MinerError::Protocol(_))));

        let mut wrong_type = notify_json(false);
        wrong_type["params"][8] = json!("yes");
        assert!(matches!(parse_pool_message(&wrong_type), Err(MinerError::Protocol(_))));
    }

    #[test]
    fn test_parse_set_difficulty() {
        let message = json!({"id": null, "method": "mining.set_difficulty", "params": [0.5]});
        assert_eq!(parse_pool_message(&message).unwrap(), PoolMessage::SetDifficulty(0.5));

        let integer = json!({"method": "mining.set_difficulty", "params": [16]});
        assert_eq!(parse_pool_message(&integer).unwrap(), PoolMessage::SetDifficulty(16.0));

        let bad = json!({"method": "mining.set_difficulty", "params": [-1]});
        assert!(parse_pool_message(&bad).is_err());
    }

    #[test]
    fn test_parse_response() {
        let message = json!({"id": 101, "result": true, "error": null});
        assert_eq!(
            parse_pool_message(&message).unwrap(),
            PoolMessage::Response {
                id: Some(101),
                result: json!(true),
                error: None
            }
        );
    }

    #[test]
    fn test_parse_subscribe_result() {
        let result = json!([[["mining.notify", "ae6812eb4cd7735a302a8a9dd95cf71f"]], "08000002", 4]);
        assert_eq!(parse_subscribe_result(&result).unwrap(), ("08000002".to_string(), 4));

        assert!(parse_subscribe_result(&json!(["sub", "08000002"])).is_err());
        assert!(parse_subscribe_result(&json!(["sub", 8, 4])).is_err());
        assert!(parse_subscribe_result(&json!(["sub", "0800000", 4])).is_err());
        assert!(parse_subscribe_result(&json!(true)).is_err());
    }

    #[test]
    fn test_parse_set_extranonce() {
        let message = json!({"method": "mining.set_extranonce", "params": ["aabbccdd", 2]});
        assert_eq!(
            parse_pool_message(&message).unwrap(),
            PoolMessage::SetExtranonce {
                extranonce1: "aabbccdd".to_string(),
                extranonce2_size: 2
            }
        );
    }

    #[test]
    fn test_unknown_method_and_garbage() {
        let message = json!({"method": "mining.ping", "params": []});
        assert_eq!(parse_pool_message(&message).unwrap(), PoolMessage::Other("mining.ping".into()));
        assert!(parse_pool_message(&json!([1, 2, 3])).is_err());
        assert!(parse_pool_message(&json!({"foo": 1})).is_err());
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(describe_error(&json!([23, "Low difficulty share", null])), "Low difficulty share (code 23)");
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Stratum V1 message classification.
//   - parse_pool_message returns PoolMessage for notify, set_difficulty,
//     set_extranonce, show_message and responses.
//   - Added subscribe result validation and pool error formatting.
