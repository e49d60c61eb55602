// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 1.3.1
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the 256-bit target arithmetic for the miner, located in
// the core subdirectory. It decodes compact nbits, converts pool difficulty
// overrides into targets and compares hashes against the active target.

use crate::core::error::MinerError;
use log::{debug, warn};
use std::fmt;
use uint::construct_uint;

const LOG_TARGET: &str = "strata::miner::difficulty";

construct_uint! {
    pub struct U256(4);
}

/// Difficulty-1 target (compact 0x1d00ffff)
pub const MAX_TARGET: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Fixed-point scale applied to fractional pool difficulties
const DIFFICULTY_SCALE: u64 = 1_000_000;

pub fn max_target() -> U256 {
    U256::from_big_endian(&MAX_TARGET)
}

/// Compact ("nbits") target representation: top byte exponent, low three
/// bytes coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compact {
    pub exponent: u8,
    pub coefficient: u32,
}

impl Compact {
    pub fn from_u32(bits: u32) -> Self {
        Self {
            exponent: (bits >> 24) as u8,
            coefficient: bits & 0x00FF_FFFF,
        }
    }

    /// Parse the 4-byte hex form sent in mining.notify.
    pub fn from_hex(nbits_hex: &str) -> crate::Result<Self> {
        if nbits_hex.len() != 8 {
            return Err(MinerError::Protocol(format!(
                "nbits must be 8 hex characters, got {:?}",
                nbits_hex
            )));
        }
        let bits = u32::from_str_radix(nbits_hex, 16)
            .map_err(|e| MinerError::Protocol(format!("invalid nbits {:?}: {}", nbits_hex, e)))?;
        Ok(Self::from_u32(bits))
    }

    pub fn to_u32(self) -> u32 {
        ((self.exponent as u32) << 24) | (self.coefficient & 0x00FF_FFFF)
    }

    /// Expand to a full target: coefficient * 2^(8 * (exponent - 3)).
    pub fn to_target(self) -> crate::Result<U256> {
        if self.coefficient == 0 {
            return Err(MinerError::Protocol(format!(
                "nbits {:08x} has a zero coefficient",
                self.to_u32()
            )));
        }
        if self.coefficient & 0x0080_0000 != 0 {
            return Err(MinerError::Protocol(format!(
                "nbits {:08x} encodes a negative target",
                self.to_u32()
            )));
        }

        let exponent = self.exponent as usize;
        let coefficient = U256::from(self.coefficient);
        if exponent <= 3 {
            return Ok(coefficient >> (8 * (3 - exponent)));
        }

        let coefficient_bytes = (32 - self.coefficient.leading_zeros() as usize).div_ceil(8);
        if exponent - 3 + coefficient_bytes > 32 {
            return Err(MinerError::Protocol(format!(
                "nbits {:08x} overflows 256 bits",
                self.to_u32()
            )));
        }
        Ok(coefficient << (8 * (exponent - 3)))
    }

    /// Canonical compact encoding of a target.
    pub fn from_target(target: U256) -> Self {
        let mut size = target.bits().div_ceil(8);
        let mut coefficient = if size <= 3 {
            target.low_u64() << (8 * (3 - size))
        } else {
            (target >> (8 * (size - 3))).low_u64()
        };
        if coefficient & 0x0080_0000 != 0 {
            coefficient >>= 8;
            size += 1;
        }
        Self {
            exponent: size as u8,
            coefficient: coefficient as u32,
        }
    }
}

/// Where the active share target came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetSource {
    Nbits(u32),
    Difficulty(f64),
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSource::Nbits(bits) => write!(f, "nbits {:08x}", bits),
            TargetSource::Difficulty(difficulty) => write!(f, "difficulty {}", difficulty),
        }
    }
}

/// Resolve the share target for a job.
///
/// An active difficulty override wins over the job's nbits.
pub fn compute_target(nbits_hex: &str, difficulty_override: Option<f64>) -> crate::Result<(U256, TargetSource)> {
    if let Some(difficulty) = difficulty_override {
        let target = difficulty_to_target(difficulty)?;
        return Ok((target, TargetSource::Difficulty(difficulty)));
    }
    let compact = Compact::from_hex(nbits_hex)?;
    let target = compact.to_target()?;
    debug!(target: LOG_TARGET, "nbits={} -> target={:064x}", nbits_hex, target);
    Ok((target, TargetSource::Nbits(compact.to_u32())))
}

/// Convert a pool share difficulty into a target: MAX_TARGET / difficulty.
pub fn difficulty_to_target(difficulty: f64) -> crate::Result<U256> {
    if !difficulty.is_finite() || difficulty <= 0.0 {
        warn!(target: LOG_TARGET, "Invalid pool difficulty: {}", difficulty);
        return Err(MinerError::Protocol(format!("invalid difficulty {}", difficulty)));
    }
    let scaled = ((difficulty * DIFFICULTY_SCALE as f64).round() as u64).max(1);
    let target = max_target() * U256::from(DIFFICULTY_SCALE) / U256::from(scaled);
    debug!(target: LOG_TARGET, "Difficulty {} -> target: {:064x}", difficulty, target);
    Ok(target)
}

/// A hash, read as a big-endian integer, must be strictly below the target.
pub fn hash_meets_target(hash: &[u8; 32], target: &U256) -> bool {
    U256::from_big_endian(hash) < *target
}

/// Share difficulty of a hash relative to the difficulty-1 target.
pub fn calculate_difficulty(hash: &[u8; 32]) -> u64 {
    let hash_value = U256::from_big_endian(hash);
    if hash_value.is_zero() {
        return u64::MAX;
    }
    let quotient = max_target() / hash_value;
    if quotient > U256::from(u64::MAX) {
        u64::MAX
    } else {
        quotient.low_u64()
    }
}


// Changelog:
// - v1.3.1 (2025-07-09): Signatures spell out crate::Result so the alias
//   does not leak into the construct_uint! expansion.
// - v1.3.0 (2025-07-02): Stratum V1 target handling.
//   - Added Compact with exact exponent/coefficient round-trip, validation
//     and canonical encoding.
//   - Added compute_target with difficulty override precedence.
//   - difficulty_to_target now returns MAX_TARGET / difficulty in fixed point
//     so fractional pool difficulties are honoured.
//   - hash_meets_target compares 32-byte hashes strictly below the target.
// - v1.2.10 (2025-06-19): Fixed SHA-256 target calculation for share validation.
//   - Switched to from_big_endian for targets and hashes.
