// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/work.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file builds candidate block headers from a pool job, located in the
// cpu subdirectory: coinbase assembly, merkle folding, header layout and the
// per-worker extranonce2 and nonce partitioning.
//
// Tree Location:
// - src/miner/cpu/work.rs (share construction)
// - Depends on: hex, crate::core

use crate::core::error::MinerError;
use crate::core::pow::PowHash;
use crate::core::types::{Job, PartitionPolicy, SessionParams};
use crate::Result;
use std::ops::RangeInclusive;

/// version(4) + prevhash(32) + merkle_root(32) + nbits(4) + ntime(4) + nonce(4)
pub const HEADER_LEN: usize = 80;
const NONCE_OFFSET: usize = 76;

/// Decoded, validated byte form of one WorkSnapshot
#[derive(Debug, Clone)]
pub struct WorkTemplate {
    coinb1: Vec<u8>,
    extranonce1: Vec<u8>,
    coinb2: Vec<u8>,
    merkle_branch: Vec<[u8; 32]>,
    version: [u8; 4],
    prevhash: [u8; 32],
    nbits: [u8; 4],
    ntime: [u8; 4],
    extranonce2_size: usize,
}

fn decode_field<const N: usize>(name: &str, value: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(name, value)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        MinerError::Computation(format!("{} must be {} bytes, got {}", name, N, bytes.len()))
    })
}

fn decode_hex(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| MinerError::Computation(format!("{} is not valid hex ({}): {:?}", name, e, value)))
}

impl WorkTemplate {
    /// Decode every hex field of the job; any malformed field fails the attempt
    pub fn from_snapshot(job: &Job, params: &SessionParams) -> Result<Self> {
        let merkle_branch = job
            .merkle_branch
            .iter()
            .enumerate()
            .map(|(i, branch)| decode_field::<32>(&format!("merkle_branch[{}]", i), branch))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            coinb1: decode_hex("coinb1", &job.coinb1)?,
            extranonce1: decode_hex("extranonce1", &params.extranonce1)?,
            coinb2: decode_hex("coinb2", &job.coinb2)?,
            merkle_branch,
            version: decode_field("version", &job.version)?,
            prevhash: decode_field("prevhash", &job.prevhash)?,
            nbits: decode_field("nbits", &job.nbits)?,
            ntime: decode_field("ntime", &job.ntime)?,
            extranonce2_size: params.extranonce2_size,
        })
    }

    /// coinb1 || extranonce1 || extranonce2 || coinb2
    pub fn coinbase(&self, extranonce2: &[u8]) -> Vec<u8> {
        let mut coinbase =
            Vec::with_capacity(self.coinb1.len() + self.extranonce1.len() + extranonce2.len() + self.coinb2.len());
        coinbase.extend_from_slice(&self.coinb1);
        coinbase.extend_from_slice(&self.extranonce1);
        coinbase.extend_from_slice(extranonce2);
        coinbase.extend_from_slice(&self.coinb2);
        coinbase
    }

    pub fn merkle_root(&self, hasher: &dyn PowHash, extranonce2: &[u8]) -> Result<[u8; 32]> {
        if extranonce2.len() != self.extranonce2_size {
            return Err(MinerError::Computation(format!(
                "extranonce2 must be {} bytes, got {}",
                self.extranonce2_size,
                extranonce2.len()
            )));
        }
        let coinbase_hash = hasher.hash(&self.coinbase(extranonce2));
        Ok(fold_merkle_branch(hasher, coinbase_hash, &self.merkle_branch))
    }

    /// Header with a zero nonce field
    pub fn header(&self, merkle_root: &[u8; 32]) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&self.version);
        header[4..36].copy_from_slice(&self.prevhash);
        header[36..68].copy_from_slice(merkle_root);
        header[68..72].copy_from_slice(&self.nbits);
        header[72..76].copy_from_slice(&self.ntime);
        header
    }
}

/// Fold the branch in order: root = H(root || branch)
pub fn fold_merkle_branch(hasher: &dyn PowHash, coinbase_hash: [u8; 32], branch: &[[u8; 32]]) -> [u8; 32] {
    let mut concat = [0u8; 64];
    branch.iter().fold(coinbase_hash, |root, sibling| {
        concat[..32].copy_from_slice(&root);
        concat[32..].copy_from_slice(sibling);
        hasher.hash(&concat)
    })
}

/// Write the nonce big-endian so the header bytes match the submitted hex
pub fn set_header_nonce(header: &mut [u8; HEADER_LEN], nonce: u32) {
    header[NONCE_OFFSET..].copy_from_slice(&nonce.to_be_bytes());
}

/// Extranonce2 of a worker in a given round: round * worker_count + worker_id.
///
/// Distinct for distinct workers in the same round, and never repeats across
/// rounds for the same worker.
pub fn extranonce2_value(round: u64, worker_id: usize, worker_count: usize) -> Option<u64> {
    round
        .checked_mul(worker_count as u64)?
        .checked_add(worker_id as u64)
}

/// Fixed-width big-endian extranonce2 bytes and their hex form
pub fn encode_extranonce2(value: u64, size: usize) -> Result<(Vec<u8>, String)> {
    if size == 0 {
        return Err(MinerError::Computation("extranonce2_size is zero".to_string()));
    }
    if size < 8 && value >> (8 * size) != 0 {
        return Err(MinerError::Computation(format!(
            "extranonce2 space exhausted: {} does not fit in {} bytes",
            value, size
        )));
    }

    let be = value.to_be_bytes();
    let bytes = if size >= 8 {
        let mut padded = vec![0u8; size - 8];
        padded.extend_from_slice(&be);
        padded
    } else {
        be[8 - size..].to_vec()
    };
    let encoded = hex::encode(&bytes);
    Ok((bytes, encoded))
}

/// Nonces a worker scans for one extranonce2
pub fn nonce_range(policy: PartitionPolicy, worker_id: usize, worker_count: usize) -> RangeInclusive<u32> {
    match policy {
        PartitionPolicy::Extranonce2 => 0..=u32::MAX,
        PartitionPolicy::NonceRange => {
            let count = worker_count.max(1) as u64;
            let id = (worker_id as u64).min(count - 1);
            let span = (1u64 << 32) / count;
            let start = id * span;
            let end = if id == count - 1 { u32::MAX as u64 } else { start + span - 1 };
            (start as u32)..=(end as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::{TargetSource, U256};
    use crate::core::sha256::{Sha256d, sha256d_hash};
    use std::collections::HashSet;

    fn job() -> Job {
        Job {
            job_id: "1".to_string(),
            prevhash: "11".repeat(32),
            coinb1: "aaaa".to_string(),
            coinb2: "bbbb".to_string(),
            merkle_branch: vec!["22".repeat(32), "33".repeat(32)],
            version: "20000000".to_string(),
            nbits: "1d00ffff".to_string(),
            ntime: "5f5e1000".to_string(),
            clean_jobs: true,
        }
    }

    fn params() -> SessionParams {
        SessionParams {
            extranonce1: "f000000f".to_string(),
            extranonce2_size: 4,
            target: U256::MAX,
            target_source: TargetSource::Difficulty(1.0),
        }
    }

    #[test]
    fn test_coinbase_concatenation() {
        let template = WorkTemplate::from_snapshot(&job(), &params()).unwrap();
        assert_eq!(hex::encode(template.coinbase(&[0, 0, 0, 7])), "aaaaf000000f00000007bbbb");
    }

    #[test]
    fn test_merkle_fold_is_ordered() {
        let b1 = [0x22u8; 32];
        let b2 = [0x33u8; 32];
        let coinbase_hash = sha256d_hash(b"coinbase");

        let forward = fold_merkle_branch(&Sha256d, coinbase_hash, &[b1, b2]);
        let reverse = fold_merkle_branch(&Sha256d, coinbase_hash, &[b2, b1]);

        let step1 = sha256d_hash(&[coinbase_hash.as_slice(), b1.as_slice()].concat());
        let expected = sha256d_hash(&[step1.as_slice(), b2.as_slice()].concat());
        assert_eq!(forward, expected);
        assert_ne!(forward, reverse);
    }

    #[test]
    fn test_empty_branch_is_coinbase_hash() {
        let coinbase_hash = sha256d_hash(b"coinbase");
        assert_eq!(fold_merkle_branch(&Sha256d, coinbase_hash, &[]), coinbase_hash);
    }

    #[test]
    fn test_header_layout_and_determinism() {
        let template = WorkTemplate::from_snapshot(&job(), &params()).unwrap();
        let (en2, _) = encode_extranonce2(3, 4).unwrap();
        let root = template.merkle_root(&Sha256d, &en2).unwrap();

        let mut first = template.header(&root);
        let mut second = template.header(&root);
        set_header_nonce(&mut first, 0xdeadbeef);
        set_header_nonce(&mut second, 0xdeadbeef);
        assert_eq!(first, second);

        assert_eq!(hex::encode(&first[0..4]), "20000000");
        assert_eq!(&first[4..36], &[0x11u8; 32]);
        assert_eq!(&first[36..68], &root);
        assert_eq!(hex::encode(&first[68..72]), "1d00ffff");
        assert_eq!(hex::encode(&first[72..76]), "5f5e1000");
        assert_eq!(hex::encode(&first[76..80]), "deadbeef");
    }

    #[test]
    fn test_malformed_fields_are_computation_errors() {
        let mut odd = job();
        odd.coinb1 = "abc".to_string();
        assert!(matches!(WorkTemplate::from_snapshot(&odd, &params()), Err(MinerError::Computation(_))));

        let mut short = job();
        short.prevhash = "11".repeat(31);
        assert!(matches!(WorkTemplate::from_snapshot(&short, &params()), Err(MinerError::Computation(_))));

        let mut branch = job();
        branch.merkle_branch.push("zz".repeat(32));
        assert!(matches!(WorkTemplate::from_snapshot(&branch, &params()), Err(MinerError::Computation(_))));
    }

    #[test]
    fn test_extranonce2_encoding() {
        assert_eq!(encode_extranonce2(1, 4).unwrap().1, "00000001");
        assert_eq!(encode_extranonce2(0x0102, 2).unwrap().1, "0102");
        assert_eq!(encode_extranonce2(5, 10).unwrap().1, "00000000000000000005");
        assert!(encode_extranonce2(256, 1).is_err());
        assert!(encode_extranonce2(0, 0).is_err());
    }

    #[test]
    fn test_extranonce2_distinct_across_workers_and_rounds() {
        let workers = 8;
        let mut seen = HashSet::new();
        for round in 0..32 {
            for worker in 0..workers {
                let value = extranonce2_value(round, worker, workers).unwrap();
                assert!(seen.insert(encode_extranonce2(value, 4).unwrap().1));
            }
        }
        assert!(extranonce2_value(u64::MAX, 1, 2).is_none());
    }

    #[test]
    fn test_nonce_ranges_are_disjoint_and_cover() {
        let workers = 3;
        let ranges: Vec<_> = (0..workers)
            .map(|id| nonce_range(PartitionPolicy::NonceRange, id, workers))
            .collect();
        assert_eq!(*ranges[0].start(), 0);
        assert_eq!(*ranges[workers - 1].end(), u32::MAX);
        for pair in ranges.windows(2) {
            assert_eq!(*pair[0].end() as u64 + 1, *pair[1].start() as u64);
        }
        assert_eq!(nonce_range(PartitionPolicy::Extranonce2, 2, workers), 0..=u32::MAX);
        assert_eq!(nonce_range(PartitionPolicy::NonceRange, 0, 1), 0..=u32::MAX);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Share construction.
//   - WorkTemplate decodes a job once per attempt; malformed hex is a
//     computation error.
//   - Extranonce2 partitioning by round and worker id, optional nonce slices.
