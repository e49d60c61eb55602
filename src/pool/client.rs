// Strata Miner - Free and Open Source Software Statement
//
// This project, strata-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/client.rs
// Version: 2.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the TCP transport to the mining pool, located in the
// pool subdirectory. It frames newline-delimited JSON over the socket and
// splits it into a single-owner reader and a shared, serialized writer.
//
// Tree Location:
// - src/pool/client.rs (pool TCP client logic)
// - Depends on: tokio, serde_json

use crate::core::error::MinerError;
use crate::Result;
use log::{debug, trace};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::Mutex;

const LOG_TARGET: &str = "strata::miner::pool::client";

/// Longest pool line accepted, newline included
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Pool client for establishing TCP connections to the mining pool
#[derive(Clone, Debug)]
pub struct PoolClient {
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
}

impl PoolClient {
    /// Create a new PoolClient; `read_timeout` of None blocks reads indefinitely
    pub fn new(connect_timeout: Duration, read_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            read_timeout,
        }
    }

    /// Resolve pool address from either IP:port or domain:port format
    async fn resolve_pool_address(host: &str, port: u16) -> Result<SocketAddr> {
        let pool_str = format!("{}:{}", host, port);
        if let Ok(addr) = pool_str.parse::<SocketAddr>() {
            return Ok(addr);
        }

        let mut addrs = lookup_host(pool_str.as_str())
            .await
            .map_err(|e| MinerError::Connection(format!("failed to resolve {}: {}", pool_str, e)))?;
        addrs
            .next()
            .ok_or_else(|| MinerError::Connection(format!("no addresses found for {}", pool_str)))
    }

    /// Connect to the pool and split the stream into reader and writer halves
    pub async fn connect(&self, host: &str, port: u16) -> Result<(PoolReader, PoolWriter)> {
        let addr = Self::resolve_pool_address(host, port).await?;
        debug!(target: LOG_TARGET, "Connecting to pool at {}", addr);

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                MinerError::Connection(format!(
                    "timed out connecting to {} after {}s",
                    addr,
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| MinerError::Connection(format!("failed to connect to {}: {}", addr, e)))?;
        stream.set_nodelay(true)?; // Disable Nagle's algorithm for low latency

        Ok(split_stream(stream, self.read_timeout))
    }
}

/// Wrap an established stream into the framed reader/writer pair
pub fn split_stream(stream: TcpStream, read_timeout: Option<Duration>) -> (PoolReader, PoolWriter) {
    let (read_half, write_half) = stream.into_split();
    let reader = PoolReader {
        reader: BufReader::new(read_half),
        line_buf: Vec::with_capacity(4096),
        read_timeout,
    };
    let writer = PoolWriter {
        inner: Arc::new(Mutex::new(BufWriter::new(write_half))),
    };
    (reader, writer)
}

/// Receiving half of the pool connection.
///
/// Not Clone: exactly one task owns it and reads from the pool.
pub struct PoolReader {
    reader: BufReader<OwnedReadHalf>,
    line_buf: Vec<u8>,
    read_timeout: Option<Duration>,
}

impl PoolReader {
    /// Wait for the next newline-terminated JSON value; blank lines are skipped.
    ///
    /// Lines that are not valid UTF-8 JSON, or longer than `MAX_LINE_LEN`,
    /// are consumed whole and reported as protocol errors.
    pub async fn receive_line(&mut self) -> Result<Value> {
        loop {
            self.line_buf.clear();
            let n = self.read_chunk().await?;
            if n == 0 {
                return Err(MinerError::ConnectionClosed);
            }

            if n == MAX_LINE_LEN && self.line_buf.last() != Some(&b'\n') {
                self.discard_rest_of_line().await?;
                return Err(MinerError::Protocol(format!(
                    "pool line longer than {} bytes",
                    MAX_LINE_LEN
                )));
            }

            let line = self.line_buf.trim_ascii();
            if line.is_empty() {
                continue;
            }

            trace!(target: LOG_TARGET, "rx: {}", String::from_utf8_lossy(line));
            return serde_json::from_slice(line).map_err(|e| {
                MinerError::Protocol(format!("malformed JSON ({}): {}", e, String::from_utf8_lossy(line)))
            });
        }
    }

    /// Append at most `MAX_LINE_LEN` bytes, up to and including a newline
    async fn read_chunk(&mut self) -> Result<usize> {
        let mut limited = (&mut self.reader).take(MAX_LINE_LEN as u64);
        let read = limited.read_until(b'\n', &mut self.line_buf);
        let n = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                MinerError::Connection(format!("no data from pool for {}s", limit.as_secs()))
            })??,
            None => read.await?,
        };
        Ok(n)
    }

    async fn discard_rest_of_line(&mut self) -> Result<()> {
        loop {
            self.line_buf.clear();
            if self.read_chunk().await? == 0 {
                return Err(MinerError::ConnectionClosed);
            }
            if self.line_buf.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}

/// Sending half of the pool connection.
///
/// Cloneable; every clone shares one mutex so a whole line is written and
/// flushed before any other writer can start.
#[derive(Clone)]
pub struct PoolWriter {
    inner: Arc<Mutex<BufWriter<OwnedWriteHalf>>>,
}

impl PoolWriter {
    /// Serialize `message` as one JSON line and write it
    pub async fn send_line(&self, message: &Value) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        trace!(target: LOG_TARGET, "tx: {}", line.trim_end());

        let mut writer = self.inner.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Close the write side so the pool sees end of stream
    pub async fn shutdown(&self) -> Result<()> {
        let mut writer = self.inner.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn connected_pair() -> ((PoolReader, PoolWriter), TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = PoolClient::new(Duration::from_secs(5), None);
        let (conn, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
        (conn.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_send_line_appends_newline() {
        let ((_reader, writer), mut server) = connected_pair().await;
        writer.send_line(&json!({"id": 1, "method": "mining.subscribe", "params": []})).await.unwrap();
        writer.shutdown().await.unwrap();

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert!(received.ends_with('\n'));
        assert_eq!(received.matches('\n').count(), 1);
        let value: Value = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(value["method"], "mining.subscribe");
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_interleave() {
        let ((_reader, writer), mut server) = connected_pair().await;
        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let writer = writer.clone();
            tasks.push(tokio::spawn(async move {
                let padding = "ab".repeat(2048);
                writer.send_line(&json!({"id": i, "params": [padding]})).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        writer.shutdown().await.unwrap();

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        let lines: Vec<&str> = received.lines().collect();
        assert_eq!(lines.len(), 16);
        for line in lines {
            let value: Value = serde_json::from_str(line).unwrap();
            assert!(value["id"].is_u64());
        }
    }

    #[tokio::test]
    async fn test_receive_line_skips_blank_and_detects_errors() {
        let ((mut reader, _writer), mut server) = connected_pair().await;
        server.write_all(b"\n{\"id\":1,\"result\":true}\nnot json\n").await.unwrap();
        server.shutdown().await.unwrap();

        let first = reader.receive_line().await.unwrap();
        assert_eq!(first["result"], true);
        assert!(matches!(reader.receive_line().await, Err(MinerError::Protocol(_))));
        assert!(matches!(reader.receive_line().await, Err(MinerError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_protocol_error() {
        let ((mut reader, _writer), mut server) = connected_pair().await;
        server
            .write_all(b"{\"method\":\"client.show_message\",\"params\":[\"\xff\xfe\"]}\n{\"id\":2,\"result\":true}\n")
            .await
            .unwrap();
        server.shutdown().await.unwrap();

        assert!(matches!(reader.receive_line().await, Err(MinerError::Protocol(_))));
        let next = reader.receive_line().await.unwrap();
        assert_eq!(next["id"], 2);
        assert!(matches!(reader.receive_line().await, Err(MinerError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped_whole() {
        let ((mut reader, _writer), mut server) = connected_pair().await;
        let writer = tokio::spawn(async move {
            let mut flood = vec![b'a'; MAX_LINE_LEN * 2 + 17];
            flood.push(b'\n');
            server.write_all(&flood).await.unwrap();
            server.write_all(b"{\"id\":3,\"result\":true}\n").await.unwrap();
            server.shutdown().await.unwrap();
        });

        assert!(matches!(reader.receive_line().await, Err(MinerError::Protocol(_))));
        let next = reader.receive_line().await.unwrap();
        assert_eq!(next["id"], 3);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = PoolClient::new(Duration::from_secs(5), Some(Duration::from_millis(50)));
        let (conn, accepted) = tokio::join!(client.connect("127.0.0.1", port), listener.accept());
        let (mut reader, _writer) = conn.unwrap();
        let _server = accepted.unwrap();

        assert!(matches!(reader.receive_line().await, Err(MinerError::Connection(_))));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = PoolClient::new(Duration::from_secs(5), None);
        assert!(matches!(client.connect("127.0.0.1", port).await, Err(MinerError::Connection(_))));
    }
}

// Changelog:
// - v2.1.0 (2025-07-09): Byte-oriented line reading.
//   - Invalid UTF-8 is a protocol error for that line instead of an I/O
//     failure of the connection.
//   - Lines are capped at MAX_LINE_LEN; longer ones are drained and skipped.
// - v2.0.0 (2025-07-02): Line-framed JSON transport.
//   - connect now returns a PoolReader/PoolWriter pair instead of a raw stream.
//   - PoolWriter serializes whole lines behind a shared mutex.
//   - PoolReader skips blank lines, maps EOF to ConnectionClosed and malformed
//     JSON to a protocol error, with an optional read timeout.
//   - Added connect timeout.
// - v1.1.0 (2025-06-23): Added DNS resolution support
