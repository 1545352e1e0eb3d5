//! Persistent modem signal channel
//!
//! One unix-socket client per process lifetime, shared by every LTE
//! uplink. Creating short-lived modem clients exhausts modem bearer
//! contexts, so the connection is established once and reused; a broken
//! connection is dropped and re-dialed on the next query. Queries are
//! line-delimited JSON and rate-limited by the engine to one per modem
//! per [`MODEM_QUERY_INTERVAL_MS`].

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::error::{Result, SteerError};

/// Minimum spacing between signal queries per modem (ms)
pub const MODEM_QUERY_INTERVAL_MS: i64 = 5000;

/// One signal reading from the modem manager
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellularReading {
    #[serde(default)]
    pub rsrp_dbm: f64,

    #[serde(default)]
    pub rsrq_db: f64,

    #[serde(default)]
    pub sinr_db: f64,

    #[serde(default)]
    pub rssi_dbm: f64,

    #[serde(default)]
    pub carrier: String,

    #[serde(default)]
    pub cell_id: String,

    #[serde(default)]
    pub band: String,

    #[serde(default)]
    pub tac: String,

    #[serde(default)]
    pub connected: bool,
}

/// Modem signal seam; tests provide static readings.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn query(&self, modem_id: &str) -> Result<CellularReading>;
}

/// Production client over the modem manager's unix socket.
pub struct ModemClient {
    socket_path: PathBuf,
    conn: Mutex<Option<BufStream<UnixStream>>>,
}

impl ModemClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            conn: Mutex::new(None),
        }
    }

    async fn query_inner(&self, modem_id: &str) -> std::io::Result<CellularReading> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            let stream = UnixStream::connect(&self.socket_path).await?;
            *guard = Some(BufStream::new(stream));
        }
        let Some(stream) = guard.as_mut() else {
            return Err(std::io::Error::other("modem connection unavailable"));
        };

        let request = format!("{{\"query\":\"signal\",\"modem\":\"{}\"}}\n", modem_id);
        let result = async {
            stream.write_all(request.as_bytes()).await?;
            stream.flush().await?;
            let mut line = String::new();
            stream.read_line(&mut line).await?;
            serde_json::from_str::<CellularReading>(&line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        }
        .await;

        if result.is_err() {
            // Drop the broken connection; the next query re-dials
            *guard = None;
        }
        result
    }
}

#[async_trait]
impl SignalSource for ModemClient {
    async fn query(&self, modem_id: &str) -> Result<CellularReading> {
        self.query_inner(modem_id)
            .await
            .map_err(|e| SteerError::Modem(format!("modem {}: {}", modem_id, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixListener;

    #[test]
    fn test_reading_parse_defaults() {
        let reading: CellularReading =
            serde_json::from_str(r#"{"rsrp_dbm": -104.0, "carrier": "T-Mobile"}"#).unwrap();
        assert_eq!(reading.rsrp_dbm, -104.0);
        assert_eq!(reading.carrier, "T-Mobile");
        assert_eq!(reading.sinr_db, 0.0);
        assert!(!reading.connected);
    }

    #[tokio::test]
    async fn test_query_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("modem.sock");
        let listener = UnixListener::bind(&sock).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            assert!(request.contains("\"modem\":\"0\""));
            stream
                .write_all(
                    b"{\"rsrp_dbm\":-96.5,\"sinr_db\":9.0,\"carrier\":\"T-Mobile\",\"connected\":true}\n",
                )
                .await
                .unwrap();
        });

        let client = ModemClient::new(sock);
        let reading = client.query("0").await.unwrap();
        assert_eq!(reading.rsrp_dbm, -96.5);
        assert_eq!(reading.sinr_db, 9.0);
        assert!(reading.connected);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_query_unreachable_socket() {
        let dir = tempfile::tempdir().unwrap();
        let client = ModemClient::new(dir.path().join("missing.sock"));
        let err = client.query("0").await.unwrap_err();
        assert!(matches!(err, SteerError::Modem(_)));
    }
}
