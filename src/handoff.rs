//! File-based wallet handoff.
//!
//! Each request is written as `<id>.request.json` in a directory the wallet
//! watches. The wallet answers with `<id>.response.json`; we poll for it until
//! the wallet timeout and then remove both files. A request nobody answers is
//! treated as cancelled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Network;
use crate::error::{Result, TipJarError};
use crate::tx::ContractCall;
use crate::types::TxOutcome;
use crate::wallet::{AppDetails, UserData, Wallet};

const DEFAULT_POLL_MS: u64 = 250;

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HandoffRequest<'a> {
    Connect {
        id: &'a str,
        app: &'a AppDetails,
        network: Network,
    },
    ContractCall {
        id: &'a str,
        app: &'a AppDetails,
        network: Network,
        call: &'a ContractCall,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HandoffResponse {
    Approved {
        #[serde(default)]
        stx_address: Option<UserData>,
        #[serde(default)]
        txid: Option<String>,
    },
    Rejected {
        #[serde(default)]
        reason: Option<String>,
    },
}

pub struct HandoffWallet {
    dir: PathBuf,
    network: Network,
    timeout: Duration,
    poll: Duration,
}

fn next_request_id() -> String {
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        std::process::id(),
        REQUEST_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

fn io_err(what: &str, path: &Path, e: std::io::Error) -> TipJarError {
    TipJarError::Wallet(format!("{what} {}: {e}", path.display()))
}

impl HandoffWallet {
    pub fn new(dir: impl Into<PathBuf>, network: Network, timeout_ms: u64) -> Self {
        Self {
            dir: dir.into(),
            network,
            timeout: Duration::from_millis(timeout_ms),
            poll: Duration::from_millis(DEFAULT_POLL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_ms: u64) -> Self {
        self.poll = Duration::from_millis(poll_ms.max(1));
        self
    }

    pub fn request_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.request.json"))
    }

    pub fn response_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.response.json"))
    }

    /// Write the request, wait for the answer, clean up either way.
    async fn exchange(&self, id: &str, request: &HandoffRequest<'_>) -> Result<HandoffResponse> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err("create", &self.dir, e))?;

        let body = serde_json::to_vec_pretty(request)
            .map_err(|e| TipJarError::Wallet(format!("encode request: {e}")))?;
        let req_path = self.request_path(id);
        // Written under a temp name so the wallet never sees a partial file.
        let tmp_path = self.dir.join(format!("{id}.request.json.tmp"));
        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| io_err("write", &tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &req_path)
            .await
            .map_err(|e| io_err("rename", &tmp_path, e))?;
        log::info!("Waiting for wallet: {}", req_path.display());

        let resp_path = self.response_path(id);
        let answer = tokio::time::timeout(self.timeout, self.wait_for(&resp_path)).await;

        for p in [&req_path, &resp_path] {
            if let Err(e) = tokio::fs::remove_file(p).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove {}: {e}", p.display());
                }
            }
        }

        match answer {
            Ok(resp) => resp,
            Err(_) => Err(TipJarError::UserRejected(format!(
                "no answer from wallet within {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    async fn wait_for(&self, path: &Path) -> Result<HandoffResponse> {
        loop {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(resp) => return Ok(resp),
                    // The wallet may still be writing it.
                    Err(e) => log::debug!("response not ready ({e})"),
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err("read", path, e)),
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

fn rejected(reason: Option<String>) -> TipJarError {
    TipJarError::UserRejected(reason.unwrap_or_else(|| "declined".to_string()))
}

#[async_trait]
impl Wallet for HandoffWallet {
    async fn connect(&self, app: &AppDetails) -> Result<UserData> {
        let id = next_request_id();
        let req = HandoffRequest::Connect {
            id: &id,
            app,
            network: self.network,
        };
        match self.exchange(&id, &req).await? {
            HandoffResponse::Approved {
                stx_address: Some(user),
                ..
            } => Ok(user),
            HandoffResponse::Approved { .. } => Err(TipJarError::Wallet(
                "connect approved without stx_address".into(),
            )),
            HandoffResponse::Rejected { reason } => Err(rejected(reason)),
        }
    }

    async fn sign_and_broadcast(&self, app: &AppDetails, call: &ContractCall) -> Result<TxOutcome> {
        let id = next_request_id();
        let req = HandoffRequest::ContractCall {
            id: &id,
            app,
            network: self.network,
            call,
        };
        match self.exchange(&id, &req).await? {
            HandoffResponse::Approved {
                txid: Some(txid), ..
            } if !txid.is_empty() => Ok(TxOutcome { txid }),
            HandoffResponse::Approved { .. } => {
                Err(TipJarError::Wallet("call approved without txid".into()))
            }
            HandoffResponse::Rejected { reason } => Err(rejected(reason)),
        }
    }
}
