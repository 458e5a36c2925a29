//! Thin HTTP layer over the Stacks node API: read-only contract calls and
//! account lookups. No retries; callers decide what a failure means.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::clarity::ClarityValue;
use crate::error::{Result, TipJarError};

/// Anything that can evaluate a read-only contract function.
#[async_trait]
pub trait ReadOnlyNode: Send + Sync {
    async fn call_read(
        &self,
        contract_address: &str,
        contract_name: &str,
        function: &str,
        args: &[ClarityValue],
        sender: &str,
    ) -> Result<ClarityValue>;

    /// Spendable STX balance of `principal`, in µSTX.
    async fn account_balance(&self, principal: &str) -> Result<u128>;
}

#[derive(Clone)]
pub struct StacksNode {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl StacksNode {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TipJarError::Network(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn call_read_url(base: &str, address: &str, name: &str, function: &str) -> String {
    format!(
        "{}/v2/contracts/call-read/{}/{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(address),
        urlencoding::encode(name),
        urlencoding::encode(function)
    )
}

pub fn call_read_body(args: &[ClarityValue], sender: &str) -> Value {
    json!({
        "sender": sender,
        "arguments": args.iter().map(ClarityValue::to_hex).collect::<Vec<_>>(),
    })
}

/// Interpret a `call-read` reply: `{"okay": true, "result": "0x.."}` or
/// `{"okay": false, "cause": ".."}`.
pub fn parse_call_read_response(v: &Value) -> Result<ClarityValue> {
    match v.get("okay").and_then(Value::as_bool) {
        Some(true) => {
            let hex = v
                .get("result")
                .and_then(Value::as_str)
                .ok_or_else(|| TipJarError::Network("call-read reply has no result".into()))?;
            Ok(ClarityValue::from_hex(hex)?)
        }
        Some(false) => {
            let cause = v
                .get("cause")
                .and_then(Value::as_str)
                .unwrap_or("unknown cause");
            Err(TipJarError::Network(format!("call-read failed: {cause}")))
        }
        None => Err(TipJarError::Network("invalid call-read payload (no okay)".into())),
    }
}

/// The account endpoint reports balances as `0x`-prefixed hex u128.
pub fn parse_account_balance(v: &Value) -> Result<u128> {
    let raw = v
        .get("balance")
        .and_then(Value::as_str)
        .ok_or_else(|| TipJarError::Network("account reply has no balance".into()))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u128::from_str_radix(digits, 16)
        .map_err(|_| TipJarError::Network(format!("unparseable balance '{raw}'")))
}

#[async_trait]
impl ReadOnlyNode for StacksNode {
    async fn call_read(
        &self,
        contract_address: &str,
        contract_name: &str,
        function: &str,
        args: &[ClarityValue],
        sender: &str,
    ) -> Result<ClarityValue> {
        let url = call_read_url(&self.base_url, contract_address, contract_name, function);
        log::debug!("call-read {contract_address}.{contract_name}::{function} ({} args)", args.len());

        let res = self
            .http
            .post(&url)
            .json(&call_read_body(args, sender))
            .timeout(self.timeout)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(TipJarError::Network(format!("http {} for {function}", res.status())));
        }
        let v: Value = res.json().await?;
        parse_call_read_response(&v)
    }

    async fn account_balance(&self, principal: &str) -> Result<u128> {
        let url = format!(
            "{}/v2/accounts/{}?proof=0",
            self.base_url,
            urlencoding::encode(principal)
        );
        log::debug!("account lookup {principal}");

        let res = self.http.get(&url).timeout(self.timeout).send().await?;
        if !res.status().is_success() {
            return Err(TipJarError::Network(format!("http {} for account", res.status())));
        }
        let v: Value = res.json().await?;
        parse_account_balance(&v)
    }
}
