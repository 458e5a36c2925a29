use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::tx::TipRequest;

/// Maximum message length accepted by the contract, in characters.
pub const MAX_MESSAGE_CHARS: usize = 280;
/// How many of the newest tips the page shows.
pub const RECENT_TIPS_LIMIT: u64 = 5;
/// Sent when the user leaves the message empty.
pub const DEFAULT_MESSAGE: &str = "No message";
/// Amount field value after a successful tip (and on start).
pub const DEFAULT_AMOUNT: &str = "1";
/// Quick-pick amounts in STX.
pub const AMOUNT_PRESETS: [u32; 4] = [1, 5, 10, 25];

/// One recorded tip, as returned by `get-tip`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tip {
    pub tipper: String,
    #[serde(serialize_with = "crate::util_text::serialize_u128_as_string")]
    pub amount: u128,
    pub message: String,
    pub block: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TipStats {
    pub total_tips: u64,
    #[serde(serialize_with = "crate::util_text::serialize_u128_as_string")]
    pub total_amount: u128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub address: Option<String>,
    pub connected: bool,
    #[serde(serialize_with = "crate::util_text::serialize_option_u128_as_string")]
    pub balance: Option<u128>,
}

impl WalletState {
    pub fn connected(address: String) -> Self {
        Self {
            address: Some(address),
            connected: true,
            balance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub txid: String,
}

/// Sum of tip amounts in µSTX.
pub fn sum_amounts(tips: &[Tip]) -> u128 {
    tips.iter().map(|t| t.amount).sum()
}

/// Number of distinct tippers.
pub fn unique_tippers(tips: &[Tip]) -> usize {
    tips.iter()
        .map(|t| t.tipper.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Which piece of async work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedOp {
    Stats,
    Owner,
    Balance,
    Connect,
    Tip,
}

impl fmt::Display for FailedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailedOp::Stats => "stats",
            FailedOp::Owner => "owner",
            FailedOp::Balance => "balance",
            FailedOp::Connect => "connect",
            FailedOp::Tip => "tip",
        })
    }
}

/// Results of async work, fed back into the view state.
#[derive(Debug, Clone)]
pub enum AppEvent {
    StatsLoaded(TipStats),
    RecentTipsLoaded(Vec<Tip>),
    OwnerLoaded(String),
    BalanceLoaded { address: String, balance: u128 },
    Connected(String),
    Disconnected,
    TipSubmitted(TxOutcome),
    /// Something failed; the message is for the status line only.
    Failed { what: FailedOp, error: String },
}

/// Work the view state asks the controller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchStats,
    FetchRecentTips { count: u64 },
    FetchOwner,
    FetchBalance { address: String },
    Connect,
    Disconnect,
    SubmitTip(TipRequest),
    RefreshStatsAfterDelay,
}
