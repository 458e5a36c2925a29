//! In-memory stand-ins for the Stacks node and the wallet.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tipjar::clarity::{ClarityValue, Principal};
use tipjar::tx::ContractCall;
use tipjar::types::TxOutcome;
use tipjar::wallet::{AppDetails, UserData, Wallet};
use tipjar::{Result, TipJarError};

pub const CONTRACT: &str = "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY.tip-jar-v3";
pub const OWNER: &str = "SP3E0DQAHTXJHH5YT9TZCSBW013YXZB25QFDVXXWY";
pub const ALICE: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";
pub const BOB: &str = "SP000000000000000000002Q6VF78";
pub const TESTNET_ALICE: &str = "ST000000000000000000002AMW42H";

pub struct MockTip {
    pub tipper: &'static str,
    pub amount: u128,
    pub message: &'static str,
}

/// A tip jar contract held in memory. Every reply goes through the hex
/// encoding the real node uses.
#[derive(Default)]
pub struct MockNode {
    pub tips: Vec<MockTip>,
    /// `get-tip` indices that answer with a node error.
    pub broken: HashSet<u64>,
    /// Functions that fail outright.
    pub down: HashSet<&'static str>,
    /// Wrap results in `(ok ...)`, as some contract revisions do.
    pub wrap_ok: bool,
    pub balance: u128,
    pub calls: Mutex<Vec<String>>,
}

impl MockNode {
    pub fn with_tips(n: usize) -> Self {
        let tippers = [ALICE, BOB];
        Self {
            tips: (0..n)
                .map(|i| MockTip {
                    tipper: tippers[i % 2],
                    amount: (i as u128 + 1) * 1_000_000,
                    message: "gm",
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn reply(&self, v: ClarityValue) -> Result<ClarityValue> {
        let v = if self.wrap_ok { ClarityValue::ok(v) } else { v };
        Ok(ClarityValue::from_hex(&v.to_hex())?)
    }
}

#[async_trait]
impl tipjar::rpc_utils::ReadOnlyNode for MockNode {
    async fn call_read(
        &self,
        _contract_address: &str,
        _contract_name: &str,
        function: &str,
        args: &[ClarityValue],
        sender: &str,
    ) -> Result<ClarityValue> {
        assert_eq!(sender, OWNER, "read-only calls are sent from the contract");
        let label = match args.first() {
            Some(ClarityValue::UInt(i)) => format!("{function}({i})"),
            _ => function.to_string(),
        };
        self.calls.lock().unwrap().push(label);

        if self.down.contains(function) {
            return Err(TipJarError::Network("http 503 Service Unavailable".into()));
        }
        match function {
            "get-tip-count" => self.reply(ClarityValue::UInt(self.tips.len() as u128)),
            "get-total-tips" => self.reply(ClarityValue::UInt(
                self.tips.iter().map(|t| t.amount).sum(),
            )),
            "get-owner" => self.reply(ClarityValue::Principal(Principal::parse(OWNER)?)),
            "get-tip" => {
                let index = args[0].expect_uint()? as u64;
                if self.broken.contains(&index) {
                    return Err(TipJarError::Network("call-read failed: runtime".into()));
                }
                match self.tips.get(index as usize) {
                    None => self.reply(ClarityValue::OptionalNone),
                    Some(t) => self.reply(ClarityValue::some(ClarityValue::tuple([
                        ("tipper", ClarityValue::Principal(Principal::parse(t.tipper)?)),
                        ("amount", ClarityValue::UInt(t.amount)),
                        ("message", ClarityValue::StringUtf8(t.message.to_string())),
                        ("block", ClarityValue::UInt(100 + index as u128)),
                    ]))),
                }
            }
            other => Err(TipJarError::Network(format!("no such function {other}"))),
        }
    }

    async fn account_balance(&self, _principal: &str) -> Result<u128> {
        Ok(self.balance)
    }
}

pub enum Script {
    Approve,
    /// Approve, replying with this mainnet address as typed by the wallet.
    ApproveAs(&'static str),
    Reject(&'static str),
}

/// Wallet that answers from a script and remembers what it was asked to sign.
pub struct ScriptedWallet {
    pub script: Script,
    pub signed: Mutex<Vec<ContractCall>>,
}

impl ScriptedWallet {
    pub fn approving() -> Self {
        Self {
            script: Script::Approve,
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn approving_as(mainnet: &'static str) -> Self {
        Self {
            script: Script::ApproveAs(mainnet),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(reason: &'static str) -> Self {
        Self {
            script: Script::Reject(reason),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn signed(&self) -> Vec<ContractCall> {
        self.signed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for ScriptedWallet {
    async fn connect(&self, _app: &AppDetails) -> Result<UserData> {
        match self.script {
            Script::Approve => Ok(UserData {
                mainnet: ALICE.into(),
                testnet: TESTNET_ALICE.into(),
            }),
            Script::ApproveAs(mainnet) => Ok(UserData {
                mainnet: mainnet.into(),
                testnet: TESTNET_ALICE.into(),
            }),
            Script::Reject(r) => Err(TipJarError::UserRejected(r.into())),
        }
    }

    async fn sign_and_broadcast(&self, _app: &AppDetails, call: &ContractCall) -> Result<TxOutcome> {
        self.signed.lock().unwrap().push(call.clone());
        match self.script {
            Script::Approve | Script::ApproveAs(_) => Ok(TxOutcome {
                txid: "0x5e1f".into(),
            }),
            Script::Reject(r) => Err(TipJarError::UserRejected(r.into())),
        }
    }
}
