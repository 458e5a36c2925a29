//! Building and submitting the `tip` contract call.
//!
//! Nothing is signed here. A [`ContractCall`] is a request description that
//! a [`Wallet`] signs and broadcasts; this module's job is to make sure the
//! request cannot move more (or less) STX than the user typed.

use serde::{Serialize, Serializer};

use crate::clarity::ClarityValue;
use crate::config::{ContractId, Network};
use crate::contract::FN_TIP;
use crate::error::{Result, TipJarError};
use crate::session::validate_address;
use crate::types::{TxOutcome, DEFAULT_MESSAGE, MAX_MESSAGE_CHARS};
use crate::util_text::{format_stx, parse_stx_amount};
use crate::wallet::{AppDetails, Wallet};

/// A validated tip: amount in µSTX and the message that goes on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipRequest {
    pub amount_micro: u128,
    pub message: String,
}

impl TipRequest {
    /// Validate raw form input. `min_tip` is in µSTX.
    pub fn new(amount_input: &str, message_input: &str, min_tip: u128) -> Result<Self> {
        let amount_micro = parse_stx_amount(amount_input).map_err(TipJarError::Validation)?;
        if amount_micro == 0 {
            return Err(TipJarError::Validation("amount must be positive".into()));
        }
        if amount_micro < min_tip {
            return Err(TipJarError::Validation(format!(
                "minimum tip is {} STX",
                format_stx(min_tip)
            )));
        }

        let trimmed = message_input.trim();
        let message = if trimmed.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            message_input.to_string()
        };
        let len = message.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(TipJarError::Validation(format!(
                "message is {len} characters, limit is {MAX_MESSAGE_CHARS}"
            )));
        }

        Ok(Self {
            amount_micro,
            message,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FungibleConditionCode {
    Equal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostCondition {
    /// `principal` sends exactly (per `code`) `amount` µSTX.
    Stx {
        principal: String,
        code: FungibleConditionCode,
        #[serde(serialize_with = "crate::util_text::serialize_u128_as_string")]
        amount: u128,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostConditionMode {
    Allow,
    Deny,
}

/// A state-changing contract call, as handed to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractCall {
    pub contract_address: String,
    pub contract_name: String,
    pub function_name: String,
    #[serde(serialize_with = "serialize_args_hex")]
    pub function_args: Vec<ClarityValue>,
    pub sender: String,
    pub post_conditions: Vec<PostCondition>,
    pub post_condition_mode: PostConditionMode,
    pub network: Network,
}

fn serialize_args_hex<S>(args: &[ClarityValue], s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_seq(args.iter().map(ClarityValue::to_hex))
}

/// `tip(uint amount, string-utf8 message)` with an exact-amount STX
/// post-condition on the sender and `Deny` mode.
pub fn build_tip_call(
    contract: &ContractId,
    sender: &str,
    network: Network,
    req: &TipRequest,
) -> ContractCall {
    ContractCall {
        contract_address: contract.address.clone(),
        contract_name: contract.name.clone(),
        function_name: FN_TIP.to_string(),
        function_args: vec![
            ClarityValue::UInt(req.amount_micro),
            ClarityValue::StringUtf8(req.message.clone()),
        ],
        sender: sender.to_string(),
        post_conditions: vec![PostCondition::Stx {
            principal: sender.to_string(),
            code: FungibleConditionCode::Equal,
            amount: req.amount_micro,
        }],
        post_condition_mode: PostConditionMode::Deny,
        network,
    }
}

impl ContractCall {
    /// The `uint` first argument, if there is one.
    pub fn amount(&self) -> Option<u128> {
        match self.function_args.first() {
            Some(ClarityValue::UInt(v)) => Some(*v),
            _ => None,
        }
    }

    /// Refuse calls whose post-conditions do not pin the transfer to the
    /// amount argument.
    pub fn verify(&self) -> Result<()> {
        let invalid = |m: String| Err(TipJarError::Validation(m));

        if self.post_condition_mode != PostConditionMode::Deny {
            return invalid("post-condition mode must be deny".into());
        }
        let Some(amount) = self.amount() else {
            return invalid("first argument must be a uint amount".into());
        };
        if amount == 0 {
            return invalid("amount must be positive".into());
        }
        if self.post_conditions.is_empty() {
            return invalid("missing STX post-condition".into());
        }
        for pc in &self.post_conditions {
            let PostCondition::Stx {
                principal,
                code,
                amount: pc_amount,
            } = pc;
            if *pc_amount != amount || *code != FungibleConditionCode::Equal {
                return invalid(format!(
                    "post-condition amount {pc_amount} does not match argument {amount}"
                ));
            }
            if principal != &self.sender {
                return invalid(format!("post-condition principal {principal} is not the sender"));
            }
        }

        if validate_address(&self.sender, self.network)? != self.sender {
            return invalid(format!("sender {} is not in canonical form", self.sender));
        }
        Ok(())
    }
}

/// Verify `call` and hand it to the wallet. Nothing reaches the wallet if
/// verification fails.
pub async fn submit_tip<W: Wallet + ?Sized>(
    wallet: &W,
    app: &AppDetails,
    call: &ContractCall,
) -> Result<TxOutcome> {
    call.verify()?;
    log::info!(
        "Submitting tip of {} STX to {}.{}",
        call.amount().map(format_stx).unwrap_or_default(),
        call.contract_address,
        call.contract_name
    );
    match wallet.sign_and_broadcast(app, call).await {
        Ok(outcome) => {
            log::info!("Transaction ID: {}", outcome.txid);
            Ok(outcome)
        }
        Err(e) => {
            log::warn!("Tip not sent: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONTRACT;

    const SENDER: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

    fn call_for(amount: &str) -> ContractCall {
        let req = TipRequest::new(amount, "gm", 1).unwrap();
        let contract: ContractId = DEFAULT_CONTRACT.parse().unwrap();
        build_tip_call(&contract, SENDER, Network::Mainnet, &req)
    }

    #[test]
    fn request_defaults_and_limits() {
        let r = TipRequest::new("1.5", "   ", 1).unwrap();
        assert_eq!(r.amount_micro, 1_500_000);
        assert_eq!(r.message, DEFAULT_MESSAGE);

        assert!(TipRequest::new("0", "", 1).is_err());
        assert!(TipRequest::new("0.0000001", "", 1).is_err());
        assert!(TipRequest::new("abc", "", 1).is_err());
        assert!(TipRequest::new("0.5", "", 1_000_000).is_err());

        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            TipRequest::new("1", &long, 1),
            Err(TipJarError::Validation(_))
        ));
        let exact = "☕".repeat(MAX_MESSAGE_CHARS);
        assert!(TipRequest::new("1", &exact, 1).is_ok());
    }

    #[test]
    fn post_condition_matches_floored_amount() {
        let call = call_for("4.3500009");
        assert_eq!(call.amount(), Some(4_350_000));
        assert_eq!(
            call.post_conditions,
            vec![PostCondition::Stx {
                principal: SENDER.into(),
                code: FungibleConditionCode::Equal,
                amount: 4_350_000,
            }]
        );
        assert_eq!(call.post_condition_mode, PostConditionMode::Deny);
        assert_eq!(call.function_name, "tip");
        assert!(call.verify().is_ok());
    }

    #[test]
    fn verify_rejects_tampered_calls() {
        let mut call = call_for("1");
        call.post_conditions = vec![PostCondition::Stx {
            principal: SENDER.into(),
            code: FungibleConditionCode::Equal,
            amount: 2_000_000,
        }];
        assert!(matches!(call.verify(), Err(TipJarError::Validation(_))));

        let mut call = call_for("1");
        call.post_condition_mode = PostConditionMode::Allow;
        assert!(call.verify().is_err());

        let mut call = call_for("1");
        call.post_conditions.clear();
        assert!(call.verify().is_err());

        let mut call = call_for("1");
        call.network = Network::Testnet;
        assert!(call.verify().is_err());

        let req = TipRequest::new("1", "gm", 1).unwrap();
        let lower = SENDER.to_lowercase();
        let contract: ContractId = DEFAULT_CONTRACT.parse().unwrap();
        let call = build_tip_call(&contract, &lower, Network::Mainnet, &req);
        assert!(matches!(call.verify(), Err(TipJarError::Validation(_))));
    }

    #[test]
    fn serializes_args_as_hex() {
        let json = serde_json::to_value(call_for("1")).unwrap();
        assert_eq!(json["function_args"][0], "0x01000000000000000000000000000f4240");
        assert_eq!(json["post_condition_mode"], "deny");
        assert_eq!(json["post_conditions"][0]["type"], "stx");
        assert_eq!(json["post_conditions"][0]["amount"], "1000000");
        assert_eq!(json["network"], "mainnet");
    }
}
