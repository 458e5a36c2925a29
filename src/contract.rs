//! Read-only side of the tip jar contract.

use std::ops::Range;
use std::sync::Arc;

use crate::clarity::{field, ClarityValue, DecodeError};
use crate::config::ContractId;
use crate::error::Result;
use crate::rpc_utils::ReadOnlyNode;
use crate::types::{Tip, TipStats, RECENT_TIPS_LIMIT};

pub const FN_GET_TIP_COUNT: &str = "get-tip-count";
pub const FN_GET_TOTAL_TIPS: &str = "get-total-tips";
pub const FN_GET_TIP: &str = "get-tip";
pub const FN_GET_OWNER: &str = "get-owner";
pub const FN_TIP: &str = "tip";

/// Indices of the newest `limit` tips for a jar holding `count`, ascending.
/// `count = 7, limit = 5` gives `2..7`.
pub fn recent_tip_indices(count: u64, limit: u64) -> Range<u64> {
    count.saturating_sub(limit)..count
}

fn decode_u64(v: u128, what: &'static str) -> Result<u64, DecodeError> {
    u64::try_from(v).map_err(|_| DecodeError::OutOfRange(what))
}

/// Decode a `get-tip` result. `none` means no tip at that index.
pub fn decode_tip(value: ClarityValue) -> Result<Option<Tip>, DecodeError> {
    let Some(inner) = value.unwrap_response()?.into_optional()? else {
        return Ok(None);
    };
    let fields = inner.expect_tuple()?;
    Ok(Some(Tip {
        tipper: field(fields, "tipper")?.expect_principal()?.to_string(),
        amount: field(fields, "amount")?.expect_uint()?,
        message: field(fields, "message")?.expect_string()?.to_string(),
        block: decode_u64(field(fields, "block")?.expect_uint()?, "block height")?,
    }))
}

/// Client for the fixed tip jar contract. Cheap to clone.
pub struct TipJarContract<N: ReadOnlyNode> {
    node: Arc<N>,
    contract: ContractId,
}

impl<N: ReadOnlyNode> Clone for TipJarContract<N> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            contract: self.contract.clone(),
        }
    }
}

impl<N: ReadOnlyNode> TipJarContract<N> {
    pub fn new(node: N, contract: ContractId) -> Self {
        Self {
            node: Arc::new(node),
            contract,
        }
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    async fn call(&self, function: &str, args: &[ClarityValue]) -> Result<ClarityValue> {
        // Read-only calls are sent "from" the contract itself.
        self.node
            .call_read(
                &self.contract.address,
                &self.contract.name,
                function,
                args,
                &self.contract.address,
            )
            .await
    }

    pub async fn get_tip_count(&self) -> Result<u64> {
        let v = self.call(FN_GET_TIP_COUNT, &[]).await?;
        Ok(decode_u64(v.unwrap_response()?.expect_uint()?, "tip count")?)
    }

    /// Total tipped, in µSTX.
    pub async fn get_total_tips(&self) -> Result<u128> {
        let v = self.call(FN_GET_TOTAL_TIPS, &[]).await?;
        Ok(v.unwrap_response()?.expect_uint()?)
    }

    /// `None` for any index the contract has no tip for.
    pub async fn get_tip(&self, index: u64) -> Result<Option<Tip>> {
        let v = self
            .call(FN_GET_TIP, &[ClarityValue::UInt(index as u128)])
            .await?;
        Ok(decode_tip(v)?)
    }

    pub async fn get_owner(&self) -> Result<String> {
        let v = self.call(FN_GET_OWNER, &[]).await?;
        Ok(v.unwrap_response()?.expect_principal()?.to_string())
    }

    /// Count and total, fetched in parallel. Either both or neither.
    pub async fn get_stats(&self) -> Result<TipStats> {
        let (total_tips, total_amount) =
            futures::future::try_join(self.get_tip_count(), self.get_total_tips()).await?;
        Ok(TipStats {
            total_tips,
            total_amount,
        })
    }

    /// The newest tips for a jar holding `count`, newest first.
    ///
    /// Indices are read one at a time in ascending order. A failed or empty
    /// index is logged and skipped so one bad entry does not hide the rest.
    pub async fn recent_tips(&self, count: u64) -> Vec<Tip> {
        let mut tips = Vec::with_capacity(RECENT_TIPS_LIMIT as usize);
        for i in recent_tip_indices(count, RECENT_TIPS_LIMIT) {
            match self.get_tip(i).await {
                Ok(Some(tip)) => tips.push(tip),
                Ok(None) => log::debug!("no tip at index {i}"),
                Err(e) => log::warn!("Error fetching tip {i}: {e}"),
            }
        }
        tips.reverse();
        tips
    }

    pub async fn account_balance(&self, principal: &str) -> Result<u128> {
        self.node.account_balance(principal).await
    }
}
