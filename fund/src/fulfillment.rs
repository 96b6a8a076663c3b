//! # Fulfillment Planning
//!
//! Given a fiat budget and the current NAV, computes how a batch is paid
//! down: which users receive how many stablecoin units, how many escrowed
//! tokens are burned, and whether the batch closes. Planning is pure —
//! the fund layer executes the plan (transfers, burns, queue settlement)
//! and aborts wholesale if any step fails.
//!
//! Allocation policy:
//!
//! - **Full settlement** (`refund_tokens == batch pending`): every user's
//!   entire pending amount is refunded; the batch closes.
//! - **Partial settlement** (`refund_tokens < batch pending`): each user
//!   receives `pending * refund_tokens / batch_pending`, floored. Larger
//!   pending balances receive proportionally larger shares; rounding dust
//!   stays pending — in the user's request *and* in the batch total, so
//!   conservation holds exactly and the dust is redeemable by a later
//!   round.

use serde::{Deserialize, Serialize};

use crate::config::{FIAT_DECIMALS, NAV_DECIMALS};
use crate::error::{FundError, FundResult};
use crate::fixed;
use crate::queue::Batch;

/// One user's share of a fulfillment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefundEntry {
    /// The refunded user.
    pub user: String,
    /// Escrowed token units settled (and burned) for this user.
    pub tokens: u64,
    /// Stablecoin units paid to this user.
    pub stablecoin_amount: u64,
}

/// A fully computed fulfillment, ready to execute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentPlan {
    /// The batch being paid down.
    pub batch_id: u64,
    /// Token units the fiat budget redeems at current NAV.
    pub refund_tokens: u64,
    /// Refund-stablecoin units the whole budget converts to — the
    /// liquidity the fund account must actually hold.
    pub stablecoin_required: u64,
    /// `true` when the plan exhausts the batch.
    pub closes_batch: bool,
    /// Per-user refunds in request-creation order.
    pub entries: Vec<RefundEntry>,
}

/// Token units a fiat budget redeems at the given NAV, in smallest token
/// units.
pub fn refund_tokens_for(amount: u64, nav: u64, token_decimals: u8) -> FundResult<u64> {
    let tokens_fiat_scale = fixed::convert(amount, nav, NAV_DECIMALS)?;
    fixed::align_decimals(tokens_fiat_scale, FIAT_DECIMALS, token_decimals as u32)
}

/// Stablecoin payout for a token quantity: token units are valued at NAV,
/// aligned into fiat precision, and converted through the
/// `stablecoin/fiat` feed.
fn stablecoin_for_tokens(
    tokens: u64,
    nav: u64,
    token_decimals: u8,
    rate: u64,
    rate_decimals: u32,
    stablecoin_decimals: u8,
) -> FundResult<u64> {
    let fiat_token_scale = fixed::mul_div(tokens, nav, 10u64.pow(NAV_DECIMALS))?;
    let fiat = fixed::align_decimals(fiat_token_scale, token_decimals as u32, FIAT_DECIMALS)?;
    let stable_fiat_scale = fixed::convert(fiat, rate, rate_decimals)?;
    fixed::align_decimals(stable_fiat_scale, FIAT_DECIMALS, stablecoin_decimals as u32)
}

/// Plans the fulfillment of `batch` with a fiat budget of `amount`
/// (6-decimal-shifted).
///
/// The caller has already established that the batch has pending tokens;
/// the stale-batch no-op lives at the fund layer.
///
/// # Errors
///
/// Returns [`FundError::InvalidAmount`] if the budget redeems zero
/// tokens, and [`FundError::BatchUnderflow`] if the batch sits below
/// `head` or cannot cover the redeemed quantity.
#[allow(clippy::too_many_arguments)]
pub fn plan(
    batch: &Batch,
    head: u64,
    amount: u64,
    nav: u64,
    rate: u64,
    rate_decimals: u32,
    token_decimals: u8,
    stablecoin_decimals: u8,
) -> FundResult<FulfillmentPlan> {
    let refund_tokens = refund_tokens_for(amount, nav, token_decimals)?;
    if refund_tokens == 0 {
        return Err(FundError::InvalidAmount(
            "budget redeems zero tokens at current NAV".into(),
        ));
    }

    let pending = batch.tokens_pending();
    if batch.id < head || pending < refund_tokens {
        return Err(FundError::BatchUnderflow {
            batch_id: batch.id,
            head,
            refund_tokens,
            pending,
        });
    }

    let stable_fiat_scale = fixed::convert(amount, rate, rate_decimals)?;
    let stablecoin_required =
        fixed::align_decimals(stable_fiat_scale, FIAT_DECIMALS, stablecoin_decimals as u32)?;

    let closes_batch = refund_tokens == pending;
    let mut entries = Vec::new();
    for user in batch.users() {
        let user_pending = batch.pending_for(user);
        if user_pending == 0 {
            continue;
        }
        let tokens = if closes_batch {
            user_pending
        } else {
            fixed::mul_div(user_pending, refund_tokens, pending)?
        };
        if tokens == 0 {
            // Floor share too small this round; the pending amount stays
            // queued for the next one.
            continue;
        }
        let stablecoin_amount = stablecoin_for_tokens(
            tokens,
            nav,
            token_decimals,
            rate,
            rate_decimals,
            stablecoin_decimals,
        )?;
        entries.push(RefundEntry {
            user: user.clone(),
            tokens,
            stablecoin_amount,
        });
    }

    Ok(FulfillmentPlan {
        batch_id: batch.id,
        refund_tokens,
        stablecoin_required,
        closes_batch,
        entries,
    })
}
