//! # Purchase Quoting
//!
//! Converts a stablecoin deposit into claim-token units at the current
//! NAV. Pure math — the fund layer supplies the NAV and the oracle rate,
//! then performs the supply-ceiling check, the deposit pull, and the mint
//! around the quote.
//!
//! Pipeline: NAV (fiat per token, 6 decimals) is converted into the
//! deposit currency through the `deposit/fiat` feed, the deposit amount
//! is aligned to token precision, and the aligned deposit is divided by
//! the deposit-denominated NAV.

use serde::{Deserialize, Serialize};

use crate::config::NAV_DECIMALS;
use crate::error::{FundError, FundResult};
use crate::fixed;

/// The result of quoting a deposit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseQuote {
    /// NAV re-expressed in the deposit currency, 6-decimal fixed-point.
    pub nav_in_deposit: u64,
    /// Claim-token units the deposit mints, in smallest token units.
    pub tokens_to_mint: u64,
}

/// Quotes `deposit_amount` of a deposit currency against the current NAV.
///
/// `rate`/`rate_decimals` come from the `deposit/fiat` price feed (fiat
/// units per deposit unit, decimal-shifted).
///
/// # Errors
///
/// Returns [`FundError::InvalidAmount`] for a zero deposit or a deposit
/// too small to mint a single token unit, and propagates fixed-point
/// errors ([`FundError::AmountOverflow`], zero rate).
pub fn quote(
    nav: u64,
    rate: u64,
    rate_decimals: u32,
    deposit_amount: u64,
    deposit_decimals: u8,
    token_decimals: u8,
) -> FundResult<PurchaseQuote> {
    if deposit_amount == 0 {
        return Err(FundError::InvalidAmount("zero deposit".into()));
    }

    let nav_in_deposit = fixed::convert(nav, rate, rate_decimals)?;
    if nav_in_deposit == 0 {
        // A rate large enough to floor NAV to zero would mint unbounded
        // tokens; refuse instead.
        return Err(FundError::InvalidAmount(
            "NAV is zero in the deposit currency".into(),
        ));
    }

    let aligned_deposit = fixed::align_decimals(
        deposit_amount,
        deposit_decimals as u32,
        token_decimals as u32,
    )?;
    let tokens_to_mint = fixed::convert(aligned_deposit, nav_in_deposit, NAV_DECIMALS)?;
    if tokens_to_mint == 0 {
        return Err(FundError::InvalidAmount(
            "deposit too small to mint a token unit".into(),
        ));
    }

    Ok(PurchaseQuote {
        nav_in_deposit,
        tokens_to_mint,
    })
}
