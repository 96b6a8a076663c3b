//! # Net Asset Value Account
//!
//! One [`TokenValuation`] record per fund: the current NAV, the pipe-fiat
//! stash (fiat in transit to or from the RWA custodian, counted toward NAV
//! while it is not held as stablecoins), and the most recent asset value.
//!
//! The record is mutated only through [`NavAccount`] — stash adjustments
//! and the NAV recomputation itself. The fund layer gates both behind the
//! operator role; this module owns the arithmetic and the invariants
//! (unsigned stash, positive supply, floor division).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FundError, FundResult};
use crate::fixed;

/// The durable valuation record for a claim-token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenValuation {
    /// Fiat value backing one whole claim-token, 6-decimal fixed-point.
    pub nav: u64,
    /// Fiat awaiting transfer to/from the RWA pipe, 6-decimal-shifted.
    /// Unsigned: a debit can never take it below zero.
    pub pipe_fiat_stash: u64,
    /// The as-of date of the stash, used by the next NAV recomputation.
    pub stash_as_of: NaiveDate,
    /// Fiat value of the backing real-world assets as of `stash_as_of`.
    pub asset_value: u64,
    /// Timestamp of the most recent mutation.
    pub updated_at: DateTime<Utc>,
}

/// Owner of the [`TokenValuation`] record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavAccount {
    valuation: TokenValuation,
}

impl NavAccount {
    /// Creates an account at the given starting NAV with an empty stash.
    pub fn new(initial_nav: u64, genesis_date: NaiveDate) -> Self {
        Self {
            valuation: TokenValuation {
                nav: initial_nav,
                pipe_fiat_stash: 0,
                stash_as_of: genesis_date,
                asset_value: 0,
                updated_at: Utc::now(),
            },
        }
    }

    /// Restores an account from a persisted valuation record.
    pub fn from_valuation(valuation: TokenValuation) -> Self {
        Self { valuation }
    }

    /// Current NAV, 6-decimal fixed-point.
    pub fn nav(&self) -> u64 {
        self.valuation.nav
    }

    /// Current pipe-fiat stash, 6-decimal-shifted fiat.
    pub fn stash(&self) -> u64 {
        self.valuation.pipe_fiat_stash
    }

    /// The as-of date the stash (and the last valuation) is based on.
    pub fn stash_as_of(&self) -> NaiveDate {
        self.valuation.stash_as_of
    }

    /// Fiat value of the backing assets at the last recomputation.
    pub fn asset_value(&self) -> u64 {
        self.valuation.asset_value
    }

    /// The full valuation record.
    pub fn valuation(&self) -> &TokenValuation {
        &self.valuation
    }

    /// Credits the pipe-fiat stash and records the as-of date.
    ///
    /// Returns the new stash balance.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::AmountOverflow`] if the stash would exceed
    /// the 64-bit money domain.
    pub fn credit_pipe_fiat(&mut self, amount: u64, as_of: NaiveDate) -> FundResult<u64> {
        let stash = self
            .valuation
            .pipe_fiat_stash
            .checked_add(amount)
            .ok_or(FundError::AmountOverflow)?;
        self.valuation.pipe_fiat_stash = stash;
        self.valuation.stash_as_of = as_of;
        self.valuation.updated_at = Utc::now();
        Ok(stash)
    }

    /// Debits the pipe-fiat stash and records the as-of date.
    ///
    /// Returns the new stash balance.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::Underflow`] if the debit exceeds the stash —
    /// the stash is unsigned.
    pub fn debit_pipe_fiat(&mut self, amount: u64, as_of: NaiveDate) -> FundResult<u64> {
        let stash = self
            .valuation
            .pipe_fiat_stash
            .checked_sub(amount)
            .ok_or(FundError::Underflow {
                stash: self.valuation.pipe_fiat_stash,
                debit: amount,
            })?;
        self.valuation.pipe_fiat_stash = stash;
        self.valuation.stash_as_of = as_of;
        self.valuation.updated_at = Utc::now();
        Ok(stash)
    }

    /// Recomputes NAV from the fund's fiat-aligned stablecoin holdings,
    /// the pipe-fiat stash, and a fresh asset valuation:
    ///
    /// ```text
    /// nav = (stablecoin_fiat + stash + asset_value) * 10^token_decimals
    ///       / total_supply
    /// ```
    ///
    /// floored. Stores the new NAV and asset value and returns the NAV.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::ZeroSupply`] if `total_supply == 0` and
    /// [`FundError::AmountOverflow`] if the result exceeds `u64`.
    pub fn update_nav(
        &mut self,
        stablecoin_fiat: u64,
        asset_value: u64,
        total_supply: u64,
        token_decimals: u8,
    ) -> FundResult<u64> {
        if total_supply == 0 {
            return Err(FundError::ZeroSupply);
        }

        // Sum in the wide domain: three u64 terms cannot overflow u128.
        let backing =
            stablecoin_fiat as u128 + self.valuation.pipe_fiat_stash as u128 + asset_value as u128;
        let backing = u64::try_from(backing).map_err(|_| FundError::AmountOverflow)?;

        let scale = 10u64
            .checked_pow(token_decimals as u32)
            .ok_or(FundError::AmountOverflow)?;
        let nav = fixed::mul_div(backing, scale, total_supply)?;

        debug!(
            stablecoin_fiat,
            stash = self.valuation.pipe_fiat_stash,
            asset_value,
            total_supply,
            nav,
            "nav recomputed"
        );

        self.valuation.nav = nav;
        self.valuation.asset_value = asset_value;
        self.valuation.updated_at = Utc::now();
        Ok(nav)
    }
}
