//! # Currency Identifiers
//!
//! Every asset the engine touches — the fiat unit of account, the refund
//! stablecoin, deposit stablecoins, and the claim-token itself — is keyed
//! by a [`Currency`]. The engine never hardcodes tickers: feeds, ledger
//! balances, and fund configuration all use this enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency or asset identifier.
///
/// Well-known fiat currencies and stablecoins get their own variants;
/// everything else (including claim-tokens) goes through
/// [`Currency::Custom`] with a free-form ticker.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// United States Dollar (fiat unit of account, 10^-6 in this engine).
    USD,
    /// Euro.
    EUR,
    /// Brazilian Real.
    BRL,
    /// USD Coin stablecoin (native precision 10^-6).
    USDC,
    /// Tether stablecoin (native precision 10^-6).
    USDT,
    /// Arbitrary asset identifier for non-standard tokens,
    /// including fund claim-tokens.
    Custom(String),
}

impl Currency {
    /// Returns the ticker string for this currency.
    pub fn ticker(&self) -> &str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::BRL => "BRL",
            Self::USDC => "USDC",
            Self::USDT => "USDT",
            Self::Custom(ticker) => ticker,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker())
    }
}
