//! # Price & Valuation Collaborators
//!
//! Two read-only collaborators feed the conversion pipeline:
//!
//! - [`CurrencyOracle`] reports the latest price between two currencies
//!   together with the decimal shift the price is expressed in.
//! - [`AssetValuation`] reports the fiat value of all real-world assets
//!   backing a claim-token as of a given date, 6-decimal-shifted.
//!
//! Both are synchronous reads and both may fail — an unknown pair or an
//! unpriced date is a typed error, never a silent zero.
//!
//! The fixed-table implementations here back the test suites and the demo
//! binary. Production hosts plug in real feed adapters behind the same
//! traits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::currency::Currency;
use crate::error::{FundError, FundResult};

/// Price-feed collaborator.
pub trait CurrencyOracle {
    /// Latest price for the pair, as "units of `quote` per unit of `base`,
    /// shifted by the returned decimal count".
    ///
    /// # Errors
    ///
    /// Returns [`FundError::UnknownFeed`] if no feed exists for the pair.
    fn feed_latest_price_and_decimals(
        &self,
        base: &Currency,
        quote: &Currency,
    ) -> FundResult<(u64, u32)>;
}

/// External asset-valuation collaborator.
pub trait AssetValuation {
    /// Fiat value (6-decimal-shifted) of all real assets backing
    /// `token_id`, as of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::ValuationUnavailable`] if the token has no
    /// valuation on or before the requested date.
    fn value_by_token_id(
        &self,
        token_id: &str,
        fiat: &Currency,
        as_of: NaiveDate,
    ) -> FundResult<u64>;
}

/// A fixed rate table keyed by `(base, quote)`.
///
/// Rates are set by whoever wires the fund up (tests, the demo CLI) and
/// read back verbatim. There is no staleness model here — a missing pair
/// is the only failure mode.
#[derive(Clone, Debug, Default)]
pub struct FixedRateOracle {
    feeds: HashMap<(Currency, Currency), (u64, u32)>,
}

impl FixedRateOracle {
    /// Creates an oracle with no feeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the feed for `base/quote`.
    pub fn set_rate(&mut self, base: Currency, quote: Currency, rate: u64, decimals: u32) {
        self.feeds.insert((base, quote), (rate, decimals));
    }
}

impl CurrencyOracle for FixedRateOracle {
    fn feed_latest_price_and_decimals(
        &self,
        base: &Currency,
        quote: &Currency,
    ) -> FundResult<(u64, u32)> {
        self.feeds
            .get(&(base.clone(), quote.clone()))
            .copied()
            .ok_or_else(|| FundError::UnknownFeed {
                base: base.clone(),
                quote: quote.clone(),
            })
    }
}

/// Dated valuation points per token id.
///
/// Lookups resolve to the most recent point on or before the requested
/// date, which is how custodian appraisals behave: an appraisal holds
/// until the next one lands.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticAssetValuation {
    values: HashMap<String, BTreeMap<NaiveDate, u64>>,
}

impl StaticAssetValuation {
    /// Creates a valuation table with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a valuation point for `token_id` effective `as_of`.
    pub fn set_value(&mut self, token_id: &str, as_of: NaiveDate, value: u64) {
        self.values
            .entry(token_id.to_string())
            .or_default()
            .insert(as_of, value);
    }
}

impl AssetValuation for StaticAssetValuation {
    fn value_by_token_id(
        &self,
        token_id: &str,
        _fiat: &Currency,
        as_of: NaiveDate,
    ) -> FundResult<u64> {
        self.values
            .get(token_id)
            .and_then(|points| points.range(..=as_of).next_back())
            .map(|(_, value)| *value)
            .ok_or_else(|| FundError::ValuationUnavailable {
                token_id: token_id.to_string(),
                as_of,
            })
    }
}
