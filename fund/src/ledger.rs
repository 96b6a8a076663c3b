//! # Token Ledger Collaborator
//!
//! The engine never owns token balances — it talks to a [`Ledger`], the
//! fungible-token collaborator that actually holds them. The trait is the
//! narrow waist: balance queries, transfers, mint, burn, and per-asset
//! metadata, all synchronous and atomic from the engine's point of view.
//!
//! [`InMemoryLedger`] is the in-process implementation used by tests, the
//! demo binary, and any host that embeds the engine directly. Supply and
//! balances are maintained atomically and every operation is
//! overflow-checked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::currency::Currency;
use crate::error::{FundError, FundResult};

/// The fungible-token collaborator interface.
///
/// One implementation manages every asset the fund touches: the
/// claim-token, the refund stablecoin, and any deposit stablecoins.
/// Assets are keyed by [`Currency`].
///
/// All methods are synchronous; a mutating method that returns `Err`
/// must leave the ledger unchanged.
pub trait Ledger {
    /// Decimal precision of the asset's smallest unit.
    fn decimals(&self, asset: &Currency) -> FundResult<u8>;

    /// Total outstanding supply of the asset, in smallest units.
    fn total_supply(&self, asset: &Currency) -> FundResult<u64>;

    /// Balance of `account` for the asset, in smallest units.
    /// Unknown assets and unseen accounts both read as zero.
    fn balance_of(&self, asset: &Currency, account: &str) -> u64;

    /// Moves `amount` from `from` to `to`.
    fn transfer(&mut self, asset: &Currency, from: &str, to: &str, amount: u64) -> FundResult<()>;

    /// Creates `amount` new units credited to `to`.
    fn mint(&mut self, asset: &Currency, to: &str, amount: u64) -> FundResult<()>;

    /// Destroys `amount` units held by `from`.
    fn burn(&mut self, asset: &Currency, from: &str, amount: u64) -> FundResult<()>;
}

/// Per-asset metadata and supply tracked by [`InMemoryLedger`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct AssetInfo {
    decimals: u8,
    total_supply: u64,
}

/// An in-process multi-asset ledger.
///
/// Balances: `asset -> (account -> amount)`. Cloning the ledger snapshots
/// every balance, which is what lets the fund engine restore it wholesale
/// when an operation aborts.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    assets: HashMap<Currency, AssetInfo>,
    balances: HashMap<Currency, HashMap<String, u64>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger with no registered assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset with the given decimal precision and zero supply.
    ///
    /// Re-registering an existing asset keeps its supply and balances and
    /// only updates the precision — convenient for test setup, harmless
    /// otherwise.
    pub fn register_asset(&mut self, asset: Currency, decimals: u8) {
        self.assets
            .entry(asset.clone())
            .and_modify(|info| info.decimals = decimals)
            .or_insert(AssetInfo {
                decimals,
                total_supply: 0,
            });
        self.balances.entry(asset).or_default();
    }

    fn asset_info(&self, asset: &Currency) -> FundResult<&AssetInfo> {
        self.assets
            .get(asset)
            .ok_or_else(|| FundError::UnknownAsset(asset.clone()))
    }
}

impl Ledger for InMemoryLedger {
    fn decimals(&self, asset: &Currency) -> FundResult<u8> {
        Ok(self.asset_info(asset)?.decimals)
    }

    fn total_supply(&self, asset: &Currency) -> FundResult<u64> {
        Ok(self.asset_info(asset)?.total_supply)
    }

    fn balance_of(&self, asset: &Currency, account: &str) -> u64 {
        self.balances
            .get(asset)
            .and_then(|accounts| accounts.get(account))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, asset: &Currency, from: &str, to: &str, amount: u64) -> FundResult<()> {
        self.asset_info(asset)?;
        let accounts = self.balances.entry(asset.clone()).or_default();

        let from_balance = accounts.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(FundError::TransferFailed(format!(
                "{from} holds {from_balance} {asset}, needs {amount}"
            )));
        }
        let to_balance = accounts.get(to).copied().unwrap_or(0);
        let to_after = to_balance
            .checked_add(amount)
            .ok_or(FundError::AmountOverflow)?;

        accounts.insert(from.to_string(), from_balance - amount);
        accounts.insert(to.to_string(), to_after);
        Ok(())
    }

    fn mint(&mut self, asset: &Currency, to: &str, amount: u64) -> FundResult<()> {
        let info = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| FundError::UnknownAsset(asset.clone()))?;
        let new_supply = info
            .total_supply
            .checked_add(amount)
            .ok_or(FundError::AmountOverflow)?;

        let accounts = self.balances.entry(asset.clone()).or_default();
        let balance = accounts.entry(to.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(FundError::AmountOverflow)?;

        // Supply is updated only after the credit succeeded, so a failed
        // mint leaves the ledger untouched.
        if let Some(info) = self.assets.get_mut(asset) {
            info.total_supply = new_supply;
        }
        Ok(())
    }

    fn burn(&mut self, asset: &Currency, from: &str, amount: u64) -> FundResult<()> {
        self.asset_info(asset)?;
        let accounts = self.balances.entry(asset.clone()).or_default();
        let balance = accounts.get(from).copied().unwrap_or(0);
        if balance < amount {
            return Err(FundError::TransferFailed(format!(
                "{from} holds {balance} {asset}, cannot burn {amount}"
            )));
        }
        accounts.insert(from.to_string(), balance - amount);

        let info = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| FundError::UnknownAsset(asset.clone()))?;
        // The burned amount is bounded by a balance, which is bounded by
        // supply; saturating keeps the invariant even if a host seeded
        // balances by hand.
        info.total_supply = info.total_supply.saturating_sub(amount);
        Ok(())
    }
}
