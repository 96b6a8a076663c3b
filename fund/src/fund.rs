//! # The Fund Instance
//!
//! [`RwaFund`] is the contract-level object: it owns the batch queue, the
//! NAV account, the operator set, and the event journal, and it talks to
//! the three collaborators (token ledger, currency oracle, asset
//! valuation) that the engine does not own.
//!
//! ## Execution model
//!
//! Mutating operations run serially and atomically. Each one:
//!
//! 1. evaluates its role gate once at entry;
//! 2. runs inside a checkpoint guard — on any error the queue, NAV
//!    record, event journal, and the in-process ledger are restored to
//!    their pre-call snapshots, so a failed call leaves no trace;
//! 3. journals its events and logs through `tracing`.
//!
//! There is no internal parallelism, no retry, and no partial recovery:
//! a call either completes or reverts entirely.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DEFAULT_MAX_TOKEN_SUPPLY, FIAT_DECIMALS};
use crate::currency::Currency;
use crate::error::{FundError, FundResult};
use crate::events::FundEvent;
use crate::fixed;
use crate::fulfillment::{self, FulfillmentPlan};
use crate::ledger::Ledger;
use crate::nav::{NavAccount, TokenValuation};
use crate::oracle::{AssetValuation, CurrencyOracle};
use crate::purchase;
use crate::queue::{Batch, BatchQueue};
use crate::roles::OperatorSet;
use crate::store::FundSnapshot;

/// Static configuration of a fund instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FundConfig {
    /// Unique id of this fund instance.
    pub fund_id: String,
    /// The account that holds escrowed claim-tokens and refund liquidity.
    pub fund_account: String,
    /// The claim-token asset.
    pub claim_asset: Currency,
    /// Token id under which the asset-valuation collaborator prices the
    /// backing pool.
    pub valuation_token_id: String,
    /// The fiat unit of account (6 implied decimals throughout).
    pub fiat: Currency,
    /// The stablecoin redemptions are paid in.
    pub refund_stablecoin: Currency,
    /// Stablecoins whose fund-account holdings count toward NAV (at par,
    /// decimal-aligned). Deposit currencies belong here.
    pub supported_stablecoins: Vec<Currency>,
    /// Ceiling on claim-token supply, in smallest token units. Escrowed
    /// tokens count — escrow never burns.
    pub max_token_supply: u64,
}

impl FundConfig {
    /// Creates a configuration with a fresh fund id and the default
    /// supply ceiling. The refund stablecoin is automatically a
    /// supported stablecoin.
    pub fn new(
        fund_account: &str,
        claim_asset: Currency,
        valuation_token_id: &str,
        fiat: Currency,
        refund_stablecoin: Currency,
    ) -> Self {
        Self {
            fund_id: Uuid::new_v4().to_string(),
            fund_account: fund_account.to_string(),
            claim_asset,
            valuation_token_id: valuation_token_id.to_string(),
            fiat,
            supported_stablecoins: vec![refund_stablecoin.clone()],
            refund_stablecoin,
            max_token_supply: DEFAULT_MAX_TOKEN_SUPPLY,
        }
    }
}

/// The fund engine: queue + NAV accounting + collaborators.
#[derive(Debug)]
pub struct RwaFund<L, O, V> {
    config: FundConfig,
    queue: BatchQueue,
    nav: NavAccount,
    operators: OperatorSet,
    ledger: L,
    oracle: O,
    valuation: V,
    events: Vec<FundEvent>,
}

impl<L, O, V> RwaFund<L, O, V>
where
    L: Ledger + Clone,
    O: CurrencyOracle,
    V: AssetValuation,
{
    /// Creates a fund with an empty queue at the given starting NAV.
    pub fn new(
        config: FundConfig,
        operators: OperatorSet,
        ledger: L,
        oracle: O,
        valuation: V,
        initial_nav: u64,
        genesis_date: NaiveDate,
    ) -> Self {
        Self {
            config,
            queue: BatchQueue::new(),
            nav: NavAccount::new(initial_nav, genesis_date),
            operators,
            ledger,
            oracle,
            valuation,
            events: Vec::new(),
        }
    }

    /// Restores a fund from a persisted snapshot.
    pub fn from_snapshot(
        snapshot: FundSnapshot,
        config: FundConfig,
        operators: OperatorSet,
        ledger: L,
        oracle: O,
        valuation: V,
    ) -> FundResult<Self> {
        Ok(Self {
            config,
            queue: BatchQueue::from_parts(snapshot.batches, snapshot.head)?,
            nav: NavAccount::from_valuation(snapshot.valuation),
            operators,
            ledger,
            oracle,
            valuation,
            events: Vec::new(),
        })
    }

    /// The durable image of this fund (batch array, head, valuation).
    pub fn snapshot(&self) -> FundSnapshot {
        FundSnapshot {
            head: self.queue.head(),
            batches: self.queue.batches().to_vec(),
            valuation: self.nav.valuation().clone(),
        }
    }

    // -- Read surface -------------------------------------------------------

    /// Fund configuration.
    pub fn config(&self) -> &FundConfig {
        &self.config
    }

    /// Current NAV, 6-decimal fixed-point.
    pub fn nav(&self) -> u64 {
        self.nav.nav()
    }

    /// The full valuation record.
    pub fn valuation(&self) -> &TokenValuation {
        self.nav.valuation()
    }

    /// Queue head: the oldest batch not yet fully fulfilled.
    pub fn head(&self) -> u64 {
        self.queue.head()
    }

    /// Queue tail: one past the newest created batch.
    pub fn tail(&self) -> u64 {
        self.queue.tail()
    }

    /// A batch by id, including historical (settled) batches.
    pub fn batch(&self, batch_id: u64) -> Option<&Batch> {
        self.queue.batch(batch_id)
    }

    /// Tokens still pending for a user in a batch.
    pub fn pending_for(&self, batch_id: u64, user: &str) -> u64 {
        self.queue
            .batch(batch_id)
            .map(|b| b.pending_for(user))
            .unwrap_or(0)
    }

    /// The operator set.
    pub fn operators(&self) -> &OperatorSet {
        &self.operators
    }

    /// Mutable operator set — role bookkeeping is the host's concern.
    pub fn operators_mut(&mut self) -> &mut OperatorSet {
        &mut self.operators
    }

    /// The token ledger collaborator.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Drains the event journal in emission order.
    pub fn drain_events(&mut self) -> Vec<FundEvent> {
        std::mem::take(&mut self.events)
    }

    // -- Mutating operations ------------------------------------------------

    /// Opens a new redemption batch. Operator-only.
    pub fn create_batch(&mut self, caller: &str) -> FundResult<u64> {
        self.operators.require(caller)?;
        let batch_id = self.queue.create_batch();
        info!(fund = %self.config.fund_id, batch_id, "batch created");
        self.events.push(FundEvent::BatchCreated { batch_id });
        Ok(batch_id)
    }

    /// Queues `tokens` of the user's claim-tokens for redemption in the
    /// newest batch, escrowing them into the fund account.
    pub fn create_redeem_request(&mut self, user: &str, tokens: u64) -> FundResult<u64> {
        self.transactional(|fund| {
            let newest = fund.queue.newest().ok_or(FundError::NoOpenBatch)?;
            if tokens == 0 {
                return Err(FundError::InvalidAmount(
                    "redemption request for zero tokens".into(),
                ));
            }
            if newest.pending_for(user) > 0 {
                return Err(FundError::InvalidAmount(format!(
                    "{user} already has a pending request in batch {}",
                    newest.id
                )));
            }

            let available = fund.ledger.balance_of(&fund.config.claim_asset, user);
            if available < tokens {
                return Err(FundError::InsufficientTokens {
                    available,
                    requested: tokens,
                });
            }

            // Escrow before bookkeeping: tokens the queue counts are
            // always tokens the fund account actually holds.
            fund.ledger
                .transfer(&fund.config.claim_asset, user, &fund.config.fund_account, tokens)?;

            let batch_id = fund.queue.add_request(user, tokens)?;
            info!(fund = %fund.config.fund_id, batch_id, user, tokens, "redeem request created");
            fund.events.push(FundEvent::RedeemRequestCreated {
                batch_id,
                user: user.to_string(),
                tokens,
            });
            Ok(batch_id)
        })
    }

    /// Cancels the user's pending request in `batch_id`, returning the
    /// escrowed tokens. Valid for any batch that has not been fulfilled
    /// for this user yet.
    pub fn cancel_redeem_request(&mut self, user: &str, batch_id: u64) -> FundResult<u64> {
        self.transactional(|fund| {
            let released = fund.queue.cancel_request(user, batch_id)?;
            fund.ledger
                .transfer(&fund.config.claim_asset, &fund.config.fund_account, user, released)?;
            info!(fund = %fund.config.fund_id, batch_id, user, released, "redeem request cancelled");
            fund.events.push(FundEvent::RedeemRequestCancelled {
                batch_id,
                user: user.to_string(),
                tokens: released,
            });
            Ok(released)
        })
    }

    /// Advances `head` past exhausted leading batches. Idempotent; also
    /// run automatically after fulfillment.
    pub fn close_batches(&mut self) -> u64 {
        self.queue.close_batches()
    }

    /// Recomputes NAV from stablecoin holdings, the pipe-fiat stash, and
    /// a fresh asset valuation as of the stash date. Operator-only.
    pub fn update_nav(&mut self, caller: &str) -> FundResult<u64> {
        self.operators.require(caller)?;
        self.transactional(|fund| {
            let supply = fund.ledger.total_supply(&fund.config.claim_asset)?;
            if supply == 0 {
                return Err(FundError::ZeroSupply);
            }

            let as_of = fund.nav.stash_as_of();
            let asset_value = fund.valuation.value_by_token_id(
                &fund.config.valuation_token_id,
                &fund.config.fiat,
                as_of,
            )?;
            let stablecoin_fiat = fund.stablecoin_holdings_in_fiat()?;
            let token_decimals = fund.ledger.decimals(&fund.config.claim_asset)?;

            let nav = fund
                .nav
                .update_nav(stablecoin_fiat, asset_value, supply, token_decimals)?;
            info!(fund = %fund.config.fund_id, nav, %as_of, "nav updated");
            fund.events.push(FundEvent::NavUpdated { nav, as_of });
            Ok(nav)
        })
    }

    /// Credits the pipe-fiat stash. Operator-only.
    pub fn credit_pipe_fiat(
        &mut self,
        caller: &str,
        amount: u64,
        as_of: NaiveDate,
    ) -> FundResult<u64> {
        self.operators.require(caller)?;
        let stash = self.nav.credit_pipe_fiat(amount, as_of)?;
        info!(fund = %self.config.fund_id, amount, stash, %as_of, "pipe fiat credited");
        self.events
            .push(FundEvent::PipeFiatCredited { amount, as_of, stash });
        Ok(stash)
    }

    /// Debits the pipe-fiat stash. Operator-only; fails with
    /// [`FundError::Underflow`] if the stash cannot cover the debit.
    pub fn debit_pipe_fiat(
        &mut self,
        caller: &str,
        amount: u64,
        as_of: NaiveDate,
    ) -> FundResult<u64> {
        self.operators.require(caller)?;
        let stash = self.nav.debit_pipe_fiat(amount, as_of)?;
        info!(fund = %self.config.fund_id, amount, stash, %as_of, "pipe fiat debited");
        self.events
            .push(FundEvent::PipeFiatDebited { amount, as_of, stash });
        Ok(stash)
    }

    /// Deposits `deposit_amount` of `deposit_currency` and mints
    /// claim-tokens to `buyer` at the current NAV.
    ///
    /// The supply-ceiling check runs before the deposit pull (no external
    /// call on a doomed purchase); the pull completes before the mint (no
    /// tokens for a deposit that never arrived).
    pub fn purchase(
        &mut self,
        buyer: &str,
        deposit_amount: u64,
        deposit_currency: &Currency,
    ) -> FundResult<u64> {
        self.transactional(|fund| {
            let (rate, rate_decimals) = fund
                .oracle
                .feed_latest_price_and_decimals(deposit_currency, &fund.config.fiat)?;
            let deposit_decimals = fund.ledger.decimals(deposit_currency)?;
            let token_decimals = fund.ledger.decimals(&fund.config.claim_asset)?;

            let quote = purchase::quote(
                fund.nav.nav(),
                rate,
                rate_decimals,
                deposit_amount,
                deposit_decimals,
                token_decimals,
            )?;

            let supply = fund.ledger.total_supply(&fund.config.claim_asset)?;
            let projected = supply
                .checked_add(quote.tokens_to_mint)
                .ok_or(FundError::AmountOverflow)?;
            if projected > fund.config.max_token_supply {
                return Err(FundError::SupplyLimitExceeded {
                    supply,
                    mint: quote.tokens_to_mint,
                    limit: fund.config.max_token_supply,
                });
            }

            fund.ledger
                .transfer(deposit_currency, buyer, &fund.config.fund_account, deposit_amount)?;
            fund.ledger
                .mint(&fund.config.claim_asset, buyer, quote.tokens_to_mint)?;

            info!(
                fund = %fund.config.fund_id,
                buyer,
                deposit_amount,
                deposit_currency = %deposit_currency,
                minted = quote.tokens_to_mint,
                "purchase"
            );
            fund.events.push(FundEvent::Purchase {
                buyer: buyer.to_string(),
                deposit_amount,
                deposit_currency: deposit_currency.clone(),
                tokens_minted: quote.tokens_to_mint,
            });
            Ok(quote.tokens_to_mint)
        })
    }

    /// Pays down `batch_id` with a fiat budget of `amount`
    /// (6-decimal-shifted). Operator-only.
    ///
    /// A batch with nothing pending is tolerated: the call just advances
    /// the queue head and returns `None` — the one defined no-op, so a
    /// stale retry cannot fail or double-pay.
    ///
    /// Returns the executed plan otherwise.
    pub fn fulfill_batch(
        &mut self,
        caller: &str,
        batch_id: u64,
        amount: u64,
    ) -> FundResult<Option<FulfillmentPlan>> {
        self.operators.require(caller)?;

        let stale = match self.queue.batch(batch_id) {
            Some(batch) => batch.is_exhausted(),
            None => {
                return Err(FundError::BatchUnderflow {
                    batch_id,
                    head: self.queue.head(),
                    refund_tokens: 0,
                    pending: 0,
                })
            }
        };
        if stale {
            let head = self.queue.close_batches();
            warn!(fund = %self.config.fund_id, batch_id, head, "stale fulfillment, close only");
            return Ok(None);
        }

        self.transactional(|fund| {
            let (rate, rate_decimals) = fund
                .oracle
                .feed_latest_price_and_decimals(&fund.config.refund_stablecoin, &fund.config.fiat)?;
            let token_decimals = fund.ledger.decimals(&fund.config.claim_asset)?;
            let stablecoin_decimals = fund.ledger.decimals(&fund.config.refund_stablecoin)?;

            let batch = fund
                .queue
                .batch(batch_id)
                .expect("existence checked above");
            let plan = fulfillment::plan(
                batch,
                fund.queue.head(),
                amount,
                fund.nav.nav(),
                rate,
                rate_decimals,
                token_decimals,
                stablecoin_decimals,
            )?;

            let available = fund
                .ledger
                .balance_of(&fund.config.refund_stablecoin, &fund.config.fund_account);
            if available < plan.stablecoin_required {
                return Err(FundError::InsufficientLiquidity {
                    required: plan.stablecoin_required,
                    available,
                });
            }

            // Execute: pay out, burn escrow, settle bookkeeping. Any
            // failure reverts the whole pass via the checkpoint guard.
            for entry in &plan.entries {
                fund.ledger.transfer(
                    &fund.config.refund_stablecoin,
                    &fund.config.fund_account,
                    &entry.user,
                    entry.stablecoin_amount,
                )?;
                fund.ledger
                    .burn(&fund.config.claim_asset, &fund.config.fund_account, entry.tokens)?;
                let batch = fund
                    .queue
                    .batch_mut(batch_id)
                    .expect("existence checked above");
                batch.settle(&entry.user, entry.tokens)?;
            }

            let head = fund.queue.close_batches();
            info!(
                fund = %fund.config.fund_id,
                batch_id,
                refund_tokens = plan.refund_tokens,
                users = plan.entries.len(),
                closed = plan.closes_batch,
                head,
                "batch fulfilled"
            );
            fund.events.push(FundEvent::BatchFulfilled {
                batch_id,
                refund_tokens: plan.refund_tokens,
                closed: plan.closes_batch,
            });
            Ok(Some(plan))
        })
    }

    // -- Internals ----------------------------------------------------------

    /// Fiat-aligned value of the fund account's supported stablecoin
    /// holdings, at par.
    fn stablecoin_holdings_in_fiat(&self) -> FundResult<u64> {
        let mut total: u64 = 0;
        for coin in &self.config.supported_stablecoins {
            let balance = self.ledger.balance_of(coin, &self.config.fund_account);
            let decimals = self.ledger.decimals(coin)?;
            let aligned = fixed::align_decimals(balance, decimals as u32, FIAT_DECIMALS)?;
            total = total.checked_add(aligned).ok_or(FundError::AmountOverflow)?;
        }
        Ok(total)
    }

    /// All-or-nothing guard: snapshots the queue, NAV record, event
    /// journal position, and the ledger; restores all of them if the
    /// operation errors.
    fn transactional<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> FundResult<T>,
    ) -> FundResult<T> {
        let queue = self.queue.clone();
        let nav = self.nav.clone();
        let ledger = self.ledger.clone();
        let journal_len = self.events.len();

        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.queue = queue;
                self.nav = nav;
                self.ledger = ledger;
                self.events.truncate(journal_len);
                Err(err)
            }
        }
    }
}
