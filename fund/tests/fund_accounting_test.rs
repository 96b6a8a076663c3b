//! Integration tests for the fund-accounting properties: conservation
//! across partial fulfillment rounds, pro-rata dust behavior, atomic
//! abort of failed operations, and durable persistence.

use aurum_fund::fund::{FundConfig, RwaFund};
use aurum_fund::ledger::{InMemoryLedger, Ledger};
use aurum_fund::oracle::{FixedRateOracle, StaticAssetValuation};
use aurum_fund::roles::OperatorSet;
use aurum_fund::store::FundStore;
use aurum_fund::{Currency, FundError, FundResult};
use chrono::NaiveDate;

const OPERATOR: &str = "op-1";
const FUND_ACCOUNT: &str = "aurum:fund";
const PAR: u64 = 1_000_000;
const INITIAL_NAV: u64 = 1_000_000;

fn aur() -> Currency {
    Currency::Custom("AUR".into())
}

fn genesis() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn config() -> FundConfig {
    FundConfig::new(
        FUND_ACCOUNT,
        aur(),
        "aur-pool",
        Currency::USD,
        Currency::USDC,
    )
}

fn base_ledger(liquidity: u64, holders: &[(&str, u64)]) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    ledger.register_asset(aur(), 6);
    ledger.register_asset(Currency::USDC, 6);
    ledger.mint(&Currency::USDC, FUND_ACCOUNT, liquidity).unwrap();
    for (user, tokens) in holders {
        ledger.mint(&aur(), user, *tokens).unwrap();
    }
    ledger
}

fn par_oracle() -> FixedRateOracle {
    let mut oracle = FixedRateOracle::new();
    oracle.set_rate(Currency::USDC, Currency::USD, PAR, 6);
    oracle
}

fn zero_valuation() -> StaticAssetValuation {
    let mut valuation = StaticAssetValuation::new();
    valuation.set_value("aur-pool", genesis(), 0);
    valuation
}

fn fund_with<L: Ledger + Clone>(ledger: L) -> RwaFund<L, FixedRateOracle, StaticAssetValuation> {
    RwaFund::new(
        config(),
        OperatorSet::with_operator(OPERATOR),
        ledger,
        par_oracle(),
        zero_valuation(),
        INITIAL_NAV,
        genesis(),
    )
}

// ---------------------------------------------------------------------------
// Conservation Across Partial Rounds
// ---------------------------------------------------------------------------

#[test]
fn conservation_holds_through_partial_rounds() {
    let mut fund = fund_with(base_ledger(
        10_000_000_000,
        &[("alice", 600), ("bob", 401), ("carol", 999)],
    ));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 600).unwrap();
    fund.create_redeem_request("bob", 401).unwrap();
    fund.create_redeem_request("carol", 999).unwrap();
    // 2000 token units pending in total.
    assert_eq!(fund.batch(0).unwrap().tokens_pending(), 2_000);

    // Round 1: redeem 500 units of the 2000 pending.
    let plan = fund.fulfill_batch(OPERATOR, 0, 500).unwrap().unwrap();
    assert!(!plan.closes_batch);
    let allocated: u64 = plan.entries.iter().map(|e| e.tokens).sum();
    assert!(allocated <= plan.refund_tokens);
    assert!(plan.refund_tokens - allocated <= plan.entries.len() as u64);

    let batch = fund.batch(0).unwrap();
    assert!(batch.conservation_holds());
    assert_eq!(batch.tokens_pending(), 2_000 - allocated);
    // Escrow mirrors pending exactly.
    assert_eq!(
        fund.ledger().balance_of(&aur(), FUND_ACCOUNT),
        batch.tokens_pending()
    );
    // Batch stays open.
    assert_eq!(fund.head(), 0);

    // Round 2: redeem everything that is left.
    let remaining = fund.batch(0).unwrap().tokens_pending();
    let plan = fund.fulfill_batch(OPERATOR, 0, remaining).unwrap().unwrap();
    assert!(plan.closes_batch);
    assert_eq!(fund.batch(0).unwrap().tokens_pending(), 0);
    assert!(fund.batch(0).unwrap().conservation_holds());
    assert_eq!(fund.ledger().balance_of(&aur(), FUND_ACCOUNT), 0);
    assert_eq!(fund.head(), 1);
}

#[test]
fn pending_is_monotonically_non_increasing() {
    let mut fund = fund_with(base_ledger(10_000_000_000, &[("alice", 1_000)]));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 1_000).unwrap();

    let mut last = fund.pending_for(0, "alice");
    for _ in 0..3 {
        fund.fulfill_batch(OPERATOR, 0, 100).unwrap();
        let now = fund.pending_for(0, "alice");
        assert!(now <= last);
        last = now;
    }
}

#[test]
fn proportional_allocation_favors_larger_requests() {
    let mut fund = fund_with(base_ledger(
        10_000_000_000,
        &[("whale", 900_000), ("shrimp", 100_000)],
    ));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("whale", 900_000).unwrap();
    fund.create_redeem_request("shrimp", 100_000).unwrap();

    let plan = fund.fulfill_batch(OPERATOR, 0, 100_000).unwrap().unwrap();
    let whale = plan.entries.iter().find(|e| e.user == "whale").unwrap();
    let shrimp = plan.entries.iter().find(|e| e.user == "shrimp").unwrap();
    assert_eq!(whale.tokens, 90_000);
    assert_eq!(shrimp.tokens, 10_000);
}

#[test]
fn dust_remains_redeemable() {
    let mut fund = fund_with(base_ledger(10_000_000_000, &[("alice", 7), ("bob", 5)]));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 7).unwrap();
    fund.create_redeem_request("bob", 5).unwrap();

    // Redeem 5 of 12: alice 7*5/12 = 2, bob 5*5/12 = 2; one unit of dust
    // stays pending.
    let plan = fund.fulfill_batch(OPERATOR, 0, 5).unwrap().unwrap();
    let allocated: u64 = plan.entries.iter().map(|e| e.tokens).sum();
    assert_eq!(allocated, 4);
    assert_eq!(fund.batch(0).unwrap().tokens_pending(), 8);
    assert!(fund.batch(0).unwrap().conservation_holds());

    // The dust is still cancellable.
    let released = fund.cancel_redeem_request("alice", 0).unwrap();
    assert_eq!(released, 5);
    let released = fund.cancel_redeem_request("bob", 0).unwrap();
    assert_eq!(released, 3);
    assert_eq!(fund.batch(0).unwrap().tokens_pending(), 0);
}

// ---------------------------------------------------------------------------
// Liquidity & Limits
// ---------------------------------------------------------------------------

#[test]
fn fulfillment_without_liquidity_rejected() {
    let mut fund = fund_with(base_ledger(100, &[("alice", 1_000)]));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 1_000).unwrap();

    let err = fund.fulfill_batch(OPERATOR, 0, 1_000).unwrap_err();
    assert!(matches!(
        err,
        FundError::InsufficientLiquidity {
            required: 1_000,
            available: 100,
        }
    ));
    // Nothing changed.
    assert_eq!(fund.pending_for(0, "alice"), 1_000);
    assert_eq!(fund.ledger().balance_of(&aur(), FUND_ACCOUNT), 1_000);
}

#[test]
fn overfulfillment_rejected_with_batch_underflow() {
    let mut fund = fund_with(base_ledger(10_000_000_000, &[("alice", 1_000)]));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 1_000).unwrap();

    let err = fund.fulfill_batch(OPERATOR, 0, 1_001).unwrap_err();
    assert!(matches!(
        err,
        FundError::BatchUnderflow {
            refund_tokens: 1_001,
            pending: 1_000,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// Atomic Abort
// ---------------------------------------------------------------------------

/// A ledger that refuses transfers to one particular account — used to
/// fail a fulfillment halfway through its user iteration.
#[derive(Clone)]
struct VetoLedger {
    inner: InMemoryLedger,
    vetoed: String,
}

impl Ledger for VetoLedger {
    fn decimals(&self, asset: &Currency) -> FundResult<u8> {
        self.inner.decimals(asset)
    }

    fn total_supply(&self, asset: &Currency) -> FundResult<u64> {
        self.inner.total_supply(asset)
    }

    fn balance_of(&self, asset: &Currency, account: &str) -> u64 {
        self.inner.balance_of(asset, account)
    }

    fn transfer(&mut self, asset: &Currency, from: &str, to: &str, amount: u64) -> FundResult<()> {
        if to == self.vetoed {
            return Err(FundError::TransferFailed(format!(
                "{to} cannot receive funds"
            )));
        }
        self.inner.transfer(asset, from, to, amount)
    }

    fn mint(&mut self, asset: &Currency, to: &str, amount: u64) -> FundResult<()> {
        self.inner.mint(asset, to, amount)
    }

    fn burn(&mut self, asset: &Currency, from: &str, amount: u64) -> FundResult<()> {
        self.inner.burn(asset, from, amount)
    }
}

#[test]
fn failed_payout_reverts_the_whole_fulfillment() {
    // Alice is paid first, then bob's transfer is vetoed: the entire
    // pass must unwind, including alice's payout and burn.
    let ledger = VetoLedger {
        inner: base_ledger(10_000_000_000, &[("alice", 600), ("bob", 400)]),
        vetoed: "bob".to_string(),
    };
    let mut fund = fund_with(ledger);
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 600).unwrap();
    fund.create_redeem_request("bob", 400).unwrap();
    fund.drain_events();

    let err = fund.fulfill_batch(OPERATOR, 0, 1_000).unwrap_err();
    assert!(matches!(err, FundError::TransferFailed(_)));

    // Queue untouched.
    assert_eq!(fund.pending_for(0, "alice"), 600);
    assert_eq!(fund.pending_for(0, "bob"), 400);
    assert_eq!(fund.batch(0).unwrap().tokens_pending(), 1_000);
    assert!(fund.batch(0).unwrap().conservation_holds());
    assert_eq!(fund.head(), 0);

    // Ledger untouched: no payout reached alice, no escrow was burned.
    assert_eq!(fund.ledger().balance_of(&Currency::USDC, "alice"), 0);
    assert_eq!(fund.ledger().balance_of(&aur(), FUND_ACCOUNT), 1_000);
    assert_eq!(fund.ledger().total_supply(&aur()).unwrap(), 1_000);

    // No events escaped the abort.
    assert!(fund.drain_events().is_empty());

    // After the veto is lifted the same call succeeds — the operator
    // retries the whole batch.
    let ledger = VetoLedger {
        inner: fund.ledger().inner.clone(),
        vetoed: String::new(),
    };
    let mut fund = RwaFund::from_snapshot(
        fund.snapshot(),
        config(),
        OperatorSet::with_operator(OPERATOR),
        ledger,
        par_oracle(),
        zero_valuation(),
    )
    .unwrap();
    let plan = fund.fulfill_batch(OPERATOR, 0, 1_000).unwrap().unwrap();
    assert!(plan.closes_batch);
}

#[test]
fn failed_purchase_leaves_no_trace() {
    // The mint ceiling triggers after quoting but before the pull.
    let fund = fund_with(base_ledger(0, &[]));
    let mut ledger = fund.ledger().clone();
    ledger.mint(&Currency::USDC, "alice", 1_000_000_000).unwrap();
    let mut fund = RwaFund::from_snapshot(
        fund.snapshot(),
        {
            let mut c = config();
            c.max_token_supply = 1; // effectively no room
            c
        },
        OperatorSet::with_operator(OPERATOR),
        ledger,
        par_oracle(),
        zero_valuation(),
    )
    .unwrap();

    let err = fund
        .purchase("alice", 1_000_000_000, &Currency::USDC)
        .unwrap_err();
    assert!(matches!(err, FundError::SupplyLimitExceeded { .. }));
    assert_eq!(
        fund.ledger().balance_of(&Currency::USDC, "alice"),
        1_000_000_000
    );
    assert_eq!(fund.ledger().total_supply(&aur()).unwrap(), 0);
    assert!(fund.drain_events().is_empty());
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn snapshot_survives_store_roundtrip() {
    let mut fund = fund_with(base_ledger(
        10_000_000_000,
        &[("alice", 1_000), ("bob", 500)],
    ));
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("alice", 1_000).unwrap();
    fund.create_batch(OPERATOR).unwrap();
    fund.create_redeem_request("bob", 500).unwrap();
    fund.fulfill_batch(OPERATOR, 0, 250).unwrap();
    fund.credit_pipe_fiat(OPERATOR, 750_000, genesis()).unwrap();

    let store = FundStore::open_temporary().unwrap();
    store.save(&fund.config().fund_id, &fund.snapshot()).unwrap();

    let snapshot = store.load().unwrap().expect("snapshot persisted");
    let restored = RwaFund::from_snapshot(
        snapshot,
        fund.config().clone(),
        OperatorSet::with_operator(OPERATOR),
        fund.ledger().clone(),
        par_oracle(),
        zero_valuation(),
    )
    .unwrap();

    assert_eq!(restored.head(), fund.head());
    assert_eq!(restored.tail(), fund.tail());
    assert_eq!(restored.nav(), fund.nav());
    assert_eq!(restored.valuation().pipe_fiat_stash, 750_000);
    assert_eq!(restored.pending_for(0, "alice"), fund.pending_for(0, "alice"));
    assert_eq!(restored.pending_for(1, "bob"), 500);
    assert!(restored.batch(0).unwrap().conservation_holds());
}

#[test]
fn restored_fund_continues_operating() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ledger;
    {
        let mut fund = fund_with(base_ledger(10_000_000_000, &[("alice", 1_000)]));
        fund.create_batch(OPERATOR).unwrap();
        fund.create_redeem_request("alice", 1_000).unwrap();
        let store = FundStore::open(dir.path()).unwrap();
        store.save(&fund.config().fund_id, &fund.snapshot()).unwrap();
        ledger = fund.ledger().clone();
    }

    let store = FundStore::open(dir.path()).unwrap();
    let snapshot = store.load().unwrap().unwrap();
    let mut fund = RwaFund::from_snapshot(
        snapshot,
        config(),
        OperatorSet::with_operator(OPERATOR),
        ledger,
        par_oracle(),
        zero_valuation(),
    )
    .unwrap();

    // The restored queue fulfills as if nothing happened.
    let plan = fund.fulfill_batch(OPERATOR, 0, 1_000).unwrap().unwrap();
    assert!(plan.closes_batch);
    assert_eq!(fund.ledger().balance_of(&Currency::USDC, "alice"), 1_000);
    assert_eq!(fund.head(), 1);
}
