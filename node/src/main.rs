// Copyright (c) 2026 Aurum Labs. MIT License.
// See LICENSE for details.

//! # AURUM Fund Operator Node
//!
//! Entry point for the `aurum-node` binary. Parses CLI arguments,
//! initializes logging, and dispatches the subcommands:
//!
//! - `init`    — create a fund data directory with a genesis snapshot
//! - `status`  — print the persisted fund state
//! - `demo`    — run the reference purchase/redeem/fulfill scenario
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use aurum_fund::config::{ENGINE_VERSION, INITIAL_NAV};
use aurum_fund::fund::{FundConfig, RwaFund};
use aurum_fund::ledger::{InMemoryLedger, Ledger};
use aurum_fund::nav::NavAccount;
use aurum_fund::oracle::{FixedRateOracle, StaticAssetValuation};
use aurum_fund::roles::OperatorSet;
use aurum_fund::store::{FundSnapshot, FundStore};
use aurum_fund::Currency;

use cli::{AurumNodeCli, Commands};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = AurumNodeCli::parse();

    match cli.command {
        Commands::Init(args) => init_fund(args),
        Commands::Status(args) => print_status(args),
        Commands::Demo => run_demo(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Initializes a fund data directory and writes the genesis snapshot.
fn init_fund(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("aurum_node=info,aurum_fund=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), operator = %args.operator, "initializing fund");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let db_path = data_dir.join("db");
    let store = FundStore::open(&db_path)
        .with_context(|| format!("failed to open fund store at {}", db_path.display()))?;

    if store.load()?.is_some() {
        anyhow::bail!("fund store at {} is already initialized", db_path.display());
    }

    let config = FundConfig::new(
        "aurum:fund",
        Currency::Custom("AUR".into()),
        "aur-pool",
        Currency::USD,
        Currency::USDC,
    );
    let genesis_date = Utc::now().date_naive();
    let nav = NavAccount::new(INITIAL_NAV, genesis_date);
    let snapshot = FundSnapshot {
        head: 0,
        batches: Vec::new(),
        valuation: nav.valuation().clone(),
    };
    store.save(&config.fund_id, &snapshot)?;

    println!("Fund initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Fund id        : {}", config.fund_id);
    println!("  Operator       : {}", args.operator);
    println!("  Genesis NAV    : {}", format_nav(INITIAL_NAV));
    Ok(())
}

/// Loads the persisted fund state and prints a JSON summary to stdout.
fn print_status(args: cli::StatusArgs) -> Result<()> {
    logging::init_logging("aurum_node=warn", LogFormat::Pretty);

    let db_path = args.data_dir.join("db");
    let store = FundStore::open(&db_path)
        .with_context(|| format!("failed to open fund store at {}", db_path.display()))?;

    let snapshot = store
        .load()?
        .with_context(|| format!("fund store at {} is not initialized", db_path.display()))?;
    let fund_id = store.fund_id()?.unwrap_or_else(|| "unknown".to_string());

    let open_batches: Vec<_> = snapshot
        .batches
        .iter()
        .skip(snapshot.head as usize)
        .map(|batch| {
            serde_json::json!({
                "id": batch.id,
                "tokens_pending": batch.tokens_pending(),
                "users": batch.users().len(),
            })
        })
        .collect();

    let status = serde_json::json!({
        "fund_id": fund_id,
        "nav": snapshot.valuation.nav,
        "pipe_fiat_stash": snapshot.valuation.pipe_fiat_stash,
        "stash_as_of": snapshot.valuation.stash_as_of,
        "asset_value": snapshot.valuation.asset_value,
        "head": snapshot.head,
        "tail": snapshot.batches.len(),
        "open_batches": open_batches,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Runs the reference scenario end to end against in-memory collaborators:
/// a purchase at par NAV, a redemption request for the full position, and
/// a single fulfillment that closes the batch.
fn run_demo() -> Result<()> {
    logging::init_logging("aurum_node=info,aurum_fund=debug", LogFormat::Pretty);

    const OPERATOR: &str = "aurum:operator";
    const FUND_ACCOUNT: &str = "aurum:fund";
    let aur = Currency::Custom("AUR".into());

    let mut ledger = InMemoryLedger::new();
    ledger.register_asset(aur.clone(), 6);
    ledger.register_asset(Currency::USDC, 6);
    ledger.mint(&Currency::USDC, "user-a", 1_000_000_000)?;

    let mut oracle = FixedRateOracle::new();
    oracle.set_rate(Currency::USDC, Currency::USD, 1_000_000, 6);

    let mut valuation = StaticAssetValuation::new();
    let today = Utc::now().date_naive();
    valuation.set_value("aur-pool", today, 0);

    let config = FundConfig::new(FUND_ACCOUNT, aur.clone(), "aur-pool", Currency::USD, Currency::USDC);
    let mut fund = RwaFund::new(
        config,
        OperatorSet::with_operator(OPERATOR),
        ledger,
        oracle,
        valuation,
        INITIAL_NAV,
        today,
    );

    let minted = fund.purchase("user-a", 1_000_000_000, &Currency::USDC)?;
    println!("user-a deposited 1000.000000 USDC, minted {minted} AUR units");

    fund.create_batch(OPERATOR)?;
    fund.create_redeem_request("user-a", minted)?;
    println!("user-a queued {minted} AUR units into batch 0");

    let plan = fund
        .fulfill_batch(OPERATOR, 0, 1_000_000_000)?
        .expect("batch has pending tokens");
    println!(
        "batch 0 fulfilled: {} users refunded, closed = {}",
        plan.entries.len(),
        plan.closes_batch
    );
    println!(
        "user-a ends with {} USDC units; AUR supply is {}",
        fund.ledger().balance_of(&Currency::USDC, "user-a"),
        fund.ledger().total_supply(&aur)?
    );

    for event in fund.drain_events() {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("aurum-node {}", env!("CARGO_PKG_VERSION"));
    println!("engine     {}", ENGINE_VERSION);
}

/// Renders a 6-decimal fixed-point NAV for humans.
fn format_nav(nav: u64) -> String {
    format!("{}.{:06}", nav / 1_000_000, nav % 1_000_000)
}
