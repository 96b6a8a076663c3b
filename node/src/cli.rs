//! # CLI Interface
//!
//! Defines the command-line argument structure for `aurum-node` using
//! `clap` derive. Supports four subcommands: `init`, `status`, `demo`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AURUM fund operator node.
///
/// Operator tooling for an AURUM RWA fund: initializes the durable fund
/// store, inspects the redemption queue and NAV record, and drives a
/// self-contained demo of the purchase/redeem/fulfill cycle.
#[derive(Parser, Debug)]
#[command(
    name = "aurum-node",
    about = "AURUM fund operator node",
    version,
    propagate_version = true
)]
pub struct AurumNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the AURUM node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a fund data directory with a genesis snapshot.
    Init(InitArgs),
    /// Print the persisted fund state: NAV record, queue bounds, and
    /// open batches.
    Status(StatusArgs),
    /// Run the reference purchase/redeem/fulfill scenario against an
    /// in-memory ledger and print each step.
    Demo,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the fund data directory. Created if it does not exist.
    #[arg(long, short = 'd', env = "AURUM_DATA_DIR", default_value = ".aurum")]
    pub data_dir: PathBuf,

    /// Identity recorded as the fund's operator.
    #[arg(long, env = "AURUM_OPERATOR", default_value = "aurum:operator")]
    pub operator: String,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to the fund data directory.
    #[arg(long, short = 'd', env = "AURUM_DATA_DIR", default_value = ".aurum")]
    pub data_dir: PathBuf,
}
