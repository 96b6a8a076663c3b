// Copyright (c) 2026 Aurum Labs. MIT License.
// See LICENSE for details.

//! # AURUM Fund — Core Engine
//!
//! The accounting core of the AURUM real-world-asset fund: users deposit
//! stablecoins to mint a claim-token at the current Net Asset Value, and
//! surrender claim-tokens into a FIFO redemption queue that an authorized
//! operator pays down — fully or pro-rata — from available liquidity.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! fund-accounting engine:
//!
//! - **fixed** — Decimal-aligned fixed-point arithmetic. Every conversion
//!   in the engine goes through here, so overflow safety is auditable in
//!   one place.
//! - **nav** — The Net Asset Value record: asset valuation, pipe-fiat
//!   stash, and the NAV recomputation itself.
//! - **queue** — The redemption batch ledger: per-batch, per-user request
//!   bookkeeping with head/tail bounds.
//! - **purchase** / **fulfillment** — Pure quote and allocation math for
//!   subscriptions and redemptions.
//! - **fund** — The contract-level instance tying it all together, with
//!   role gating, event journaling, and all-or-nothing mutation semantics.
//! - **ledger** / **oracle** — Collaborator interfaces (token ledger,
//!   price feeds, asset valuation) plus in-process implementations.
//! - **store** — Durable persistence of the batch array and NAV record
//!   over sled.
//!
//! ## Design Philosophy
//!
//! 1. All monetary arithmetic is checked — wrapping arithmetic and money
//!    do not mix.
//! 2. Products are widened to `u128` before division; truncation (floor)
//!    is the uniform rounding policy.
//! 3. Every mutating operation either fully applies or fully rolls back.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod currency;
pub mod error;
pub mod events;
pub mod fixed;
pub mod fulfillment;
pub mod fund;
pub mod ledger;
pub mod nav;
pub mod oracle;
pub mod purchase;
pub mod queue;
pub mod roles;
pub mod store;

pub use currency::Currency;
pub use error::{FundError, FundResult};
pub use events::FundEvent;
pub use fund::{FundConfig, RwaFund};
