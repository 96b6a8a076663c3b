//! # Fund Events
//!
//! Everything the engine does that an indexer or UI would care about is
//! journaled as a [`FundEvent`]. Events are plain serializable data — the
//! engine appends them to an in-memory journal that the host drains and
//! ships wherever it likes (a websocket, a log pipeline, a block explorer).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;

/// An observable state change in the fund.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FundEvent {
    /// An operator opened a new redemption batch.
    BatchCreated {
        /// Id of the new batch (equals the previous tail).
        batch_id: u64,
    },

    /// A user queued claim-tokens for redemption.
    RedeemRequestCreated {
        /// Batch the request landed in (always the newest batch).
        batch_id: u64,
        /// The requesting user.
        user: String,
        /// Token units escrowed by this request.
        tokens: u64,
    },

    /// A user cancelled their pending request and got the escrow back.
    RedeemRequestCancelled {
        /// Batch the request was cancelled in.
        batch_id: u64,
        /// The cancelling user.
        user: String,
        /// Token units returned from escrow.
        tokens: u64,
    },

    /// An operator paid down a batch, fully or partially.
    BatchFulfilled {
        /// The fulfilled batch.
        batch_id: u64,
        /// Token units the fulfillment budget redeemed at current NAV.
        refund_tokens: u64,
        /// `true` when the batch was exhausted by this fulfillment.
        closed: bool,
    },

    /// A user deposited stablecoins and minted claim-tokens at NAV.
    Purchase {
        /// The buyer.
        buyer: String,
        /// Deposit amount, in the deposit currency's smallest units.
        deposit_amount: u64,
        /// The deposit currency.
        deposit_currency: Currency,
        /// Claim-token units minted to the buyer.
        tokens_minted: u64,
    },

    /// An operator recomputed NAV.
    NavUpdated {
        /// The new NAV, 6-decimal fixed-point.
        nav: u64,
        /// The stash as-of date the valuation was based on.
        as_of: NaiveDate,
    },

    /// Fiat entered the pipe stash (on its way to the RWA custodian).
    PipeFiatCredited {
        /// Credited fiat amount, 6-decimal-shifted.
        amount: u64,
        /// New as-of date recorded for the stash.
        as_of: NaiveDate,
        /// Stash balance after the credit.
        stash: u64,
    },

    /// Fiat left the pipe stash (returned from the RWA custodian).
    PipeFiatDebited {
        /// Debited fiat amount, 6-decimal-shifted.
        amount: u64,
        /// New as-of date recorded for the stash.
        as_of: NaiveDate,
        /// Stash balance after the debit.
        stash: u64,
    },
}
