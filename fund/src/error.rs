//! # Error Taxonomy
//!
//! Every failure the engine can surface, in one enum. Each variant carries
//! the amounts and identifiers involved so that a failed operation can be
//! diagnosed from the error alone.
//!
//! Propagation policy: every error aborts the entire enclosing operation
//! with no partial state change. There are no retries at this layer — the
//! caller resubmits after resolving the cause.

use chrono::NaiveDate;
use thiserror::Error;

use crate::currency::Currency;

/// Errors that can occur during fund operations.
#[derive(Debug, Error)]
pub enum FundError {
    /// The amount is not acceptable for this operation — zero tokens,
    /// a duplicate pending request, or a quote that rounds to nothing.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The user's claim-token balance cannot cover the requested escrow.
    #[error("insufficient tokens: available {available}, requested {requested}")]
    InsufficientTokens {
        /// The user's current claim-token balance.
        available: u64,
        /// The amount the user tried to queue for redemption.
        requested: u64,
    },

    /// An external token transfer was refused by the ledger.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// The user has no pending tokens in the target batch.
    #[error("nothing to cancel: user {user} has no pending request in batch {batch_id}")]
    NothingToCancel {
        /// The batch the cancellation targeted.
        batch_id: u64,
        /// The user who attempted the cancellation.
        user: String,
    },

    /// The batch cannot cover the requested fulfillment — either it sits
    /// below the queue head or its pending total is smaller than the
    /// token quantity the budget would redeem.
    #[error(
        "batch underflow: batch {batch_id} (head {head}) cannot cover \
         {refund_tokens} tokens, pending {pending}"
    )]
    BatchUnderflow {
        /// The batch the fulfillment targeted.
        batch_id: u64,
        /// Current queue head at the time of the call.
        head: u64,
        /// Tokens the fulfillment budget would redeem at current NAV.
        refund_tokens: u64,
        /// Tokens still pending in the batch.
        pending: u64,
    },

    /// The fund's refund-stablecoin balance cannot cover the payout.
    #[error("insufficient liquidity: required {required}, available {available}")]
    InsufficientLiquidity {
        /// Refund-stablecoin units the fulfillment would pay out.
        required: u64,
        /// The fund account's actual refund-stablecoin balance.
        available: u64,
    },

    /// NAV cannot be computed while the claim-token supply is zero.
    #[error("zero supply: claim-token total supply is zero")]
    ZeroSupply,

    /// A debit would take the pipe-fiat stash below zero.
    #[error("underflow: stash {stash} cannot cover debit {debit}")]
    Underflow {
        /// The stash balance before the failed debit.
        stash: u64,
        /// The debit that was attempted.
        debit: u64,
    },

    /// Minting would push claim-token supply past the configured ceiling.
    #[error("supply limit exceeded: supply {supply} + mint {mint} > limit {limit}")]
    SupplyLimitExceeded {
        /// Current total supply, escrowed tokens included.
        supply: u64,
        /// The amount the purchase would mint.
        mint: u64,
        /// The configured supply ceiling.
        limit: u64,
    },

    /// The caller is not in the operator set.
    #[error("unauthorized: {caller} is not an operator")]
    Unauthorized {
        /// The identity that attempted the operation.
        caller: String,
    },

    /// A checked fixed-point operation overflowed the 64-bit money domain.
    #[error("amount overflow: operation exceeds the 64-bit money domain")]
    AmountOverflow,

    /// A redemption request was submitted before any batch was opened.
    #[error("no open batch: an operator must create a batch first")]
    NoOpenBatch,

    /// The oracle has no feed for the requested currency pair.
    #[error("unknown feed: no price feed for {base}/{quote}")]
    UnknownFeed {
        /// Base currency of the missing feed.
        base: Currency,
        /// Quote currency of the missing feed.
        quote: Currency,
    },

    /// The ledger does not know the requested asset.
    #[error("unknown asset: {0}")]
    UnknownAsset(Currency),

    /// The asset-valuation collaborator has no value for the token id
    /// as of the requested date.
    #[error("valuation unavailable: token {token_id} as of {as_of}")]
    ValuationUnavailable {
        /// The token id the valuation was requested for.
        token_id: String,
        /// The as-of date of the request.
        as_of: NaiveDate,
    },
}

/// Convenience alias used throughout the engine.
pub type FundResult<T> = Result<T, FundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_context() {
        let err = FundError::InsufficientTokens {
            available: 100,
            requested: 250,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("250"));

        let err = FundError::UnknownFeed {
            base: Currency::USDC,
            quote: Currency::USD,
        };
        assert!(err.to_string().contains("USDC/USD"));
    }
}
