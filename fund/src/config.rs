//! # Engine Configuration & Constants
//!
//! Every magic number in the AURUM engine lives here. If you're hardcoding
//! a scale factor somewhere else, you're doing it wrong.
//!
//! The decimal scales in particular are load-bearing: NAV values, fiat
//! amounts, and the asset-valuation feed all share the same 6-implied-decimal
//! fixed-point representation, and changing either constant after funds have
//! been issued would silently reprice every open redemption.

/// Implied decimal places of every NAV value.
///
/// A NAV of `1_000_000` means one whole claim-token is backed by exactly
/// 1.000000 units of the fund's fiat currency.
pub const NAV_DECIMALS: u32 = 6;

/// Implied decimal places of every fiat-denominated amount (pipe-fiat
/// stash, asset valuations, fulfillment budgets).
///
/// Matches the asset-valuation feed, which reports 6-decimal-shifted fiat.
pub const FIAT_DECIMALS: u32 = 6;

/// NAV at fund genesis, before the first `update_nav`: 1.000000.
///
/// The first subscription therefore mints at par, which is the standard
/// bootstrap for an empty pool.
pub const INITIAL_NAV: u64 = 1_000_000;

/// Default ceiling on claim-token supply, in smallest token units.
///
/// 100 million whole tokens at 6 decimals. Operators can (and should)
/// configure a tighter limit per fund; this default only prevents the
/// pathological case of an effectively unbounded pool.
pub const DEFAULT_MAX_TOKEN_SUPPLY: u64 = 100_000_000_000_000;

/// Engine version string, reported by the node binary.
pub const ENGINE_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_and_fiat_scales_agree() {
        // The fulfillment pipeline assumes budgets and NAV share a scale.
        assert_eq!(NAV_DECIMALS, FIAT_DECIMALS);
    }

    #[test]
    fn initial_nav_is_par() {
        assert_eq!(INITIAL_NAV, 10u64.pow(NAV_DECIMALS));
    }
}
