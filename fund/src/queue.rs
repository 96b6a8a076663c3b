//! # Redemption Batch Queue
//!
//! The FIFO ledger of redemption epochs. Each [`Batch`] pairs a map of
//! per-user [`RedemptionRequest`]s with an insertion-ordered user list —
//! O(1) lookup plus deterministic iteration during fulfillment. The
//! [`BatchQueue`] tracks `head` (oldest batch not yet fully fulfilled)
//! and `tail` (one past the newest created batch).
//!
//! Conservation invariant, enforced by every mutation in this module:
//!
//! ```text
//! batch_tokens_pending == sum over users of request_tokens_pending
//! ```
//!
//! Batches are never deleted. Fully settled batches below `head` stay
//! addressable for historical lookup.
//!
//! This module is pure bookkeeping: escrow transfers, burns, and payouts
//! are orchestrated by the fund layer around these mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FundError, FundResult};

/// One user's claim within one batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    /// Total token amount submitted into this batch (cumulative across
    /// re-requests after a cancellation).
    pub request_tokens: u64,
    /// Amount not yet refunded or cancelled. Never increases except via
    /// a brand-new request; reset to zero on cancellation.
    pub request_tokens_pending: u64,
    /// Timestamp of the first request in this batch.
    pub created_at: DateTime<Utc>,
}

/// One redemption epoch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    /// Position of this batch in the queue.
    pub id: u64,
    /// Per-user requests, unique per user per batch.
    requests: HashMap<String, RedemptionRequest>,
    /// Users in request-creation order, for deterministic fulfillment.
    user_list: Vec<String>,
    /// Total unredeemed token units still queued in this batch.
    batch_tokens_pending: u64,
    /// Timestamp the batch was opened.
    pub created_at: DateTime<Utc>,
}

impl Batch {
    fn new(id: u64) -> Self {
        Self {
            id,
            requests: HashMap::new(),
            user_list: Vec::new(),
            batch_tokens_pending: 0,
            created_at: Utc::now(),
        }
    }

    /// Total token units still pending in this batch.
    pub fn tokens_pending(&self) -> u64 {
        self.batch_tokens_pending
    }

    /// `true` once every request has been settled or cancelled.
    pub fn is_exhausted(&self) -> bool {
        self.batch_tokens_pending == 0
    }

    /// The user's request in this batch, if any.
    pub fn request(&self, user: &str) -> Option<&RedemptionRequest> {
        self.requests.get(user)
    }

    /// Users in request-creation order.
    pub fn users(&self) -> &[String] {
        &self.user_list
    }

    /// Tokens still pending for `user`, zero if they never requested.
    pub fn pending_for(&self, user: &str) -> u64 {
        self.requests
            .get(user)
            .map(|r| r.request_tokens_pending)
            .unwrap_or(0)
    }

    /// Registers (or tops up, after a cancellation) a redemption request.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::InvalidAmount`] for zero tokens or when the
    /// user already has a pending request in this batch, and
    /// [`FundError::AmountOverflow`] on counter overflow.
    pub(crate) fn add_request(&mut self, user: &str, tokens: u64) -> FundResult<()> {
        if tokens == 0 {
            return Err(FundError::InvalidAmount(
                "redemption request for zero tokens".into(),
            ));
        }
        if self.pending_for(user) > 0 {
            return Err(FundError::InvalidAmount(format!(
                "{user} already has a pending request in batch {}",
                self.id
            )));
        }

        let new_total = self
            .batch_tokens_pending
            .checked_add(tokens)
            .ok_or(FundError::AmountOverflow)?;

        match self.requests.get_mut(user) {
            Some(request) => {
                // The user requested earlier in this batch and cancelled;
                // the slot is reused additively and the list keeps their
                // original position.
                request.request_tokens = request
                    .request_tokens
                    .checked_add(tokens)
                    .ok_or(FundError::AmountOverflow)?;
                request.request_tokens_pending = tokens;
            }
            None => {
                self.requests.insert(
                    user.to_string(),
                    RedemptionRequest {
                        request_tokens: tokens,
                        request_tokens_pending: tokens,
                        created_at: Utc::now(),
                    },
                );
                self.user_list.push(user.to_string());
            }
        }

        self.batch_tokens_pending = new_total;
        Ok(())
    }

    /// Cancels the user's pending request, returning the released amount.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::NothingToCancel`] if the user has no pending
    /// tokens in this batch.
    pub(crate) fn cancel_request(&mut self, user: &str) -> FundResult<u64> {
        let request = self
            .requests
            .get_mut(user)
            .filter(|r| r.request_tokens_pending > 0)
            .ok_or_else(|| FundError::NothingToCancel {
                batch_id: self.id,
                user: user.to_string(),
            })?;

        let released = request.request_tokens_pending;
        request.request_tokens_pending = 0;
        // released is part of the batch total by the conservation
        // invariant, so this subtraction cannot underflow.
        self.batch_tokens_pending -= released;
        Ok(released)
    }

    /// Settles `tokens` of the user's pending amount (a fulfillment
    /// allocation). Decrements the user's pending and the batch total by
    /// the same amount, preserving conservation exactly.
    pub(crate) fn settle(&mut self, user: &str, tokens: u64) -> FundResult<()> {
        let request = self
            .requests
            .get_mut(user)
            .ok_or_else(|| FundError::NothingToCancel {
                batch_id: self.id,
                user: user.to_string(),
            })?;

        request.request_tokens_pending = request
            .request_tokens_pending
            .checked_sub(tokens)
            .ok_or(FundError::AmountOverflow)?;
        self.batch_tokens_pending = self
            .batch_tokens_pending
            .checked_sub(tokens)
            .ok_or(FundError::AmountOverflow)?;
        Ok(())
    }

    /// Verifies the conservation invariant. Test-support only — the
    /// mutations above maintain it by construction.
    pub fn conservation_holds(&self) -> bool {
        let sum: u128 = self
            .requests
            .values()
            .map(|r| r.request_tokens_pending as u128)
            .sum();
        sum == self.batch_tokens_pending as u128
    }
}

/// The ordered collection of redemption batches.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchQueue {
    batches: Vec<Batch>,
    head: u64,
}

impl BatchQueue {
    /// Creates an empty queue (`head == tail == 0`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a queue from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::InvalidAmount`] if the batch ids are not the
    /// contiguous sequence `0..len` or `head` exceeds `tail`.
    pub fn from_parts(batches: Vec<Batch>, head: u64) -> FundResult<Self> {
        for (index, batch) in batches.iter().enumerate() {
            if batch.id != index as u64 {
                return Err(FundError::InvalidAmount(format!(
                    "batch id {} at position {index}",
                    batch.id
                )));
            }
        }
        if head > batches.len() as u64 {
            return Err(FundError::InvalidAmount(format!(
                "head {head} beyond tail {}",
                batches.len()
            )));
        }
        Ok(Self { batches, head })
    }

    /// Index of the oldest batch not yet fully fulfilled.
    pub fn head(&self) -> u64 {
        self.head
    }

    /// One past the newest created batch.
    pub fn tail(&self) -> u64 {
        self.batches.len() as u64
    }

    /// The batch with the given id, if it was ever created.
    pub fn batch(&self, batch_id: u64) -> Option<&Batch> {
        self.batches.get(batch_id as usize)
    }

    /// All batches ever created, in id order.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// The newest batch — the only one that accepts new requests.
    pub fn newest(&self) -> Option<&Batch> {
        self.batches.last()
    }

    /// Appends a new empty batch and returns its id.
    pub fn create_batch(&mut self) -> u64 {
        let id = self.tail();
        self.batches.push(Batch::new(id));
        id
    }

    /// Registers a request against the newest batch.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::NoOpenBatch`] if no batch exists, plus the
    /// [`Batch::add_request`] errors.
    pub(crate) fn add_request(&mut self, user: &str, tokens: u64) -> FundResult<u64> {
        let batch = self.batches.last_mut().ok_or(FundError::NoOpenBatch)?;
        batch.add_request(user, tokens)?;
        Ok(batch.id)
    }

    /// Cancels the user's pending request in the given batch and returns
    /// the released amount.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::NothingToCancel`] if the batch does not exist
    /// or holds no pending tokens for the user.
    pub(crate) fn cancel_request(&mut self, user: &str, batch_id: u64) -> FundResult<u64> {
        let batch = self
            .batches
            .get_mut(batch_id as usize)
            .ok_or_else(|| FundError::NothingToCancel {
                batch_id,
                user: user.to_string(),
            })?;
        batch.cancel_request(user)
    }

    /// Mutable access to a batch for fulfillment settlement.
    pub(crate) fn batch_mut(&mut self, batch_id: u64) -> Option<&mut Batch> {
        self.batches.get_mut(batch_id as usize)
    }

    /// Advances `head` past any leading batches that are already
    /// exhausted. Idempotent. Returns the new head.
    pub fn close_batches(&mut self) -> u64 {
        while (self.head as usize) < self.batches.len()
            && self.batches[self.head as usize].is_exhausted()
        {
            self.head += 1;
        }
        self.head
    }
}
