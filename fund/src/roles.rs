//! # Operator Roles
//!
//! Operator-only operations (opening batches, fulfilling them, updating
//! NAV, adjusting the pipe-fiat stash) are gated by an [`OperatorSet`]:
//! an explicit set of identities owned by the fund instance. No ambient
//! global state — whoever constructs the fund decides who operates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{FundError, FundResult};

/// The set of identities allowed to perform operator-only operations.
///
/// Backed by a `BTreeSet` so that serialized snapshots are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSet {
    members: BTreeSet<String>,
}

impl OperatorSet {
    /// Creates an empty operator set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set seeded with a single operator.
    pub fn with_operator(operator: &str) -> Self {
        let mut set = Self::new();
        set.add(operator);
        set
    }

    /// Adds an identity. Returns `true` if it was not already a member.
    pub fn add(&mut self, identity: &str) -> bool {
        self.members.insert(identity.to_string())
    }

    /// Removes an identity. Returns `true` if it was a member.
    pub fn remove(&mut self, identity: &str) -> bool {
        self.members.remove(identity)
    }

    /// Membership check.
    pub fn contains(&self, identity: &str) -> bool {
        self.members.contains(identity)
    }

    /// Gate for operator-only calls: evaluated once at call entry.
    ///
    /// # Errors
    ///
    /// Returns [`FundError::Unauthorized`] if `caller` is not a member.
    pub fn require(&self, caller: &str) -> FundResult<()> {
        if self.contains(caller) {
            Ok(())
        } else {
            Err(FundError::Unauthorized {
                caller: caller.to_string(),
            })
        }
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` if no operators are registered.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
