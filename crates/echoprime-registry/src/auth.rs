// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry authorization: one owner plus a set of authorized submitters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use echoprime_core::error::{EchoPrimeError, Result};
use echoprime_core::types::Identity;

/// Who may write to the registry.
///
/// The initializing owner starts in the submitter set. The owner can always
/// submit, and only the owner can change the set or hand over ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    owner: Identity,
    submitters: BTreeSet<Identity>,
}

impl AuthorizationState {
    /// Fresh state with `owner` as the only submitter.
    pub fn new(owner: Identity) -> Result<Self> {
        if owner.is_null() {
            return Err(EchoPrimeError::InvalidOwner);
        }
        let submitters = BTreeSet::from([owner.clone()]);
        Ok(Self { owner, submitters })
    }

    /// Rebuild a persisted state.
    pub fn from_parts(owner: Identity, submitters: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            owner,
            submitters: submitters.into_iter().collect(),
        }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Authorized submitters, sorted. Includes the initializing owner until
    /// it is removed.
    pub fn submitters(&self) -> impl Iterator<Item = &Identity> {
        self.submitters.iter()
    }

    pub fn is_owner(&self, who: &Identity) -> bool {
        &self.owner == who
    }

    /// Submitters plus the owner.
    pub fn is_authorized(&self, who: &Identity) -> bool {
        self.is_owner(who) || self.submitters.contains(who)
    }

    pub fn require_owner(&self, caller: &Identity) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(EchoPrimeError::Unauthorized(caller.clone()))
        }
    }

    pub fn require_submitter(&self, caller: &Identity) -> Result<()> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(EchoPrimeError::Unauthorized(caller.clone()))
        }
    }

    /// Returns whether the set changed.
    pub fn add_submitter(&mut self, who: Identity) -> bool {
        self.submitters.insert(who)
    }

    /// Returns whether the set changed.
    pub fn remove_submitter(&mut self, who: &Identity) -> bool {
        self.submitters.remove(who)
    }

    /// Hand ownership to `new_owner`, returning the previous owner.
    ///
    /// Only admin rights move. The previous owner stays in the submitter set
    /// if it was there.
    pub fn transfer_ownership(&mut self, new_owner: Identity) -> Result<Identity> {
        if new_owner.is_null() {
            return Err(EchoPrimeError::InvalidOwner);
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::from(s)
    }

    #[test]
    fn owner_starts_as_a_submitter() {
        let auth = AuthorizationState::new(id("alice")).unwrap();
        assert!(auth.is_authorized(&id("alice")));
        assert!(!auth.is_authorized(&id("bob")));
        assert_eq!(auth.submitters().collect::<Vec<_>>(), vec![&id("alice")]);
    }

    #[test]
    fn null_owner_is_rejected() {
        assert!(matches!(
            AuthorizationState::new(id("  ")),
            Err(EchoPrimeError::InvalidOwner)
        ));
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let mut auth = AuthorizationState::new(id("alice")).unwrap();
        assert!(auth.add_submitter(id("bob")));
        assert!(!auth.add_submitter(id("bob")));
        assert!(auth.require_submitter(&id("bob")).is_ok());
        assert!(auth.remove_submitter(&id("bob")));
        assert!(!auth.remove_submitter(&id("bob")));
        assert!(matches!(
            auth.require_submitter(&id("bob")),
            Err(EchoPrimeError::Unauthorized(_))
        ));
    }

    #[test]
    fn transfer_moves_owner_rights() {
        let mut auth = AuthorizationState::new(id("alice")).unwrap();
        let previous = auth.transfer_ownership(id("carol")).unwrap();
        assert_eq!(previous, id("alice"));
        assert!(auth.require_owner(&id("carol")).is_ok());
        assert!(auth.require_owner(&id("alice")).is_err());
        assert!(auth.require_submitter(&id("alice")).is_ok());
        assert!(!auth.submitters().any(|s| s == &id("carol")));
        assert!(auth.is_authorized(&id("carol")));

        assert!(matches!(
            auth.transfer_ownership(id("0x0000")),
            Err(EchoPrimeError::InvalidOwner)
        ));
        assert_eq!(auth.owner(), &id("carol"));
    }

    #[test]
    fn removed_former_owner_loses_submit_rights() {
        let mut auth = AuthorizationState::new(id("alice")).unwrap();
        auth.transfer_ownership(id("carol")).unwrap();
        assert!(auth.remove_submitter(&id("alice")));
        assert!(matches!(
            auth.require_submitter(&id("alice")),
            Err(EchoPrimeError::Unauthorized(_))
        ));
    }
}
