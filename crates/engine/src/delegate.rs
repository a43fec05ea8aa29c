use dashmap::DashMap;

use strand_core::{OwnerCredential, OwnerId};

/// Who is asking for a blob.
#[derive(Debug, Clone)]
pub enum AccessContext {
    /// The owner themselves, holding their own credential.
    Owner {
        owner: OwnerId,
        credential: OwnerCredential,
    },
    /// An unauthenticated, domain-routed public request for an owner's
    /// content. Served only through an explicit read delegation.
    Public { owner: OwnerId },
}

impl AccessContext {
    /// The owner whose repository this access targets.
    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        match self {
            Self::Owner { owner, .. } | Self::Public { owner } => owner,
        }
    }
}

/// Source of owner-provisioned service credentials for public reads.
///
/// Public, domain-routed reads require a real capability to read another
/// principal's repository. Owners grant one explicitly (a scoped app
/// password provisioned for serving); absent a grant, public access fails.
/// There is no implicit fallback credential.
pub trait ReadDelegate: Send + Sync {
    /// The service credential the owner provisioned for public serving, if
    /// any.
    fn delegation_for(&self, owner: &OwnerId) -> Option<OwnerCredential>;
}

/// In-process [`ReadDelegate`] over a [`DashMap`].
#[derive(Debug, Default)]
pub struct StaticDelegation {
    grants: DashMap<OwnerId, OwnerCredential>,
}

impl StaticDelegation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision (or replace) the service credential for an owner.
    pub fn grant(&self, owner: OwnerId, credential: OwnerCredential) {
        self.grants.insert(owner, credential);
    }

    /// Withdraw an owner's delegation. Returns `true` if one existed.
    pub fn revoke(&self, owner: &OwnerId) -> bool {
        self.grants.remove(owner).is_some()
    }
}

impl ReadDelegate for StaticDelegation {
    fn delegation_for(&self, owner: &OwnerId) -> Option<OwnerCredential> {
        self.grants.get(owner).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let delegation = StaticDelegation::new();
        let owner = OwnerId::from("did:plc:alice");

        assert!(delegation.delegation_for(&owner).is_none());

        delegation.grant(owner.clone(), OwnerCredential::new("svc.example.com", "pw"));
        let cred = delegation.delegation_for(&owner).expect("grant");
        assert_eq!(cred.identifier, "svc.example.com");

        assert!(delegation.revoke(&owner));
        assert!(!delegation.revoke(&owner));
        assert!(delegation.delegation_for(&owner).is_none());
    }
}
