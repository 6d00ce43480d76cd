//! User -> tenant directory
//!
//! A user's tenant is recorded the first time the user is seen and only
//! changes through an explicit transfer.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use types::ids::{TenantId, UserId};

use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Default)]
pub struct TenantDirectory {
    tenants: DashMap<UserId, TenantId>,
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `claimed` for unseen users; returns the directory's tenant
    pub fn resolve(&self, user: &UserId, claimed: &TenantId) -> TenantId {
        self.tenants.entry(*user).or_insert_with(|| claimed.clone()).value().clone()
    }

    pub fn tenant_of(&self, user: &UserId) -> Option<TenantId> {
        self.tenants.get(user).map(|t| t.value().clone())
    }

    /// Moves `user` from `from` to `to`, checked under the entry lock
    pub fn transfer(&self, user: &UserId, from: &TenantId, to: &TenantId) -> PlatformResult<()> {
        if from == to {
            return Err(PlatformError::validation("to_tenant must differ from from_tenant"));
        }
        match self.tenants.entry(*user) {
            Entry::Vacant(_) => Err(PlatformError::not_found(format!("user {user}"))),
            Entry::Occupied(mut entry) => {
                if entry.get() != from {
                    return Err(PlatformError::conflict(
                        "TENANT_MISMATCH",
                        format!("user belongs to {}, not {from}", entry.get()),
                    ));
                }
                entry.insert(to.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(slug: &str) -> TenantId {
        TenantId::try_new(slug).unwrap()
    }

    #[test]
    fn test_first_claim_wins() {
        let dir = TenantDirectory::new();
        let user = UserId::new();
        assert_eq!(dir.resolve(&user, &tenant("acme")), tenant("acme"));
        assert_eq!(dir.resolve(&user, &tenant("globex")), tenant("acme"));
    }

    #[test]
    fn test_transfer() {
        let dir = TenantDirectory::new();
        let user = UserId::new();
        dir.resolve(&user, &tenant("acme"));

        let err = dir.transfer(&user, &tenant("globex"), &tenant("initech")).unwrap_err();
        assert_eq!(err.code(), "TENANT_MISMATCH");
        assert!(dir.transfer(&user, &tenant("acme"), &tenant("acme")).is_err());
        assert!(dir.transfer(&UserId::new(), &tenant("acme"), &tenant("globex")).is_err());

        dir.transfer(&user, &tenant("acme"), &tenant("globex")).unwrap();
        assert_eq!(dir.tenant_of(&user), Some(tenant("globex")));
    }
}
