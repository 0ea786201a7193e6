//! Role membership store.
//!
//! Tracks, per principal, which capabilities of the closed role catalog it holds. The
//! ledger only talks to the [`RoleStore`] trait, so the backing can be swapped without
//! touching ledger code. Two backings ship with the crate:
//!
//! - [`MemoryRoleRegistry`]: a map of ordered role sets.
//! - [`BitsetRoleRegistry`]: one bitmask byte per principal.

pub mod bitset;
pub mod error;
pub mod memory;

pub use bitset::BitsetRoleRegistry;
pub use error::{RegistryError, Result};
pub use memory::MemoryRoleRegistry;

use stake_shared_types::{Address, Role, RoleId, STAKER_ROLES};

/// Capability-set store keyed by principal.
pub trait RoleStore: Send {
    /// Adds `role_id` to the principal's set.
    ///
    /// Fails with [`RegistryError::UnknownRole`] for ids outside the catalog and with
    /// [`RegistryError::AlreadyHeld`] if the principal already holds the role.
    fn grant(&mut self, principal: &Address, role_id: RoleId) -> Result<Role>;

    /// Removes `role_id` from the principal's set. Returns whether anything was removed;
    /// revoking a role that is not held, or an id outside the catalog, is a no-op.
    fn revoke(&mut self, principal: &Address, role_id: RoleId) -> bool;

    fn has_role(&self, principal: &Address, role: Role) -> bool;

    /// Roles held by the principal, in catalog order.
    fn roles_of(&self, principal: &Address) -> Vec<Role>;

    /// Every principal holding at least one role.
    fn members(&self) -> Vec<(Address, Vec<Role>)>;

    fn has_any_of(&self, principal: &Address, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(principal, *role))
    }

    /// A principal is registered while it holds at least one staker role.
    fn is_registered(&self, principal: &Address) -> bool {
        self.has_any_of(principal, &STAKER_ROLES)
    }
}

impl<T: RoleStore + ?Sized> RoleStore for Box<T> {
    fn grant(&mut self, principal: &Address, role_id: RoleId) -> Result<Role> {
        (**self).grant(principal, role_id)
    }

    fn revoke(&mut self, principal: &Address, role_id: RoleId) -> bool {
        (**self).revoke(principal, role_id)
    }

    fn has_role(&self, principal: &Address, role: Role) -> bool {
        (**self).has_role(principal, role)
    }

    fn roles_of(&self, principal: &Address) -> Vec<Role> {
        (**self).roles_of(principal)
    }

    fn members(&self) -> Vec<(Address, Vec<Role>)> {
        (**self).members()
    }

    fn has_any_of(&self, principal: &Address, roles: &[Role]) -> bool {
        (**self).has_any_of(principal, roles)
    }

    fn is_registered(&self, principal: &Address) -> bool {
        (**self).is_registered(principal)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    /// Behaviour every backing must share.
    pub(crate) fn exercise_store<R: RoleStore + Default>() {
        let mut store = R::default();
        let alice = addr(1);
        let bob = addr(2);

        assert!(!store.is_registered(&alice));
        assert_eq!(store.grant(&alice, RoleId(1)), Ok(Role::Role1));
        assert!(store.has_role(&alice, Role::Role1));
        assert!(store.is_registered(&alice));
        assert!(!store.is_registered(&bob));

        assert_eq!(
            store.grant(&alice, RoleId(1)),
            Err(RegistryError::AlreadyHeld { principal: alice, role: Role::Role1 })
        );
        assert_eq!(store.grant(&alice, RoleId(9)), Err(RegistryError::UnknownRole(RoleId(9))));

        store.grant(&alice, RoleId(3)).unwrap();
        store.grant(&alice, RoleId(0)).unwrap();
        assert_eq!(store.roles_of(&alice), vec![Role::Admin, Role::Role1, Role::Role3]);
        assert!(store.has_any_of(&alice, &[Role::Role2, Role::Role3]));
        assert!(!store.has_any_of(&bob, &[Role::Role2, Role::Role3]));

        assert!(store.revoke(&alice, RoleId(1)));
        assert!(!store.revoke(&alice, RoleId(1)));
        assert!(!store.revoke(&alice, RoleId(42)));
        assert!(!store.revoke(&bob, RoleId(2)));
        assert!(store.revoke(&alice, RoleId(3)));

        // Administrator capability alone does not imply registration.
        assert!(!store.is_registered(&alice));
        assert!(store.has_role(&alice, Role::Admin));
        assert_eq!(store.members(), vec![(alice, vec![Role::Admin])]);

        assert!(store.revoke(&alice, RoleId(0)));
        assert!(store.members().is_empty());
    }

    /// Answers set queries without tracking single roles, so only a forwarded
    /// `has_any_of` can see its members.
    struct SetOnlyStore;

    impl RoleStore for SetOnlyStore {
        fn grant(&mut self, _principal: &Address, role_id: RoleId) -> Result<Role> {
            Ok(Role::try_from(role_id)?)
        }

        fn revoke(&mut self, _principal: &Address, _role_id: RoleId) -> bool {
            false
        }

        fn has_role(&self, _principal: &Address, _role: Role) -> bool {
            false
        }

        fn roles_of(&self, _principal: &Address) -> Vec<Role> {
            Vec::new()
        }

        fn members(&self) -> Vec<(Address, Vec<Role>)> {
            Vec::new()
        }

        fn has_any_of(&self, _principal: &Address, roles: &[Role]) -> bool {
            !roles.is_empty()
        }

        fn is_registered(&self, _principal: &Address) -> bool {
            true
        }
    }

    #[test]
    fn test_boxed_store_forwards_set_queries() {
        let store: Box<dyn RoleStore> = Box::new(SetOnlyStore);
        assert!(store.has_any_of(&addr(7), &[Role::Role2]));
        assert!(store.is_registered(&addr(7)));

        let mut bitset: Box<BitsetRoleRegistry> = Box::new(BitsetRoleRegistry::new());
        bitset.grant(&addr(8), RoleId(3)).unwrap();
        assert!(bitset.has_any_of(&addr(8), &[Role::Role1, Role::Role3]));
        assert!(RoleStore::is_registered(&bitset, &addr(8)));
    }

    #[test]
    fn test_boxed_store_delegates() {
        let mut store: Box<dyn RoleStore> = Box::new(MemoryRoleRegistry::new());
        store.grant(&addr(5), RoleId(2)).unwrap();
        assert!(store.is_registered(&addr(5)));
        assert_eq!(store.roles_of(&addr(5)), vec![Role::Role2]);
    }
}
