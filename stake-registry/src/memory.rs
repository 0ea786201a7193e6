use std::collections::{BTreeSet, HashMap};

use log::debug;
use stake_shared_types::{Address, Role, RoleId};

use crate::{RegistryError, Result, RoleStore};

/// Role store backed by a map of ordered role sets.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoleRegistry {
    roles: HashMap<Address, BTreeSet<Role>>,
}

impl MemoryRoleRegistry {
    pub fn new() -> Self {
        MemoryRoleRegistry { roles: HashMap::new() }
    }
}

impl RoleStore for MemoryRoleRegistry {
    fn grant(&mut self, principal: &Address, role_id: RoleId) -> Result<Role> {
        let role = Role::try_from(role_id)?;
        let held = self.roles.entry(*principal).or_default();
        if !held.insert(role) {
            return Err(RegistryError::AlreadyHeld { principal: *principal, role });
        }
        debug!("Granted {} to {}", role, principal);
        Ok(role)
    }

    fn revoke(&mut self, principal: &Address, role_id: RoleId) -> bool {
        let Ok(role) = Role::try_from(role_id) else {
            return false;
        };
        let Some(held) = self.roles.get_mut(principal) else {
            return false;
        };
        let removed = held.remove(&role);
        if held.is_empty() {
            self.roles.remove(principal);
        }
        if removed {
            debug!("Revoked {} from {}", role, principal);
        }
        removed
    }

    fn has_role(&self, principal: &Address, role: Role) -> bool {
        self.roles.get(principal).map_or(false, |held| held.contains(&role))
    }

    fn roles_of(&self, principal: &Address) -> Vec<Role> {
        self.roles
            .get(principal)
            .map(|held| held.iter().copied().collect())
            .unwrap_or_default()
    }

    fn members(&self) -> Vec<(Address, Vec<Role>)> {
        let mut members: Vec<(Address, Vec<Role>)> = self
            .roles
            .iter()
            .map(|(principal, held)| (*principal, held.iter().copied().collect()))
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members
    }
}
