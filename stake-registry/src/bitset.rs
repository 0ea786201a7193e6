use std::collections::HashMap;

use log::debug;
use stake_shared_types::{Address, Role, RoleId};

use crate::{RegistryError, Result, RoleStore};

/// Role store keeping one bitmask byte per principal. Bit `n` is set while the
/// principal holds the role with id `n`.
#[derive(Debug, Clone, Default)]
pub struct BitsetRoleRegistry {
    masks: HashMap<Address, u8>,
}

fn bit(role: Role) -> u8 {
    1u8 << role.id().0
}

impl BitsetRoleRegistry {
    pub fn new() -> Self {
        BitsetRoleRegistry { masks: HashMap::new() }
    }

    fn decode(mask: u8) -> Vec<Role> {
        Role::ALL.iter().copied().filter(|role| mask & bit(*role) != 0).collect()
    }
}

impl RoleStore for BitsetRoleRegistry {
    fn grant(&mut self, principal: &Address, role_id: RoleId) -> Result<Role> {
        let role = Role::try_from(role_id)?;
        let mask = self.masks.entry(*principal).or_insert(0);
        if *mask & bit(role) != 0 {
            return Err(RegistryError::AlreadyHeld { principal: *principal, role });
        }
        *mask |= bit(role);
        debug!("Granted {} to {} (mask {:#06b})", role, principal, *mask);
        Ok(role)
    }

    fn revoke(&mut self, principal: &Address, role_id: RoleId) -> bool {
        let Ok(role) = Role::try_from(role_id) else {
            return false;
        };
        let Some(mask) = self.masks.get_mut(principal) else {
            return false;
        };
        let removed = *mask & bit(role) != 0;
        *mask &= !bit(role);
        if *mask == 0 {
            self.masks.remove(principal);
        }
        removed
    }

    fn has_role(&self, principal: &Address, role: Role) -> bool {
        self.masks.get(principal).map_or(false, |mask| mask & bit(role) != 0)
    }

    fn roles_of(&self, principal: &Address) -> Vec<Role> {
        self.masks.get(principal).map(|mask| Self::decode(*mask)).unwrap_or_default()
    }

    fn members(&self) -> Vec<(Address, Vec<Role>)> {
        let mut members: Vec<(Address, Vec<Role>)> = self
            .masks
            .iter()
            .map(|(principal, mask)| (*principal, Self::decode(*mask)))
            .collect();
        members.sort_by(|a, b| a.0.cmp(&b.0));
        members
    }

    fn has_any_of(&self, principal: &Address, roles: &[Role]) -> bool {
        let wanted = roles.iter().fold(0u8, |acc, role| acc | bit(*role));
        self.masks.get(principal).map_or(false, |mask| mask & wanted != 0)
    }
}
