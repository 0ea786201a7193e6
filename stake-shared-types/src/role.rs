use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raw role identifier as it arrives from callers, before catalog validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub u8);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for RoleId {
    fn from(id: u8) -> Self {
        RoleId(id)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Role id {0} is not in the role catalog")]
pub struct UnknownRoleId(pub RoleId);

/// The closed role catalog: three staker roles and the administrator capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "ROLE_1")]
    Role1,
    #[serde(rename = "ROLE_2")]
    Role2,
    #[serde(rename = "ROLE_3")]
    Role3,
}

/// Roles that confer "registered" status.
pub const STAKER_ROLES: [Role; 3] = [Role::Role1, Role::Role2, Role::Role3];

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Role1, Role::Role2, Role::Role3];

    pub fn id(&self) -> RoleId {
        match self {
            Role::Admin => RoleId(0),
            Role::Role1 => RoleId(1),
            Role::Role2 => RoleId(2),
            Role::Role3 => RoleId(3),
        }
    }

    pub fn is_staker_role(&self) -> bool {
        match self {
            Role::Role1 | Role::Role2 | Role::Role3 => true,
            Role::Admin => false,
        }
    }

    /// Resolves a raw id to a staker role. The administrator capability is not
    /// obtainable through registration, so its id is rejected here too.
    pub fn staker_from_id(id: RoleId) -> Result<Role, UnknownRoleId> {
        match Role::try_from(id)? {
            role if role.is_staker_role() => Ok(role),
            _ => Err(UnknownRoleId(id)),
        }
    }
}

impl TryFrom<RoleId> for Role {
    type Error = UnknownRoleId;

    fn try_from(id: RoleId) -> Result<Self, Self::Error> {
        match id.0 {
            0 => Ok(Role::Admin),
            1 => Ok(Role::Role1),
            2 => Ok(Role::Role2),
            3 => Ok(Role::Role3),
            _ => Err(UnknownRoleId(id)),
        }
    }
}

impl From<Role> for RoleId {
    fn from(role: Role) -> Self {
        role.id()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "ADMIN",
            Role::Role1 => "ROLE_1",
            Role::Role2 => "ROLE_2",
            Role::Role3 => "ROLE_3",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_round_trips_through_ids() {
        for role in Role::ALL {
            assert_eq!(Role::try_from(role.id()), Ok(role));
        }
        assert_eq!(Role::try_from(RoleId(4)), Err(UnknownRoleId(RoleId(4))));
    }

    #[test]
    fn test_admin_is_not_a_staker_role() {
        assert!(!Role::Admin.is_staker_role());
        assert!(STAKER_ROLES.iter().all(Role::is_staker_role));
        assert_eq!(Role::staker_from_id(RoleId(0)), Err(UnknownRoleId(RoleId(0))));
        assert_eq!(Role::staker_from_id(RoleId(2)), Ok(Role::Role2));
    }
}
