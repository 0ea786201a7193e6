use stake_shared_types::{Address, Role, RoleId, UnknownRoleId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown role id: {0}")]
    UnknownRole(RoleId),

    #[error("Principal {principal} already holds role {role}")]
    AlreadyHeld { principal: Address, role: Role },
}

impl From<UnknownRoleId> for RegistryError {
    fn from(err: UnknownRoleId) -> Self {
        RegistryError::UnknownRole(err.0)
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
