use jsonrpc_core::Error as JsonRpcError;
use jsonrpc_core::ErrorCode;
use serde_json::json;
use stake_ledger::LedgerError;
use stake_shared_types::AddressError;
use thiserror::Error;

pub const UNAUTHORIZED: i64 = 401;
pub const FORBIDDEN: i64 = 403;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<AddressError> for RpcError {
    fn from(err: AddressError) -> Self {
        RpcError::InvalidParameter(format!("Address parse error: {}", err))
    }
}

/// Stable numeric code for each ledger refusal, so clients can branch without
/// matching on message text.
fn ledger_error_code(err: &LedgerError) -> i64 {
    match err {
        LedgerError::AdminRequired(_) => FORBIDDEN,
        LedgerError::NotRegistered(_) => 1001,
        LedgerError::UnknownRole { .. } => 1002,
        LedgerError::RoleAlreadyHeld { .. } => 1003,
        LedgerError::ZeroAmount => 1004,
        LedgerError::ZeroStakeAmount => 1005,
        LedgerError::InvalidRecipient => 1006,
        LedgerError::InsufficientDeposit { .. } => 1007,
        LedgerError::NonZeroBalance(_) => 1008,
        LedgerError::PendingWithdrawalNonZero(_) => 1009,
        LedgerError::NothingToUnstake => 1010,
        LedgerError::NothingToWithdraw => 1011,
        LedgerError::InsufficientBalance { .. } => 1012,
        LedgerError::NothingToSweep => 1013,
        LedgerError::BalanceOverflow => 1014,
        LedgerError::WaitTimeNotElapsed { .. } => 1015,
        LedgerError::TransferFailed(_) => 1016,
    }
}

impl From<RpcError> for JsonRpcError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Unauthorized => JsonRpcError {
                code: ErrorCode::ServerError(UNAUTHORIZED),
                message: "Unauthorized".into(),
                data: None,
            },
            RpcError::InvalidParameter(msg) => JsonRpcError::invalid_params(msg),
            RpcError::Internal(msg) => {
                let mut error = JsonRpcError::internal_error();
                error.data = Some(json!({ "details": msg }));
                error
            }
            RpcError::Ledger(ledger_err) => {
                let data = match &ledger_err {
                    LedgerError::UnknownRole { granted, .. } | LedgerError::RoleAlreadyHeld { granted, .. } => {
                        Some(json!({ "granted": granted }))
                    }
                    LedgerError::WaitTimeNotElapsed { now, unlock_time } => {
                        Some(json!({ "now": now, "unlock_time": unlock_time }))
                    }
                    _ => None,
                };
                JsonRpcError {
                    code: ErrorCode::ServerError(ledger_error_code(&ledger_err)),
                    message: ledger_err.to_string(),
                    data,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stake_shared_types::Role;

    #[test]
    fn test_partial_registration_reports_granted_roles() {
        let err: JsonRpcError = RpcError::from(LedgerError::UnknownRole {
            role_id: 9.into(),
            granted: vec![Role::Role1],
        })
        .into();
        assert_eq!(err.code, ErrorCode::ServerError(1002));
        assert_eq!(err.data, Some(json!({ "granted": ["ROLE_1"] })));
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        let err: JsonRpcError = RpcError::Unauthorized.into();
        assert_eq!(err.code, ErrorCode::ServerError(UNAUTHORIZED));
        assert_eq!(err.message, "Unauthorized");
    }
}
