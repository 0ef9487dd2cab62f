use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Wire-level error class. This is the only classification that crosses a
/// service boundary; the underlying cause stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BadRequest",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::Conflict => "Conflict",
            ErrorCode::Internal => "Internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::Internal => 500,
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "BadRequest" => ErrorCode::BadRequest,
            "Unauthorized" => ErrorCode::Unauthorized,
            "NotFound" => ErrorCode::NotFound,
            "Conflict" => ErrorCode::Conflict,
            _ => ErrorCode::Internal,
        }
    }
}

/// Entities a lookup can fail on. Used to build `<Entity>NotFound` reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Card,
    Saldo,
    Withdraw,
    Topup,
    Transaction,
    Transfer,
    User,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Card => "Card",
            Entity::Saldo => "Saldo",
            Entity::Withdraw => "Withdraw",
            Entity::Topup => "Topup",
            Entity::Transaction => "Transaction",
            Entity::Transfer => "Transfer",
            Entity::User => "User",
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("cannot parse time value: {0}")]
    InvalidParseTime(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{} not found", .0.as_str())]
    NotFound(Entity),

    #[error("insufficient balance on card {card_number}")]
    InsufficientBalance { card_number: String },

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Downstream failure. `op` keys into the descriptor table below;
    /// `cause` is for the logs only and never crosses the wire.
    #[error("{op} failed: {cause}")]
    Internal { op: &'static str, cause: String },
}

/// Service failure with a correlation id attached from construction. The id
/// travels into the span, the error log, and the wire payload so operators
/// can join the three.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub correlation_id: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidField(msg.into()))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed(msg.into()))
    }

    pub fn parse_time(value: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParseTime(value.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized(msg.into()))
    }

    pub fn not_found(entity: Entity) -> Self {
        Self::new(ErrorKind::NotFound(entity))
    }

    pub fn insufficient_balance(card_number: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientBalance {
            card_number: card_number.into(),
        })
    }

    pub fn unique_violation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UniqueViolation(msg.into()))
    }

    pub fn internal(op: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Internal {
            op,
            cause: cause.to_string(),
        })
    }

    pub fn code(&self) -> ErrorCode {
        match &self.kind {
            ErrorKind::InvalidField(_)
            | ErrorKind::ValidationFailed(_)
            | ErrorKind::InvalidParseTime(_) => ErrorCode::BadRequest,
            ErrorKind::Unauthorized(_) => ErrorCode::Unauthorized,
            ErrorKind::NotFound(_) => ErrorCode::NotFound,
            ErrorKind::InsufficientBalance { .. } | ErrorKind::UniqueViolation(_) => {
                ErrorCode::Conflict
            }
            ErrorKind::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Stable reason token, e.g. `CardNotFound` or `CreateWithdrawFailed`.
    pub fn reason(&self) -> String {
        match &self.kind {
            ErrorKind::InvalidField(_) => "InvalidField".to_string(),
            ErrorKind::ValidationFailed(_) => "ValidationFailed".to_string(),
            ErrorKind::InvalidParseTime(_) => "InvalidParseTime".to_string(),
            ErrorKind::Unauthorized(_) => "Unauthorized".to_string(),
            ErrorKind::NotFound(entity) => format!("{}NotFound", entity.as_str()),
            ErrorKind::InsufficientBalance { .. } => "InsufficientBalance".to_string(),
            ErrorKind::UniqueViolation(_) => "UniqueViolation".to_string(),
            ErrorKind::Internal { op, .. } => internal_reason(op).to_string(),
        }
    }

    /// Message safe to return to a client. Internal causes are withheld.
    pub fn public_message(&self) -> String {
        match &self.kind {
            ErrorKind::Internal { .. } => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Descriptor table for internal failures, keyed by pipeline operation name.
/// One table instead of one handler object per method.
const INTERNAL_DESCRIPTORS: &[(&str, &str)] = &[
    ("create_card", "CreateCardFailed"),
    ("update_card", "UpdateCardFailed"),
    ("create_saldo", "CreateSaldoFailed"),
    ("update_saldo", "UpdateSaldoFailed"),
    ("rollback_saldo", "RollbackFailed"),
    ("create_withdraw", "CreateWithdrawFailed"),
    ("update_withdraw", "UpdateWithdrawFailed"),
    ("update_withdraw_status", "UpdateWithdrawStatusFailed"),
    ("create_topup", "CreateTopupFailed"),
    ("update_topup", "UpdateTopupFailed"),
    ("update_topup_status", "UpdateTopupStatusFailed"),
    ("create_transaction", "CreateTransactionFailed"),
    ("update_transaction", "UpdateTransactionFailed"),
    ("update_transaction_status", "UpdateTransactionStatusFailed"),
    ("create_transfer", "CreateTransferFailed"),
    ("update_transfer", "UpdateTransferFailed"),
    ("update_transfer_status", "UpdateTransferStatusFailed"),
    ("create_user", "CreateUserFailed"),
    ("send_email", "SendEmailFailed"),
    ("marshal", "MarshalFailed"),
    ("repository", "RepositoryFailed"),
    ("cache", "CacheFailed"),
    ("token_sign", "TokenSignFailed"),
    ("trash", "TrashFailed"),
    ("restore", "RestoreFailed"),
    ("delete_permanent", "DeletePermanentFailed"),
    ("stats", "StatsQueryFailed"),
    ("dashboard", "DashboardQueryFailed"),
];

pub fn internal_reason(op: &str) -> &'static str {
    INTERNAL_DESCRIPTORS
        .iter()
        .find(|(key, _)| *key == op)
        .map(|(_, reason)| *reason)
        .unwrap_or("Unhandled")
}

/// JSON error payload used by the gateway and carried in RPC metadata.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub code: String,
    pub reason: String,
    pub message: String,
    pub correlation_id: String,
}

impl ErrorBody {
    pub fn from_error(err: &ServiceError) -> Self {
        Self {
            status: "error".to_string(),
            code: err.code().as_str().to_string(),
            reason: err.reason(),
            message: err.public_message(),
            correlation_id: err.correlation_id.clone(),
        }
    }
}

pub const METADATA_ERROR_CODE: &str = "x-error-code";
pub const METADATA_ERROR_REASON: &str = "x-error-reason";
pub const METADATA_CORRELATION_ID: &str = "x-correlation-id";

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        let grpc_code = match err.code() {
            ErrorCode::BadRequest => tonic::Code::InvalidArgument,
            ErrorCode::Unauthorized => tonic::Code::Unauthenticated,
            ErrorCode::NotFound => tonic::Code::NotFound,
            ErrorCode::Conflict => tonic::Code::FailedPrecondition,
            ErrorCode::Internal => tonic::Code::Internal,
        };
        let mut status = tonic::Status::new(grpc_code, err.public_message());
        let meta = status.metadata_mut();
        if let Ok(value) = err.code().as_str().parse() {
            meta.insert(METADATA_ERROR_CODE, value);
        }
        if let Ok(value) = err.reason().parse() {
            meta.insert(METADATA_ERROR_REASON, value);
        }
        if let Ok(value) = err.correlation_id.parse() {
            meta.insert(METADATA_CORRELATION_ID, value);
        }
        status
    }
}

/// Rebuilds the client-facing payload from a `tonic::Status`, used on the
/// gateway side of the wire.
pub fn body_from_status(status: &tonic::Status) -> ErrorBody {
    let meta = status.metadata();
    let get = |key: &str| {
        meta.get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let code = meta
        .get(METADATA_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .map(ErrorCode::from_wire)
        .unwrap_or(ErrorCode::Internal);
    let reason = match get(METADATA_ERROR_REASON) {
        r if r.is_empty() => "Unhandled".to_string(),
        r => r,
    };
    ErrorBody {
        status: "error".to_string(),
        code: code.as_str().to_string(),
        reason,
        message: status.message().to_string(),
        correlation_id: get(METADATA_CORRELATION_ID),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_mapping_matches_http_table() {
        assert_eq!(ServiceError::invalid_field("x").code().http_status(), 400);
        assert_eq!(ServiceError::parse_time("x").code().http_status(), 400);
        assert_eq!(ServiceError::unauthorized("no token").code().http_status(), 401);
        assert_eq!(ServiceError::not_found(Entity::Card).code().http_status(), 404);
        assert_eq!(ServiceError::insufficient_balance("c").code().http_status(), 409);
        assert_eq!(ServiceError::unique_violation("dup").code().http_status(), 409);
        assert_eq!(ServiceError::internal("repository", "boom").code().http_status(), 500);
    }

    #[test]
    fn test_descriptor_table_binds_pipeline_steps() {
        assert_eq!(internal_reason("create_withdraw"), "CreateWithdrawFailed");
        assert_eq!(internal_reason("rollback_saldo"), "RollbackFailed");
        assert_eq!(internal_reason("send_email"), "SendEmailFailed");
        assert_eq!(internal_reason("no_such_op"), "Unhandled");
    }

    #[test]
    fn test_not_found_reason_carries_entity() {
        let err = ServiceError::not_found(Entity::Saldo);
        assert_eq!(err.reason(), "SaldoNotFound");
    }

    #[test]
    fn test_internal_cause_never_reaches_the_body() {
        let err = ServiceError::internal("create_withdraw", "db timeout on shard 3");
        let body = ErrorBody::from_error(&err);
        assert_eq!(body.message, "internal error");
        assert_eq!(body.reason, "CreateWithdrawFailed");
        assert!(!body.correlation_id.is_empty());
    }

    #[test]
    fn test_status_round_trip_keeps_taxonomy() {
        let err = ServiceError::insufficient_balance("4000000000000001");
        let id = err.correlation_id.clone();
        let status: tonic::Status = err.into();
        let body = body_from_status(&status);
        assert_eq!(body.code, "Conflict");
        assert_eq!(body.reason, "InsufficientBalance");
        assert_eq!(body.correlation_id, id);
    }
}
