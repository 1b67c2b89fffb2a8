use http::StatusCode;
use sea_orm::error::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport-neutral error body for callers that serialize engine errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. `INSUFFICIENT_INVENTORY`
    pub code: String,
    /// Human-readable description, never containing storage details
    pub message: String,
    /// HTTP status a gateway should use
    pub status: u16,
    /// RFC 3339 timestamp of when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Insufficient inventory: {0}")]
    InsufficientInventory(String),

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(String),

    #[error("Warehouse {0} is inactive")]
    WarehouseInactive(Uuid),

    #[error("Reservation {0} not found")]
    ReservationNotFound(Uuid),

    #[error("Reservation {id} is {status}, expected PENDING")]
    ReservationInvalidState { id: Uuid, status: String },

    #[error("Reservation {0} has expired")]
    ReservationExpired(Uuid),

    #[error("Operation cancelled by caller")]
    Cancelled,

    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {0}")]
    Internal(
        #[from]
        #[serde(skip)]
        DbErr,
    ),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::Internal(error.into_db_err())
    }

    /// Maps a failed insert/update to `AlreadyExists` when the store reports a
    /// unique-constraint violation, and to `Internal` otherwise.
    pub fn from_write_error(error: DbErr, what: impl FnOnce() -> String) -> Self {
        match error.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::AlreadyExists(what()),
            _ => ServiceError::Internal(error),
        }
    }

    /// Whether the caller can act on this error (everything except storage failures).
    pub fn is_expected(&self) -> bool {
        !matches!(self, ServiceError::Internal(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InsufficientInventory(_) => "INSUFFICIENT_INVENTORY",
            Self::WarehouseNotFound(_) => "WAREHOUSE_NOT_FOUND",
            Self::WarehouseInactive(_) => "WAREHOUSE_INACTIVE",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::ReservationInvalidState { .. } => "RESERVATION_INVALID_STATE",
            Self::ReservationExpired(_) => "RESERVATION_EXPIRED",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::WarehouseNotFound(_) | Self::ReservationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyExists(_) | Self::ReservationInvalidState { .. } => StatusCode::CONFLICT,
            Self::InvalidInput(_) | Self::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientInventory(_) | Self::WarehouseInactive(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ReservationExpired(_) => StatusCode::GONE,
            Self::Cancelled | Self::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for external callers.
    /// Storage errors return a generic message to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        if let Self::Internal(err) = self {
            tracing::error!(error = %err, "internal engine error");
        }

        ErrorResponse {
            code: self.code().to_string(),
            message: self.response_message(),
            status: self.status_code().as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<sea_orm::TransactionError<ServiceError>> for ServiceError {
    fn from(err: sea_orm::TransactionError<ServiceError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            sea_orm::TransactionError::Transaction(service_err) => service_err,
        }
    }
}
