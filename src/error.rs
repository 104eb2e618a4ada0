/**
 * DOMAIN LAYER - Error Handling
 *
 * AppError: The diplomat of failures - translating problems into HTTP responses
 *
 * Architecture Layer: Domain (Layer 4)
 * Dependencies: None (pure domain logic)
 * Responsibility: Define all possible errors, map to HTTP status codes
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/**
 * AppError: every way the reservation/payment/issuance pipeline can fail.
 *
 * Each variant represents a specific business error. Using thiserror for
 * automatic Error trait implementation.
 */
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient quota")]
    InsufficientQuota,

    #[error("max per order exceeded")]
    MaxPerOrderExceeded,

    #[error("lock acquisition failed")]
    LockAcquisitionFailed,

    #[error("order expired")]
    OrderExpired,

    #[error("order not in reserved status")]
    OrderNotInReservedStatus,

    #[error("amount mismatch")]
    AmountMismatch,

    #[error("payment already paid")]
    PaymentAlreadyPaid,

    #[error("duplicate webhook")]
    DuplicateWebhook,

    #[error("ticket already used")]
    TicketAlreadyUsed,

    #[error("ticket invalid: {0}")]
    TicketInvalid(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Standard error response envelope. Consistent structure across all endpoints.
#[derive(Serialize)]
struct ErrorBody {
    status: String,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Unauthorized".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Forbidden".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InsufficientQuota => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_QUOTA",
                "Not enough tickets available".to_string(),
            ),
            AppError::MaxPerOrderExceeded => (
                StatusCode::BAD_REQUEST,
                "MAX_PER_ORDER_EXCEEDED",
                "Requested quantity exceeds the per-order limit for this tier".to_string(),
            ),
            AppError::LockAcquisitionFailed => (
                StatusCode::CONFLICT,
                "LOCK_ACQUISITION_FAILED",
                "Too much contention on this inventory, please retry".to_string(),
            ),
            AppError::OrderExpired => (
                StatusCode::BAD_REQUEST,
                "ORDER_EXPIRED",
                "Order reservation has expired".to_string(),
            ),
            AppError::OrderNotInReservedStatus => (
                StatusCode::BAD_REQUEST,
                "ORDER_NOT_IN_RESERVED_STATUS",
                "Order is not awaiting payment".to_string(),
            ),
            AppError::AmountMismatch => (
                StatusCode::BAD_REQUEST,
                "AMOUNT_MISMATCH",
                "Paid amount does not match order total".to_string(),
            ),
            AppError::PaymentAlreadyPaid => (
                StatusCode::CONFLICT,
                "PAYMENT_ALREADY_PAID",
                "Order has already been paid".to_string(),
            ),
            AppError::DuplicateWebhook => (
                StatusCode::OK,
                "DUPLICATE_WEBHOOK",
                "Event already processed".to_string(),
            ),
            AppError::TicketAlreadyUsed => (
                StatusCode::CONFLICT,
                "TICKET_ALREADY_USED",
                "Ticket has already been scanned".to_string(),
            ),
            AppError::TicketInvalid(msg) => {
                (StatusCode::BAD_REQUEST, "TICKET_INVALID", msg.clone())
            }
            AppError::ProviderError(msg) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg.clone())
            }
            AppError::Database(err) => {
                tracing::error!("database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            status: "error".to_string(),
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
