use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::{StoreError, TICKET_EVENT_SEAT_UNIQUE, VENUE_NAME_UNIQUE};

pub const SEATS_TAKEN: &str = "One or more of the selected seats are already booked.";

pub type AppResult<T> = Result<T, AppError>;

/// Ошибки предметной области. Всё, что уходит наружу, проходит через этот тип.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Unavailable(String),
}

impl AppError {
    pub fn seats_taken() -> Self {
        AppError::Conflict(SEATS_TAKEN.to_string())
    }

    pub fn event_not_found(event_id: i64) -> Self {
        AppError::NotFound(format!("Event {} not found", event_id))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Forbidden(_) => "forbidden",
            AppError::Validation(_) => "validation",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Unavailable(_) => "unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) if constraint == TICKET_EVENT_SEAT_UNIQUE => {
                AppError::seats_taken()
            }
            StoreError::UniqueViolation(constraint) if constraint == VENUE_NAME_UNIQUE => {
                AppError::Conflict("Venue with this name already exists".to_string())
            }
            StoreError::UniqueViolation(constraint) => {
                AppError::Conflict(format!("Unique constraint {} violated", constraint))
            }
            StoreError::MissingReference(what) => AppError::NotFound(what),
            StoreError::ForeignSeats(ids) => AppError::Validation(format!(
                "Seats {:?} do not belong to the event's venue",
                ids
            )),
            other => {
                tracing::error!("storage failure: {}", other);
                AppError::Unavailable("Storage is temporarily unavailable".to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}
