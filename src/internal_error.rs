use rocket::http::Status;
use rocket::response::{self, status, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;

use std::sync::PoisonError;

#[derive(Debug, Error)]
pub enum InternalError {
    /// No document exists yet for the requested user token.
    #[error("Document not found")]
    NotFound,

    #[error("Task store unavailable: {0}")]
    StoreUnavailable(String),

    /// The user asked for something the planner does not allow.
    #[error("{0}")]
    PolicyViolation(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InternalError {
    pub fn recurring_delete_rejected() -> InternalError {
        InternalError::PolicyViolation(
            "recurring tasks can only be removed from the recurring-task management view"
                .to_string(),
        )
    }

    pub fn status(&self) -> Status {
        match self {
            InternalError::NotFound => Status::NotFound,
            InternalError::StoreUnavailable(_) => Status::ServiceUnavailable,
            InternalError::PolicyViolation(_) => Status::Forbidden,
            InternalError::Invalid(_) => Status::BadRequest,
            InternalError::Serialization(_) => Status::UnprocessableEntity,
        }
    }
}

impl<T> From<PoisonError<T>> for InternalError {
    fn from(e: PoisonError<T>) -> InternalError {
        InternalError::StoreUnavailable(e.to_string())
    }
}

impl From<rusqlite::Error> for InternalError {
    fn from(e: rusqlite::Error) -> InternalError {
        InternalError::StoreUnavailable(e.to_string())
    }
}

impl From<&str> for InternalError {
    fn from(s: &str) -> InternalError {
        InternalError::Invalid(s.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl<'r> Responder<'r, 'static> for InternalError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if matches!(self, InternalError::StoreUnavailable(_)) {
            tracing::error!(uri = %request.uri(), error = %self, "store failure while serving request");
        }

        status::Custom(
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
        .respond_to(request)
    }
}

pub type InternalResult<T> = Result<T, InternalError>;
