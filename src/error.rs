use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::request_id;
use crate::model::{common::incident::IncidentKind, ledger::LedgerError, mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Incident {id} is a {actual}, expected {expected}")]
    WrongType {
        id: Id,
        expected: &'static str,
        actual: IncidentKind,
    },
    #[error("This poll has ended")]
    PollEnded,
    #[error("Authentication required: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Concurrent modification of incident {0}, please retry")]
    StorageConflict(Id),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::WrongType { .. } | Self::PollEnded | Self::Ledger(_) | Self::Validation(_) => {
                Status::BadRequest
            }
            Self::Unauthenticated(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::StorageConflict(_) => Status::Conflict,
            Self::Db(_) => Status::InternalServerError,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = request_id(req);
        let message = match status.class() {
            StatusClass::ServerError => {
                error!("req{id}: {self}");
                "Internal server error".to_string()
            }
            _ => {
                debug!("req{id}: {self}");
                self.to_string()
            }
        };
        Custom(status, Json(ErrorBody::new(message))).respond_to(req)
    }
}
