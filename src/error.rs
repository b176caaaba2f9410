use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use lettre::transport::smtp::Error as SmtpError;
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder};
use thiserror::Error;

use crate::model::eligibility::DenialReason;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// `Eligibility` and `InvalidOrExpiredOtp` are expected business outcomes and
/// are never retried; `Db` and `Mail` are transient server-side failures that
/// the client may safely retry.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Failed to send email: {0}")]
    Mail(#[from] SmtpError),
    #[error("Bad request: {0}")]
    Validation(String),
    #[error("{0}")]
    Eligibility(DenialReason),
    #[error("Invalid or expired OTP")]
    InvalidOrExpiredOtp,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<DenialReason> for Error {
    fn from(reason: DenialReason) -> Self {
        Self::Eligibility(reason)
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Err(match self {
            Self::Db(ref err) => {
                error!("Database error: {err}");
                Status::InternalServerError
            }
            Self::Mail(ref err) => {
                error!("Mail transport error: {err}");
                Status::InternalServerError
            }
            Self::Jwt(err) => match err.into_kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Validation(_) => Status::BadRequest,
            // Expected outcome, not an anomaly.
            Self::Eligibility(reason) => {
                info!("Request denied: {reason}");
                Status::Forbidden
            }
            Self::InvalidOrExpiredOtp | Self::Unauthorized(_) => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
        })
    }
}
