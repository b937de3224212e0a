use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

/// Machine-readable codes returned in the `code` field of every error body.
/// Clients share these numbers, so they must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NetworkFailure = 1,
    InvalidEmail = 2,
    UnknownEmail = 3,
    UnknownToken = 4,
    UsageError = 5,
    EmailProviderAuthFailure = 6,
    AuthError = 7,
    InvalidNewsletter = 9,
    InvalidLanguage = 10,
    UnknownError = 99,
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(*self as u16)
    }
}

// Return an opaque 500 while preserving the error root's cause for logging.
pub fn e500<T>(e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    ServerError::UnexpectedError(e).into()
}

// Return a 500 whose body names what went wrong on our side.
pub fn e500_with_code<T>(code: ErrorCode, e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    ServerError::InternalError(code, e).into()
}

// Return a 400 with the user-representation of the validation error as body.
// The error root cause is preserved for logging purposes.
pub fn e400<T>(code: ErrorCode, e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    ServerError::BadRequestError(code, e).into()
}

pub fn e403<T>(code: ErrorCode, e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    ServerError::ForbiddenError(code, e).into()
}

pub fn e404<T>(code: ErrorCode, e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    ServerError::NotFoundError(code, e).into()
}

#[derive(thiserror::Error)]
pub enum ServerError<T: std::fmt::Debug + std::fmt::Display + 'static> {
    #[error("{0}")]
    UnexpectedError(T),
    #[error("{1}")]
    InternalError(ErrorCode, T),
    #[error("{1}")]
    BadRequestError(ErrorCode, T),
    #[error("{1}")]
    ForbiddenError(ErrorCode, T),
    #[error("{1}")]
    NotFoundError(ErrorCode, T),
}

impl<T: std::fmt::Debug + std::fmt::Display + 'static> ServerError<T> {
    fn code(&self) -> ErrorCode {
        match self {
            ServerError::UnexpectedError(_) => ErrorCode::UnknownError,
            ServerError::InternalError(code, _)
            | ServerError::BadRequestError(code, _)
            | ServerError::ForbiddenError(code, _)
            | ServerError::NotFoundError(code, _) => *code,
        }
    }
}

impl<T: std::fmt::Debug + std::fmt::Display + 'static> std::fmt::Debug for ServerError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl<T: std::fmt::Debug + std::fmt::Display + 'static> ResponseError for ServerError<T> {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::UnexpectedError(_) | ServerError::InternalError(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::BadRequestError(..) => StatusCode::BAD_REQUEST,
            ServerError::ForbiddenError(..) => StatusCode::FORBIDDEN,
            ServerError::NotFoundError(..) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::json())
            .json(ResponseErrorMessage::new(self.code(), self.to_string()))
    }
}

#[derive(Serialize, Debug)]
pub struct ResponseErrorMessage {
    pub status: &'static str,
    pub desc: String,
    pub code: ErrorCode,
}

impl ResponseErrorMessage {
    pub fn new(code: ErrorCode, desc: impl Into<String>) -> Self {
        Self {
            status: "error",
            desc: desc.into(),
            code,
        }
    }
}

/// Body of an error response as seen by clients.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub status: String,
    pub desc: String,
    pub code: u16,
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;

    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}

pub fn is_empty_or_whitespace(s: &str) -> bool {
    s.trim().is_empty()
}
