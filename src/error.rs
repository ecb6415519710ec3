//!
//! # Custom Error Handling
//!
//! This module defines the `AppError` type returned by every handler and store helper.
//! It implements `actix_web::error::ResponseError`, so a handler can bail out with `?`
//! and the client receives the matching status code with a `{"error": "..."}` body.
//!
//! `From` implementations cover the libraries the routes talk to: `sqlx`, `validator`,
//! `jsonwebtoken`, `bcrypt`, `image` and `actix-multipart`.

use actix_multipart::MultipartError;
use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, invalid or revoked credentials (HTTP 401).
    Unauthorized(String),
    /// Malformed request, rejected update keys, bad upload (HTTP 400).
    BadRequest(String),
    /// The resource does not exist or is not owned by the caller (HTTP 404).
    NotFound(String),
    /// Unexpected server-side failure (HTTP 500).
    InternalServerError(String),
    /// Failure reported by the store (HTTP 500).
    DatabaseError(String),
    /// Input failed field validation (HTTP 422).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InternalServerError(msg) => {
                log::error!("internal error: {}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": msg
                }))
            }
            AppError::DatabaseError(msg) => {
                log::error!("database error: {}", msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": msg
                }))
            }
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
        }
    }
}

/// Postgres' name for the `UNIQUE` constraint on `users.email`.
const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

/// `RowNotFound` becomes a 404 and unique-key violations become a 400.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                if db_err.constraint() == Some(USERS_EMAIL_CONSTRAINT) {
                    AppError::BadRequest("Email already registered".into())
                } else {
                    AppError::BadRequest("Duplicate value".into())
                }
            }
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Decoding failures mean the client sent something that is not a usable image.
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> AppError {
        AppError::BadRequest(format!("Unable to process image: {}", error))
    }
}

impl From<MultipartError> for AppError {
    fn from(error: MultipartError) -> AppError {
        AppError::BadRequest(format!("Invalid upload: {}", error))
    }
}
