use crate::error::AppError;
use bcrypt::{hash, verify};
use validator::ValidationError;

const BCRYPT_COST: u32 = 12;
const MIN_PASSWORD_LEN: usize = 7;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, BCRYPT_COST)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Custom `validator` rule for incoming passwords. Expects an already trimmed value.
pub fn validate_password_rules(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        let mut err = ValidationError::new("password_length");
        err.message = Some("Password must be at least 7 characters long".into());
        return Err(err);
    }
    if password.to_lowercase().contains("password") {
        let mut err = ValidationError::new("password_content");
        err.message = Some("Password cannot contain \"password\"".into());
        return Err(err);
    }
    Ok(())
}
