pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, validate_password_rules, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            password: self.password.trim().to_string(),
        }
    }
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name; must not be blank.
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    /// Stored lowercased; must be unique.
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    /// At least 7 characters and must not contain the word "password".
    #[validate(custom = "validate_password_rules")]
    pub password: String,
    /// Defaults to 0; negative ages are rejected.
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    #[serde(default)]
    pub age: i32,
}

impl RegisterRequest {
    /// Trims every text field and lowercases the email, before validation runs.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.trim().to_string(),
            age: self.age,
        }
    }
}

/// Returned by registration and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    /// Bearer token for the new session.
    pub token: String,
}
