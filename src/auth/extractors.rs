use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;

/// The session behind the current request, placed in request extensions by
/// `AuthMiddleware`.
///
/// `token` is the exact bearer token presented, which logout needs to revoke just this
/// session.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(session) => ready(Ok(session)),
            None => {
                let err = AppError::Unauthorized("Please authenticate".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
