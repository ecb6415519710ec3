use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header::HeaderMap, Method},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;

use crate::auth::{token::verify_token, AuthenticatedUser};
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::models::User;

/// Routes reachable without a session token.
pub fn is_public_route(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    match *method {
        Method::GET => path == "/health" || is_public_avatar(path),
        Method::POST => path == "/api/users" || path == "/api/users/login",
        _ => false,
    }
}

// GET /api/users/{id}/avatar
fn is_public_avatar(path: &str) -> bool {
    path.strip_prefix("/api/users/")
        .and_then(|rest| rest.strip_suffix("/avatar"))
        .map_or(false, |id| !id.is_empty() && id != "me" && !id.contains('/'))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A token is accepted only when its signature verifies and it is still recorded for its
/// subject, so logging out takes effect immediately.
async fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let jwt = req
        .app_data::<web::Data<JwtConfig>>()
        .ok_or_else(|| AppError::InternalServerError("JWT settings are not configured".into()))?;
    let claims = verify_token(token, jwt.get_ref())?;

    let pool = req
        .app_data::<web::Data<PgPool>>()
        .ok_or_else(|| AppError::InternalServerError("Database pool is not configured".into()))?;
    if !User::has_token(pool.get_ref(), claims.sub, token).await? {
        log::debug!("rejected revoked token for user {}", claims.sub);
        return Err(AppError::Unauthorized("Please authenticate".into()));
    }

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        token: token.to_string(),
    })
}

pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public_route(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let session = authenticate(&req).await?;
            req.extensions_mut().insert(session);
            service.call(req).await
        })
    }
}
