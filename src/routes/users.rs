use crate::{
    auth::{
        generate_token, hash_password, AuthResponse, AuthenticatedUser, LoginRequest,
        RegisterRequest,
    },
    avatar::{process_avatar, read_avatar_field},
    config::JwtConfig,
    email::Mailer,
    error::AppError,
    models::{parse_update, user::NewUser, user::USER_UPDATE_FIELDS, User, UserUpdate},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Signs a token for `user_id` and records it as an active session.
async fn issue_token(pool: &PgPool, jwt: &JwtConfig, user_id: Uuid) -> Result<String, AppError> {
    let token = generate_token(user_id, jwt)?;
    User::add_token(pool, user_id, &token).await?;
    Ok(token)
}

async fn load_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    User::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Register a new user
///
/// Creates the account, opens a first session and queues a welcome email.
///
/// ## Responses:
/// - `201 Created`: `{ "user": User, "token": String }`.
/// - `400 Bad Request`: malformed JSON or the email is already registered.
/// - `422 Unprocessable Entity`: a field failed validation.
#[post("")]
pub async fn register(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtConfig>,
    mailer: web::Data<Mailer>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let register_data = register_data.into_inner().normalized();
    register_data.validate()?;

    if User::find_by_email(&**pool, &register_data.email)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&register_data.password)?;
    let user = User::create(
        &**pool,
        NewUser {
            name: &register_data.name,
            email: &register_data.email,
            password_hash: &password_hash,
            age: register_data.age,
        },
    )
    .await?;

    let token = issue_token(&**pool, &jwt, user.id).await?;
    mailer.dispatch_welcome(&user.email, &user.name);
    log::info!("registered user {}", user.id);

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Login user
///
/// Opens a new session; existing sessions stay valid. A malformed email or empty
/// password is reported the same way as a wrong one.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    jwt: web::Data<JwtConfig>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let login_data = login_data.into_inner().normalized();
    login_data
        .validate()
        .map_err(|_| AppError::Unauthorized("Invalid credentials".into()))?;

    let user = User::find_by_credentials(&**pool, &login_data.email, &login_data.password).await?;
    let token = issue_token(&**pool, &jwt, user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Revokes the token used for this request only.
#[post("/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::remove_token(&**pool, session.user_id, &session.token).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out" })))
}

/// Revokes every session of the caller, including this one.
#[post("/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let revoked = User::clear_tokens(&**pool, session.user_id).await?;
    log::debug!("revoked {} sessions for user {}", revoked, session.user_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully logged out of all sessions" })))
}

#[get("/me")]
pub async fn get_me(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = load_user(&**pool, session.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Update the caller's profile
///
/// Accepts any subset of `name`, `email`, `password`, `age`. Any other key rejects the
/// whole request with `400 Invalid updates`. A new password is re-hashed before storage.
#[patch("/me")]
pub async fn update_me(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update: UserUpdate = parse_update(body.into_inner(), USER_UPDATE_FIELDS)?;
    let update = update.normalized();
    update.validate()?;

    let password_hash = match update.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = User::update(&**pool, session.user_id, &update, password_hash.as_deref()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Delete the caller's account
///
/// Tasks and sessions are removed with it. Returns the deleted user and queues a goodbye
/// email.
#[delete("/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = User::delete(&**pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    mailer.dispatch_goodbye(&user.email, &user.name);
    log::info!("deleted user {}", user.id);

    Ok(HttpResponse::Ok().json(user))
}

/// Upload an avatar
///
/// Expects `multipart/form-data` with the image in the `avatar` field. Only `.jpg`,
/// `.jpeg` and `.png` file names up to 1 MB are accepted. The stored image is a
/// 250x250 PNG.
#[post("/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = read_avatar_field(payload).await?;
    let png = web::block(move || process_avatar(&upload))
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))??;

    User::set_avatar(&**pool, session.user_id, &png).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User image uploaded" })))
}

#[delete("/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    session: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::clear_avatar(&**pool, session.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User image removed" })))
}

/// Serves a user's avatar as `image/png`. Public.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let avatar = User::avatar(&**pool, user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found or avatar image not found".into()))?;

    Ok(HttpResponse::Ok().content_type("image/png").body(avatar))
}
