pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{error::JsonPayloadError, error::QueryPayloadError, web, HttpRequest};

use crate::error::AppError;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Registers every `/api` route. The caller wraps the enclosing scope in `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .service(
            web::scope("/users")
                .service(users::register)
                .service(users::login)
                .service(users::logout)
                .service(users::logout_all)
                .service(users::get_me)
                .service(users::update_me)
                .service(users::delete_me)
                .service(users::upload_avatar)
                .service(users::delete_avatar)
                .service(users::get_avatar),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
