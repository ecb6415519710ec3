use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Liveness probe. Does not touch the database.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now()
    }))
}
