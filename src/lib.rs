#![doc = "The `taskmate` library crate."]
#![doc = ""]
#![doc = "Accounts with revocable session tokens, per-user tasks, avatar uploads and"]
#![doc = "transactional email for the taskmate REST API. The binary (`main.rs`) builds"]
#![doc = "the actix `App` from these pieces."]

pub mod auth;
pub mod avatar;
pub mod config;
pub mod email;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::error::AppError;
