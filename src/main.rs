use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use taskmate::auth::AuthMiddleware;
use taskmate::config::Config;
use taskmate::email::Mailer;
use taskmate::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        log::error!("invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            log::error!("failed to connect to database: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e)
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            log::error!("failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?;

    let mailer = Mailer::new(config.email.clone());
    if !mailer.is_enabled() {
        log::warn!("SENDGRID_API_KEY not set, emails will not be sent");
    }

    let pool = web::Data::new(pool);
    let jwt = web::Data::new(config.jwt.clone());
    let mailer = web::Data::new(mailer);

    log::info!("Starting taskmate server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(jwt.clone())
            .app_data(mailer.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
