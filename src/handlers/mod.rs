pub mod attempt_handler;
pub mod auth_handler;
pub mod health_handler;
pub mod leaderboard_handler;
pub mod quiz_handler;
pub mod user_handler;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::errors::AppError;

/// Mounts every API route under `api_prefix`.
pub fn configure_routes(cfg: &mut web::ServiceConfig, api_prefix: &str) {
    cfg.service(
        web::scope(api_prefix)
            .configure(health_handler::configure)
            .service(web::scope("/auth").configure(auth_handler::configure))
            .service(web::scope("/quiz").configure(quiz_handler::configure))
            .service(web::scope("/attempt").configure(attempt_handler::configure))
            .service(web::scope("/leaderboard").configure(leaderboard_handler::configure))
            .service(web::scope("/user").configure(user_handler::configure)),
    );
}

/// JSON extractor settings: body size cap and error bodies in the API envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            log::debug!("Rejected JSON payload: {}", err);
            AppError::BadRequest(err.to_string()).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    })
}

pub async fn route_not_found() -> Result<actix_web::HttpResponse, AppError> {
    Err(AppError::NotFound("Route not found".to_string()))
}
