use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{request::LeaderboardParams, response::ApiResponse},
};

#[get("/global")]
async fn global_leaderboard(
    state: web::Data<AppState>,
    query: web::Query<LeaderboardParams>,
) -> Result<HttpResponse, AppError> {
    let entries = state.leaderboard_service.global(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(entries)))
}

#[get("/quiz/{id}")]
async fn quiz_leaderboard(
    state: web::Data<AppState>,
    id: web::Path<String>,
    query: web::Query<LeaderboardParams>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .leaderboard_service
        .for_quiz(&id, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(response)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(global_leaderboard).service(quiz_leaderboard);
}
