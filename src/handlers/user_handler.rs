use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{AddBadgeRequest, UpdateProfileRequest},
        response::ApiResponse,
    },
};

#[get("/profile")]
async fn get_profile(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.get_profile(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user)))
}

#[put("/profile")]
async fn update_profile(
    state: web::Data<AppState>,
    request: web::Json<UpdateProfileRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .update_profile(auth.user_id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user)))
}

#[post("/badges")]
async fn add_badge(
    state: web::Data<AppState>,
    request: web::Json<AddBadgeRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .add_badge(auth.user_id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_profile)
        .service(update_profile)
        .service(add_badge);
}
