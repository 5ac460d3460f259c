use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{StartAttemptRequest, SubmitAnswerRequest},
        response::ApiResponse,
    },
};

#[post("/start")]
async fn start_attempt(
    state: web::Data<AppState>,
    request: web::Json<StartAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let started = state
        .attempt_service
        .start_attempt(auth.claims(), request.into_inner())
        .await?;

    if started.resumed {
        return Ok(HttpResponse::Ok().json(ApiResponse::with_message(
            "Resuming existing attempt",
            started.response,
        )));
    }
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "Quiz attempt started",
        started.response,
    )))
}

#[post("/{id}/answer")]
async fn submit_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .attempt_service
        .submit_answer(auth.claims(), &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Answer submitted successfully", result)))
}

#[post("/{id}/complete")]
async fn complete_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let report = state
        .attempt_service
        .complete_attempt(auth.claims(), &id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Quiz attempt completed", report)))
}

#[get("/my-attempts")]
async fn my_attempts(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let response = state.attempt_service.my_attempts(auth.claims()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(response)))
}

#[get("/{id}")]
async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state.attempt_service.get_attempt(auth.claims(), &id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(attempt)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(start_attempt)
        .service(submit_answer)
        .service(complete_attempt)
        .service(my_attempts)
        .service(get_attempt);
}
