use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        quiz_dto::{CreateQuizRequest, PublishQuizRequest, UpdateQuizRequest},
        request::QuizListParams,
        response::ApiResponse,
    },
};

#[get("")]
async fn list_quizzes(
    state: web::Data<AppState>,
    query: web::Query<QuizListParams>,
) -> Result<HttpResponse, AppError> {
    let response = state.quiz_service.list_quizzes(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(response)))
}

#[get("/my-quizzes")]
async fn my_quizzes(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quizzes = state.quiz_service.my_quizzes(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(quizzes)))
}

#[get("/{id}")]
async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(quiz)))
}

#[post("")]
async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .create_quiz(auth.user_id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message("Quiz created successfully", quiz)))
}

#[put("/{id}")]
async fn update_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .update_quiz(auth.claims(), &id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Quiz updated successfully", quiz)))
}

#[delete("/{id}")]
async fn delete_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.quiz_service.delete_quiz(auth.claims(), &id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Quiz deleted successfully")))
}

#[post("/{id}/publish")]
async fn publish_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<PublishQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let is_published = request.is_published;
    let quiz = state
        .quiz_service
        .set_published(auth.claims(), &id, is_published)
        .await?;

    let message = if is_published {
        "Quiz published successfully"
    } else {
        "Quiz unpublished successfully"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(message, quiz)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // `/my-quizzes` must win over `/{id}`
    cfg.service(my_quizzes)
        .service(list_quizzes)
        .service(create_quiz)
        .service(get_quiz)
        .service(update_quiz)
        .service(delete_quiz)
        .service(publish_quiz);
}
