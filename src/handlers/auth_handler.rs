use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    middleware::get_request_id,
    models::{
        domain::refresh_token::ClientInfo,
        dto::{
            request::{LoginRequest, RefreshTokenRequest, RegisterRequest},
            response::ApiResponse,
        },
    },
};

/// User agent and client address recorded with issued refresh tokens.
fn client_info(req: &HttpRequest) -> ClientInfo {
    ClientInfo {
        user_agent: req
            .headers()
            .get(actix_web::http::header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ip_address: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
    }
}

#[post("/register")]
async fn register(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .auth_service
        .register(request.into_inner(), client_info(&req))
        .await?;
    log::info!(
        "Registered user {} [{}]",
        response.user.id,
        get_request_id(&req).unwrap_or_default()
    );
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        "User registered successfully",
        response,
    )))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .auth_service
        .login(request.into_inner(), client_info(&req))
        .await?;
    log::info!(
        "User {} logged in [{}]",
        response.user.id,
        get_request_id(&req).unwrap_or_default()
    );
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Login successful", response)))
}

#[post("/refresh")]
async fn refresh(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.refresh(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message("Access token refreshed", response)))
}

#[post("/logout")]
async fn logout(
    state: web::Data<AppState>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    state.auth_service.logout(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
}

#[get("/me")]
async fn me(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.get_profile(auth.user_id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(user)))
}

// The user listing was withdrawn; admins get a 410 so old clients can tell.
#[get("/users")]
async fn list_users(auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    require_admin(auth.claims())?;
    Err(AppError::Gone("Endpoint removed".to_string()))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(refresh)
        .service(logout)
        .service(me)
        .service(list_users);
}
