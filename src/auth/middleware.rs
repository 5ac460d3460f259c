use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::Header, web, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};

use crate::{app_state::AppState, auth::Claims, errors::AppError};

pub const MOCK_TOKEN_PREFIX: &str = "mock-jwt-token-";

/// Extractor for the caller's identity. Handlers that take it are protected.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn user_id(&self) -> &str {
        &self.0.sub
    }

    pub fn claims(&self) -> &Claims {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(AuthenticatedUser))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Claims, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;

    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

    if state.config.allow_mock_tokens() {
        if let Some(user_id) = token.strip_prefix(MOCK_TOKEN_PREFIX) {
            return Ok(Claims::mock(user_id));
        }
    }

    state.jwt_service.validate_token(&token)
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let auth = Authorization::<Bearer>::parse(req).ok()?;
    let token = auth.as_ref().token().trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
