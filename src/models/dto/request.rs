use serde::Deserialize;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::Badge;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Pages past this are empty for any realistic collection; the cap keeps skip arithmetic in range.
pub const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters long"))]
    pub username: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

impl RegisterRequest {
    pub fn normalized(mut self) -> AppResult<Self> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(AppError::ValidationError(
                "Username, email, and password are required".to_string(),
            ));
        }
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters long"))]
    pub username: Option<String>,

    #[validate(length(max = 2048))]
    pub avatar: Option<String>,
}

impl UpdateProfileRequest {
    /// Blank usernames are ignored rather than rejected.
    pub fn normalized(mut self) -> AppResult<Self> {
        self.username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddBadgeRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl TryFrom<AddBadgeRequest> for Badge {
    type Error = AppError;

    fn try_from(request: AddBadgeRequest) -> Result<Self, Self::Error> {
        let id = request.id.map(|v| v.trim().to_string()).unwrap_or_default();
        let name = request.name.map(|v| v.trim().to_string()).unwrap_or_default();
        if id.is_empty() || name.is_empty() {
            return Err(AppError::ValidationError(
                "Badge id and name are required".to_string(),
            ));
        }
        Ok(Badge::new(
            &id,
            &name,
            request.description.as_deref().unwrap_or(""),
            request
                .icon
                .as_deref()
                .filter(|icon| !icon.is_empty())
                .unwrap_or("🏅"),
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub quiz_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_index: Option<i32>,
    pub selected_option: Option<i32>,
    pub time_spent: Option<i32>,
}

/// A submitted answer after presence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub question_index: i32,
    pub selected_option: i32,
    pub time_spent: i32,
}

impl TryFrom<SubmitAnswerRequest> for AnswerSubmission {
    type Error = AppError;

    fn try_from(request: SubmitAnswerRequest) -> Result<Self, Self::Error> {
        match (request.question_index, request.selected_option, request.time_spent) {
            (Some(question_index), Some(selected_option), Some(time_spent)) => {
                if time_spent < 0 {
                    return Err(AppError::ValidationError(
                        "Time spent cannot be negative".to_string(),
                    ));
                }
                Ok(AnswerSubmission {
                    question_index,
                    selected_option,
                    time_spent,
                })
            }
            _ => Err(AppError::ValidationError(
                "Question index, selected option, and time spent are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizListParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl QuizListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

impl LeaderboardParams {
    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}
