pub mod auth_service;
pub mod leaderboard_service;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use leaderboard_service::LeaderboardService;
pub use quiz_attempt_service::QuizAttemptService;
pub use quiz_service::QuizService;
pub use user_service::UserService;

use mongodb::bson::oid::ObjectId;

use crate::errors::{AppError, AppResult};

/// Malformed ids are reported the same way as unknown ones.
pub(crate) fn parse_object_id(id: &str, not_found: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::NotFound(not_found.to_string()))
}
