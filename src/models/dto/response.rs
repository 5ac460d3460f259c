use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::{
    AttemptAnswer, Badge, Feedback, QuizAttempt, User, UserRole,
};
use crate::models::dto::quiz_dto::PublicQuizDto;

/// Envelope shared by every success response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub earned_at: DateTime<Utc>,
}

impl From<Badge> for BadgeDto {
    fn from(badge: Badge) -> Self {
        BadgeDto {
            id: badge.id,
            name: badge.name,
            description: badge.description,
            icon: badge.icon,
            earned_at: badge.earned_at,
        }
    }
}

/// Public view of a user; the password hash is never part of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub avatar: String,
    pub join_date: DateTime<Utc>,
    pub total_quizzes_attempted: i32,
    pub average_score: i32,
    pub highest_score: i32,
    pub badges: Vec<BadgeDto>,
    pub level: i32,
    pub experience: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id_hex(),
            username: user.username,
            email: user.email,
            role: user.role,
            avatar: user.avatar,
            join_date: user.join_date,
            total_quizzes_attempted: user.total_quizzes_attempted,
            average_score: user.average_score,
            highest_score: user.highest_score,
            badges: user.badges.into_iter().map(BadgeDto::from).collect(),
            level: user.level,
            experience: user.experience,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserDto,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    #[serde(skip)]
    pub total: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, returned: i64, total: i64) -> Self {
        let limit = limit.max(1);
        let skip = page.saturating_sub(1).saturating_mul(limit);
        Pagination {
            current_page: page,
            total_pages: (total.saturating_add(limit - 1) / limit).max(1),
            total,
            has_next: skip.saturating_add(returned) < total,
            has_prev: page > 1,
        }
    }

    pub fn single_page(total: i64) -> Self {
        Pagination {
            current_page: 1,
            total_pages: 1,
            total,
            has_next: false,
            has_prev: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizListResponse {
    pub quizzes: Vec<PublicQuizDto>,
    pub pagination: QuizPagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPagination {
    #[serde(flatten)]
    pub page: Pagination,
    pub total_quizzes: i64,
}

impl From<Pagination> for QuizPagination {
    fn from(page: Pagination) -> Self {
        QuizPagination {
            total_quizzes: page.total,
            page,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDto {
    pub question_index: i32,
    pub selected_option: i32,
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_spent: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl From<AttemptAnswer> for AnswerDto {
    fn from(answer: AttemptAnswer) -> Self {
        AnswerDto {
            question_index: answer.question_index,
            selected_option: answer.selected_option,
            is_correct: answer.is_correct,
            points_earned: answer.points_earned,
            time_spent: answer.time_spent,
            explanation: answer.explanation,
        }
    }
}

/// Attempt view; the question snapshot stays server side because it holds the answer key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDto {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub quiz: String,
    pub answers: Vec<AnswerDto>,
    pub score: i32,
    pub total_possible_score: i32,
    pub percentage: i32,
    pub time_taken: i32,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub feedback: Feedback,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<QuizAttempt> for AttemptDto {
    fn from(attempt: QuizAttempt) -> Self {
        AttemptDto {
            id: attempt.id_hex(),
            user: attempt.user_id.to_hex(),
            quiz: attempt.quiz_id.to_hex(),
            answers: attempt.answers.into_iter().map(AnswerDto::from).collect(),
            score: attempt.score,
            total_possible_score: attempt.total_possible_score,
            percentage: attempt.percentage,
            time_taken: attempt.time_taken,
            started_at: attempt.started_at,
            completed_at: attempt.completed_at,
            is_completed: attempt.is_completed,
            feedback: attempt.feedback,
            rank: attempt.rank,
            created_at: attempt.created_at,
            updated_at: attempt.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt: AttemptDto,
    pub quiz: PublicQuizDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptListResponse {
    pub attempts: Vec<AttemptDto>,
    pub pagination: AttemptPagination,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPagination {
    #[serde(flatten)]
    pub page: Pagination,
    pub total_attempts: i64,
}

impl From<Pagination> for AttemptPagination {
    fn from(page: Pagination) -> Self {
        AttemptPagination {
            total_attempts: page.total,
            page,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultDto {
    pub is_correct: bool,
    pub points_earned: i32,
    pub correct_answer: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub question_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,
    pub options: Vec<String>,
    pub selected_option: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<i32>,
    pub is_correct: bool,
    pub points_earned: i32,
    pub points_available: i32,
    pub explanation: String,
    pub time_spent: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub score: i32,
    pub total_possible_score: i32,
    pub percentage: i32,
    pub time_taken: i32,
    pub feedback: Feedback,
    pub breakdown: Vec<BreakdownEntry>,
}

/// One row produced by the leaderboard aggregation pipelines.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LeaderboardRow {
    #[serde(rename = "_id")]
    pub attempt_id: ObjectId,
    pub user_id: ObjectId,
    pub username: String,
    pub quiz_id: ObjectId,
    pub score: i32,
    pub percentage: i32,
    pub time_taken: i32,
    #[serde(
        default,
        with = "crate::models::domain::serde_helpers::optional_chrono_datetime_as_bson_datetime"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub attempt_id: String,
    pub rank: i32,
    pub user_id: String,
    pub username: String,
    pub quiz_id: String,
    pub score: i32,
    pub percentage: i32,
    pub time_taken: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntryDto {
    pub fn from_row(row: LeaderboardRow, rank: i32) -> Self {
        LeaderboardEntryDto {
            attempt_id: row.attempt_id.to_hex(),
            rank,
            user_id: row.user_id.to_hex(),
            username: row.username,
            quiz_id: row.quiz_id.to_hex(),
            score: row.score,
            percentage: row.percentage,
            time_taken: row.time_taken,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummaryDto {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizLeaderboardResponse {
    pub quiz: QuizSummaryDto,
    pub entries: Vec<LeaderboardEntryDto>,
}
