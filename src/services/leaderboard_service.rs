use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    errors::{AppError, AppResult},
    models::dto::{
        request::LeaderboardParams,
        response::{LeaderboardEntryDto, LeaderboardRow, QuizLeaderboardResponse, QuizSummaryDto},
    },
    repositories::{QuizAttemptRepository, QuizRepository},
};

pub struct LeaderboardService {
    attempts: Arc<dyn QuizAttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
}

impl LeaderboardService {
    pub fn new(attempts: Arc<dyn QuizAttemptRepository>, quizzes: Arc<dyn QuizRepository>) -> Self {
        Self { attempts, quizzes }
    }

    /// Best completed attempt per user.
    pub async fn global(&self, params: LeaderboardParams) -> AppResult<Vec<LeaderboardEntryDto>> {
        let rows = self.attempts.global_leaderboard(params.limit()).await?;
        Ok(rank_rows(rows))
    }

    pub async fn for_quiz(
        &self,
        quiz_id: &str,
        params: LeaderboardParams,
    ) -> AppResult<QuizLeaderboardResponse> {
        // unlike the quiz routes, a malformed id here is a client error
        let quiz_id = ObjectId::parse_str(quiz_id.trim())
            .map_err(|_| AppError::BadRequest("Invalid quiz id".to_string()))?;

        let quiz = self
            .quizzes
            .find_by_id(&quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        let rows = self.attempts.quiz_leaderboard(&quiz_id, params.limit()).await?;

        Ok(QuizLeaderboardResponse {
            quiz: QuizSummaryDto {
                id: quiz_id.to_hex(),
                title: quiz.title,
            },
            entries: rank_rows(rows),
        })
    }
}

/// Rows arrive sorted; rank is the 1-based position.
fn rank_rows(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntryDto> {
    rows.into_iter()
        .enumerate()
        .map(|(position, row)| LeaderboardEntryDto::from_row(row, position as i32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        models::domain::quiz::sample_quiz,
        repositories::{MockQuizAttemptRepository, MockQuizRepository},
    };

    fn row(username: &str, score: i32) -> LeaderboardRow {
        LeaderboardRow {
            attempt_id: ObjectId::new(),
            user_id: ObjectId::new(),
            username: username.to_string(),
            quiz_id: ObjectId::new(),
            score,
            percentage: score * 10,
            time_taken: 30,
            completed_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_global_assigns_ranks_and_clamps_limit() {
        let mut attempts = MockQuizAttemptRepository::new();
        attempts
            .expect_global_leaderboard()
            .withf(|limit| *limit == 100)
            .returning(|_| Ok(vec![row("ada", 9), row("linus", 7)]));

        let service = LeaderboardService::new(Arc::new(attempts), Arc::new(MockQuizRepository::new()));
        let entries = service
            .global(LeaderboardParams { limit: Some(1000) })
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].username, "ada");
        assert_eq!(entries[1].rank, 2);
    }

    #[tokio::test]
    async fn test_quiz_leaderboard_rejects_malformed_id() {
        let service = LeaderboardService::new(
            Arc::new(MockQuizAttemptRepository::new()),
            Arc::new(MockQuizRepository::new()),
        );
        let err = service
            .for_quiz("nope", LeaderboardParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Invalid quiz id"));
    }

    #[tokio::test]
    async fn test_quiz_leaderboard_unknown_quiz() {
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_find_by_id().returning(|_| Ok(None));
        let service = LeaderboardService::new(Arc::new(MockQuizAttemptRepository::new()), Arc::new(quizzes));

        let err = service
            .for_quiz(&ObjectId::new().to_hex(), LeaderboardParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_quiz_leaderboard_includes_title() {
        let quiz = sample_quiz(ObjectId::new());
        let quiz_id = quiz.id.unwrap();
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        let mut attempts = MockQuizAttemptRepository::new();
        attempts
            .expect_quiz_leaderboard()
            .withf(move |id, limit| *id == quiz_id && *limit == 10)
            .returning(|_, _| Ok(vec![row("ada", 5)]));

        let service = LeaderboardService::new(Arc::new(attempts), Arc::new(quizzes));
        let response = service
            .for_quiz(&quiz_id.to_hex(), LeaderboardParams::default())
            .await
            .unwrap();

        assert_eq!(response.quiz.title, "Rust Basics");
        assert_eq!(response.quiz.id, quiz_id.to_hex());
        assert_eq!(response.entries[0].rank, 1);
    }
}
