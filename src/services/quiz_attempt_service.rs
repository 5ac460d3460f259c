use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_owner, Claims},
    errors::{AppError, AppResult},
    models::{
        domain::{
            quiz_question::{MIN_OPTIONS, SKIPPED_OPTION},
            AttemptAnswer, Badge, QuizAttempt, QuizQuestion,
        },
        dto::{
            quiz_dto::PublicQuizDto,
            request::{AnswerSubmission, StartAttemptRequest, SubmitAnswerRequest},
            response::{
                AnswerResultDto, AttemptDto, AttemptListResponse, AttemptReport, BreakdownEntry,
                Pagination, StartAttemptResponse,
            },
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository, UserRepository},
    services::parse_object_id,
};

const ATTEMPT_NOT_FOUND: &str = "Attempt not found";
const ALREADY_COMPLETED: &str = "Attempt is already completed";
const HIGH_SCORE_PERCENTAGE: i32 = 90;

/// Outcome of starting an attempt; `resumed` is set when an open attempt was reused.
#[derive(Debug)]
pub struct StartedAttempt {
    pub response: StartAttemptResponse,
    pub resumed: bool,
}

pub struct QuizAttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
}

impl QuizAttemptService {
    pub fn new(
        attempts: Arc<dyn QuizAttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            users,
        }
    }

    pub async fn start_attempt(
        &self,
        claims: &Claims,
        request: StartAttemptRequest,
    ) -> AppResult<StartedAttempt> {
        let quiz_id = request
            .quiz_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::ValidationError("Quiz ID is required".to_string()))?;
        let quiz_id = parse_object_id(&quiz_id, "Quiz not found")?;
        let user_id = parse_user_id(claims)?;

        let quiz = self
            .quizzes
            .find_by_id(&quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

        if !quiz.is_published {
            return Err(AppError::Forbidden("Quiz is not published".to_string()));
        }

        if let Some(open) = self.attempts.find_open(&user_id, &quiz_id).await? {
            return Ok(StartedAttempt {
                response: StartAttemptResponse {
                    attempt: open.into(),
                    quiz: PublicQuizDto::from(quiz),
                },
                resumed: true,
            });
        }

        let attempt = self.attempts.create(QuizAttempt::start(user_id, &quiz)).await?;
        log::info!(
            "User {} started attempt {} on quiz {}",
            claims.sub,
            attempt.id_hex(),
            quiz.id_hex()
        );

        Ok(StartedAttempt {
            response: StartAttemptResponse {
                attempt: attempt.into(),
                quiz: PublicQuizDto::from(quiz),
            },
            resumed: false,
        })
    }

    pub async fn submit_answer(
        &self,
        claims: &Claims,
        attempt_id: &str,
        request: SubmitAnswerRequest,
    ) -> AppResult<AnswerResultDto> {
        let submission = AnswerSubmission::try_from(request)?;
        let attempt = self.load(attempt_id).await?;
        require_owner(
            claims,
            &attempt.user_id.to_hex(),
            "You can only answer questions for your own attempts",
        )?;

        if attempt.is_completed {
            return Err(cannot_answer_completed());
        }

        let (answer, question) = grade_answer(attempt.snapshot(), &submission)?;
        let result = AnswerResultDto {
            is_correct: answer.is_correct,
            points_earned: answer.points_earned,
            correct_answer: question.correct_answer,
            explanation: question.explanation.clone(),
        };

        let id = attempt
            .id
            .ok_or_else(|| AppError::NotFound(ATTEMPT_NOT_FOUND.to_string()))?;
        self.attempts
            .save_answer(&id, answer)
            .await?
            .ok_or_else(cannot_answer_completed)?;

        Ok(result)
    }

    pub async fn complete_attempt(&self, claims: &Claims, attempt_id: &str) -> AppResult<AttemptReport> {
        let attempt = self.load(attempt_id).await?;
        require_owner(
            claims,
            &attempt.user_id.to_hex(),
            "You can only complete your own attempts",
        )?;

        if attempt.is_completed {
            return Err(AppError::BadRequest(ALREADY_COMPLETED.to_string()));
        }

        let id = attempt
            .id
            .ok_or_else(|| AppError::NotFound(ATTEMPT_NOT_FOUND.to_string()))?;
        let attempt = self
            .attempts
            .complete(&id)
            .await?
            .ok_or_else(|| AppError::BadRequest(ALREADY_COMPLETED.to_string()))?;

        log::info!(
            "Attempt {} completed with {}%",
            attempt.id_hex(),
            attempt.percentage
        );

        // The attempt is stored; statistics are best effort.
        if let Err(e) = self.record_statistics(&attempt).await {
            log::error!(
                "Failed to update statistics for attempt {}: {}",
                attempt.id_hex(),
                e
            );
        }

        Ok(build_report(&attempt))
    }

    pub async fn my_attempts(&self, claims: &Claims) -> AppResult<AttemptListResponse> {
        let user_id = parse_user_id(claims)?;
        let attempts = self.attempts.find_by_user(&user_id).await?;
        let total = attempts.len() as i64;

        Ok(AttemptListResponse {
            attempts: attempts.into_iter().map(AttemptDto::from).collect(),
            pagination: Pagination::single_page(total).into(),
        })
    }

    pub async fn get_attempt(&self, claims: &Claims, attempt_id: &str) -> AppResult<AttemptDto> {
        let attempt = self.load(attempt_id).await?;
        require_owner(
            claims,
            &attempt.user_id.to_hex(),
            "You can only view your own attempts",
        )?;
        Ok(attempt.into())
    }

    /// Each write is a single relative update, so concurrent completions all count.
    async fn record_statistics(&self, attempt: &QuizAttempt) -> AppResult<()> {
        let user_id = attempt.user_id;

        if !self
            .quizzes
            .record_attempt(&attempt.quiz_id, attempt.percentage)
            .await?
        {
            log::warn!(
                "Quiz {} vanished before its statistics were updated",
                attempt.quiz_id.to_hex()
            );
        }

        if !self
            .users
            .record_attempt(&user_id, attempt.percentage, attempt.score)
            .await?
        {
            log::warn!(
                "User {} vanished before their statistics were updated",
                user_id.to_hex()
            );
            return Ok(());
        }

        if self.users.add_badge(&user_id, Badge::first_attempt()).await? {
            log::info!("User {} earned first_attempt", user_id.to_hex());
        }
        if attempt.percentage >= HIGH_SCORE_PERCENTAGE
            && self.users.add_badge(&user_id, Badge::high_scorer()).await?
        {
            log::info!("User {} earned high_scorer", user_id.to_hex());
        }

        Ok(())
    }

    async fn load(&self, attempt_id: &str) -> AppResult<QuizAttempt> {
        let id = parse_object_id(attempt_id, ATTEMPT_NOT_FOUND)?;
        self.attempts
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(ATTEMPT_NOT_FOUND.to_string()))
    }
}

fn parse_user_id(claims: &Claims) -> AppResult<ObjectId> {
    ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))
}

fn cannot_answer_completed() -> AppError {
    AppError::BadRequest("Cannot answer questions for completed attempts".to_string())
}

/// Grades one submission against the attempt's snapshot.
pub fn grade_answer<'a>(
    snapshot: &'a [QuizQuestion],
    submission: &AnswerSubmission,
) -> AppResult<(AttemptAnswer, &'a QuizQuestion)> {
    let question = usize::try_from(submission.question_index)
        .ok()
        .and_then(|index| snapshot.get(index))
        .ok_or_else(|| AppError::BadRequest("Invalid question index".to_string()))?;

    if question.options.len() < MIN_OPTIONS {
        return Err(AppError::BadRequest(
            "Question options not available".to_string(),
        ));
    }

    let selected = submission.selected_option;
    if selected != SKIPPED_OPTION && !question.has_option(selected) {
        return Err(AppError::BadRequest(
            "Invalid selected option index".to_string(),
        ));
    }

    let (is_correct, points_earned) = question.grade(selected);
    let answer = AttemptAnswer {
        question_index: submission.question_index,
        selected_option: selected,
        is_correct,
        points_earned,
        time_spent: submission.time_spent,
        explanation: question.explanation.clone(),
    };

    Ok((answer, question))
}

/// Per-question report built from the snapshot, in answer order.
pub fn build_report(attempt: &QuizAttempt) -> AttemptReport {
    let snapshot = attempt.snapshot();
    let breakdown = attempt
        .answers
        .iter()
        .map(|answer| {
            let question = usize::try_from(answer.question_index)
                .ok()
                .and_then(|index| snapshot.get(index));

            BreakdownEntry {
                question_index: answer.question_index,
                question_text: question.map(|q| q.question_text.clone()),
                options: question.map(|q| q.options.clone()).unwrap_or_default(),
                selected_option: answer.selected_option,
                correct_answer: question.map(|q| q.correct_answer),
                is_correct: answer.is_correct,
                points_earned: answer.points_earned,
                points_available: question.map(|q| q.points).unwrap_or(0),
                explanation: question
                    .and_then(|q| q.explanation.clone())
                    .unwrap_or_default(),
                time_spent: answer.time_spent,
            }
        })
        .collect();

    AttemptReport {
        score: attempt.score,
        total_possible_score: attempt.total_possible_score,
        percentage: attempt.percentage,
        time_taken: attempt.time_taken,
        feedback: attempt.feedback,
        breakdown,
    }
}
