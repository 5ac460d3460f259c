use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    auth::{require_owner, Claims},
    errors::{AppError, AppResult},
    models::{
        domain::{quiz::NewQuiz, Quiz},
        dto::{
            quiz_dto::{AuthorQuizDto, CreateQuizRequest, PublicQuizDto, UpdateQuizRequest},
            request::QuizListParams,
            response::{Pagination, QuizListResponse},
        },
    },
    repositories::{QuizFilter, QuizRepository},
    services::parse_object_id,
};

const QUIZ_NOT_FOUND: &str = "Quiz not found";

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_quizzes(&self, params: QuizListParams) -> AppResult<QuizListResponse> {
        let (page, limit, offset) = (params.page(), params.limit(), params.offset());
        let filter = QuizFilter::new(params.category, params.difficulty, params.search);

        let (quizzes, total) = self.repository.list_listed(&filter, offset, limit).await?;
        let pagination = Pagination::new(page, limit, quizzes.len() as i64, total);

        Ok(QuizListResponse {
            quizzes: quizzes.into_iter().map(PublicQuizDto::from).collect(),
            pagination: pagination.into(),
        })
    }

    pub async fn my_quizzes(&self, user_id: &str) -> AppResult<Vec<AuthorQuizDto>> {
        let author_id = parse_author_id(user_id)?;
        let quizzes = self.repository.find_by_author(&author_id).await?;
        Ok(quizzes.into_iter().map(AuthorQuizDto::from).collect())
    }

    /// Public view of a listed quiz, without the answer key.
    pub async fn get_quiz(&self, id: &str) -> AppResult<PublicQuizDto> {
        let quiz = self.load(id).await?;
        if !quiz.is_listed() {
            return Err(AppError::Forbidden("Quiz is not available".to_string()));
        }
        Ok(quiz.into())
    }

    pub async fn create_quiz(
        &self,
        user_id: &str,
        request: CreateQuizRequest,
    ) -> AppResult<AuthorQuizDto> {
        let author_id = parse_author_id(user_id)?;
        let new_quiz = NewQuiz::try_from(request)?;

        let quiz = self.repository.create(Quiz::new(new_quiz, author_id)).await?;
        log::info!(
            "Quiz {} ({}) created by {}",
            quiz.id_hex(),
            quiz.difficulty.as_str(),
            user_id
        );
        Ok(quiz.into())
    }

    pub async fn update_quiz(
        &self,
        claims: &Claims,
        id: &str,
        request: UpdateQuizRequest,
    ) -> AppResult<AuthorQuizDto> {
        let mut quiz = self.load(id).await?;
        require_owner(
            claims,
            &quiz.author_id.to_hex(),
            "You can only edit your own quizzes",
        )?;

        if !quiz.is_editable() {
            return Err(AppError::BadRequest(
                "Cannot edit published quiz that has attempts".to_string(),
            ));
        }

        request.apply_to(&mut quiz)?;
        let quiz = self.repository.update(quiz).await?;
        Ok(quiz.into())
    }

    pub async fn delete_quiz(&self, claims: &Claims, id: &str) -> AppResult<()> {
        let quiz = self.load(id).await?;
        require_owner(
            claims,
            &quiz.author_id.to_hex(),
            "You can only delete your own quizzes",
        )?;

        let quiz_id = quiz.id.ok_or_else(|| AppError::NotFound(QUIZ_NOT_FOUND.to_string()))?;
        // The repository re-checks, so a completion landing after the load still blocks deletion.
        if !quiz.is_deletable() || !self.repository.delete_unattempted(&quiz_id).await? {
            return Err(AppError::BadRequest(
                "Cannot delete quiz that has attempts".to_string(),
            ));
        }
        log::info!("Quiz {} deleted by {}", quiz_id.to_hex(), claims.sub);
        Ok(())
    }

    pub async fn set_published(
        &self,
        claims: &Claims,
        id: &str,
        is_published: bool,
    ) -> AppResult<AuthorQuizDto> {
        let mut quiz = self.load(id).await?;
        require_owner(
            claims,
            &quiz.author_id.to_hex(),
            "You can only publish your own quizzes",
        )?;

        quiz.is_published = is_published;
        let quiz = self.repository.update(quiz).await?;
        Ok(quiz.into())
    }

    async fn load(&self, id: &str) -> AppResult<Quiz> {
        let quiz_id = parse_object_id(id, QUIZ_NOT_FOUND)?;
        self.repository
            .find_by_id(&quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(QUIZ_NOT_FOUND.to_string()))
    }
}

fn parse_author_id(user_id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(user_id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))
}
