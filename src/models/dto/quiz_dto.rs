use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::quiz::{NewQuiz, MAX_QUESTIONS};
use crate::models::domain::quiz_question::{MAX_OPTIONS, MIN_OPTIONS, MIN_QUESTION_TIME_LIMIT};
use crate::models::domain::{Difficulty, Quiz, QuizQuestion};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
	#[serde(default)]
	pub question_text: String,
	#[serde(default)]
	pub options: Vec<String>,
	#[serde(default = "invalid_answer")]
	pub correct_answer: i32,
	#[serde(default)]
	pub explanation: Option<String>,
	#[serde(default = "default_points")]
	pub points: i32,
	#[serde(default)]
	pub time_limit: Option<i32>,
}

fn default_points() -> i32 {
	1
}

fn invalid_answer() -> i32 {
	-1
}

impl QuestionInput {
	/// `number` is the 1-based position used in error messages.
	pub fn into_question(self, number: usize) -> AppResult<QuizQuestion> {
		let question_text = self.question_text.trim().to_string();
		if question_text.is_empty() || self.options.len() < MIN_OPTIONS {
			return Err(AppError::ValidationError(format!("Question {} is invalid", number)));
		}
		if self.options.len() > MAX_OPTIONS {
			return Err(AppError::ValidationError(format!(
				"Question {} must have between {} and {} options",
				number, MIN_OPTIONS, MAX_OPTIONS
			)));
		}
		if self.correct_answer < 0 || self.correct_answer as usize >= self.options.len() {
			return Err(AppError::ValidationError(format!(
				"Question {} has invalid correct answer index",
				number
			)));
		}
		if self.points < 1 {
			return Err(AppError::ValidationError(format!(
				"Question {} must be worth at least 1 point",
				number
			)));
		}
		if matches!(self.time_limit, Some(limit) if limit < MIN_QUESTION_TIME_LIMIT) {
			return Err(AppError::ValidationError(format!(
				"Question {} time limit must be at least {} seconds",
				number, MIN_QUESTION_TIME_LIMIT
			)));
		}

		Ok(QuizQuestion {
			question_text,
			options: self.options,
			correct_answer: self.correct_answer,
			explanation: self
				.explanation
				.map(|e| e.trim().to_string())
				.filter(|e| !e.is_empty()),
			points: self.points,
			time_limit: self.time_limit,
		})
	}
}

pub fn questions_from_inputs(inputs: Vec<QuestionInput>) -> AppResult<Vec<QuizQuestion>> {
	if inputs.is_empty() {
		return Err(AppError::ValidationError(
			"Quiz must have at least one question".to_string(),
		));
	}
	if inputs.len() > MAX_QUESTIONS {
		return Err(AppError::ValidationError(format!(
			"Quiz must have between 1 and {} questions",
			MAX_QUESTIONS
		)));
	}
	inputs
		.into_iter()
		.enumerate()
		.map(|(i, input)| input.into_question(i + 1))
		.collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
	#[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
	pub title: String,

	#[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
	pub description: String,

	#[validate(length(min = 1, message = "Category is required"))]
	pub category: String,

	pub difficulty: Difficulty,

	#[validate(range(min = 1, max = 180, message = "Time limit must be between 1 and 180 minutes"))]
	pub time_limit: i32,

	pub questions: Vec<QuestionInput>,

	#[serde(default)]
	pub tags: Vec<String>,
}

impl TryFrom<CreateQuizRequest> for NewQuiz {
	type Error = AppError;

	fn try_from(mut request: CreateQuizRequest) -> Result<Self, Self::Error> {
		request.title = request.title.trim().to_string();
		request.description = request.description.trim().to_string();
		request.category = request.category.trim().to_string();
		request.validate()?;

		Ok(NewQuiz {
			questions: questions_from_inputs(request.questions)?,
			title: request.title,
			description: request.description,
			category: request.category,
			difficulty: request.difficulty,
			time_limit: request.time_limit,
			tags: normalize_tags(request.tags),
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizRequest {
	#[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
	pub title: Option<String>,

	#[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
	pub description: Option<String>,

	#[validate(length(min = 1, message = "Category is required"))]
	pub category: Option<String>,

	pub difficulty: Option<Difficulty>,

	#[validate(range(min = 1, max = 180, message = "Time limit must be between 1 and 180 minutes"))]
	pub time_limit: Option<i32>,

	pub questions: Option<Vec<QuestionInput>>,

	pub tags: Option<Vec<String>>,

	pub is_public: Option<bool>,
}

impl UpdateQuizRequest {
	/// Validates the request and applies the present fields to `quiz`.
	pub fn apply_to(self, quiz: &mut Quiz) -> AppResult<()> {
		let mut request = self;
		request.title = request.title.map(|t| t.trim().to_string());
		request.description = request.description.map(|d| d.trim().to_string());
		request.category = request.category.map(|c| c.trim().to_string());
		request.validate()?;

		if let Some(questions) = request.questions {
			quiz.questions = questions_from_inputs(questions)?;
		}
		if let Some(title) = request.title {
			quiz.title = title;
		}
		if let Some(description) = request.description {
			quiz.description = description;
		}
		if let Some(category) = request.category {
			quiz.category = category;
		}
		if let Some(difficulty) = request.difficulty {
			quiz.difficulty = difficulty;
		}
		if let Some(time_limit) = request.time_limit {
			quiz.time_limit = time_limit;
		}
		if let Some(tags) = request.tags {
			quiz.tags = normalize_tags(tags);
		}
		if let Some(is_public) = request.is_public {
			quiz.is_public = is_public;
		}
		quiz.recalculate_totals();
		Ok(())
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishQuizRequest {
	pub is_published: bool,
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
	let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
	for tag in tags {
		let tag = tag.trim().to_string();
		if !tag.is_empty() && !normalized.contains(&tag) {
			normalized.push(tag);
		}
	}
	normalized
}

/// Author view of a question, including the answer key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
	pub question_text: String,
	pub options: Vec<String>,
	pub correct_answer: i32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub explanation: Option<String>,
	pub points: i32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub time_limit: Option<i32>,
}

impl From<QuizQuestion> for QuestionDto {
	fn from(question: QuizQuestion) -> Self {
		QuestionDto {
			question_text: question.question_text,
			options: question.options,
			correct_answer: question.correct_answer,
			explanation: question.explanation,
			points: question.points,
			time_limit: question.time_limit,
		}
	}
}

/// Player view of a question; only the answer key is withheld.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestionDto {
	pub question_text: String,
	pub options: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub explanation: Option<String>,
	pub points: i32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub time_limit: Option<i32>,
}

impl From<QuizQuestion> for PublicQuestionDto {
	fn from(question: QuizQuestion) -> Self {
		PublicQuestionDto {
			question_text: question.question_text,
			options: question.options,
			explanation: question.explanation,
			points: question.points,
			time_limit: question.time_limit,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDto<Q> {
	#[serde(rename = "_id")]
	pub id: String,
	pub title: String,
	pub description: String,
	pub category: String,
	pub difficulty: Difficulty,
	pub time_limit: i32,
	pub questions: Vec<Q>,
	pub author: String,
	pub is_published: bool,
	pub is_public: bool,
	pub tags: Vec<String>,
	pub total_questions: i32,
	pub total_time: i32,
	pub average_score: i32,
	pub total_attempts: i32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

pub type AuthorQuizDto = QuizDto<QuestionDto>;
pub type PublicQuizDto = QuizDto<PublicQuestionDto>;

impl<Q: From<QuizQuestion>> From<Quiz> for QuizDto<Q> {
	fn from(quiz: Quiz) -> Self {
		QuizDto {
			id: quiz.id_hex(),
			title: quiz.title,
			description: quiz.description,
			category: quiz.category,
			difficulty: quiz.difficulty,
			time_limit: quiz.time_limit,
			questions: quiz.questions.into_iter().map(Q::from).collect(),
			author: quiz.author_id.to_hex(),
			is_published: quiz.is_published,
			is_public: quiz.is_public,
			tags: quiz.tags,
			total_questions: quiz.total_questions,
			total_time: quiz.total_time,
			average_score: quiz.average_score,
			total_attempts: quiz.total_attempts,
			created_at: quiz.created_at,
			updated_at: quiz.updated_at,
		}
	}
}
