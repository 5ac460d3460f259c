use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::quiz_question::QuizQuestion;
use crate::models::domain::serde_helpers::chrono_datetime_as_bson_datetime;

pub const MAX_QUESTIONS: usize = 100;
pub const MAX_TIME_LIMIT_MINUTES: i32 = 180;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub time_limit: i32, // minutes
    pub questions: Vec<QuizQuestion>,
    pub author_id: ObjectId,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_questions: i32,
    #[serde(default)]
    pub total_time: i32, // seconds
    #[serde(default)]
    pub average_score: i32,
    #[serde(default)]
    pub total_attempts: i32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

fn default_public() -> bool {
    true
}

pub struct NewQuiz {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub time_limit: i32,
    pub questions: Vec<QuizQuestion>,
    pub tags: Vec<String>,
}

impl Quiz {
    /// New quizzes start unpublished and public.
    pub fn new(new_quiz: NewQuiz, author_id: ObjectId) -> Self {
        let now = Utc::now();
        let mut quiz = Quiz {
            id: None,
            title: new_quiz.title.trim().to_string(),
            description: new_quiz.description.trim().to_string(),
            category: new_quiz.category.trim().to_string(),
            difficulty: new_quiz.difficulty,
            time_limit: new_quiz.time_limit,
            questions: new_quiz.questions,
            author_id,
            is_published: false,
            is_public: true,
            tags: new_quiz.tags,
            total_questions: 0,
            total_time: 0,
            average_score: 0,
            total_attempts: 0,
            created_at: now,
            updated_at: now,
        };
        quiz.recalculate_totals();
        quiz
    }

    /// Refreshes derived counters; run before every write.
    pub fn recalculate_totals(&mut self) {
        self.total_questions = self.questions.len() as i32;
        self.total_time = self
            .questions
            .iter()
            .map(|q| q.time_limit.unwrap_or(0))
            .sum();
        self.updated_at = Utc::now();
    }

    pub fn total_points(&self) -> i32 {
        self.questions.iter().map(|q| q.points.max(0)).sum()
    }

    pub fn is_listed(&self) -> bool {
        self.is_published && self.is_public
    }

    pub fn is_editable(&self) -> bool {
        !(self.is_published && self.total_attempts > 0)
    }

    pub fn is_deletable(&self) -> bool {
        self.total_attempts == 0
    }

    pub fn record_completed_attempt(&mut self, percentage: i32) {
        let previous = self.total_attempts as i64;
        let sum = self.average_score as i64 * previous + percentage as i64;
        self.total_attempts += 1;
        self.average_score = ((sum as f64) / (self.total_attempts as f64)).round() as i32;
        self.updated_at = Utc::now();
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|oid| oid.to_hex()).unwrap_or_default()
    }
}

#[cfg(test)]
pub fn sample_quiz(author_id: ObjectId) -> Quiz {
    use crate::models::domain::quiz_question::sample_question;

    let mut quiz = Quiz::new(
        NewQuiz {
            title: "Rust Basics".to_string(),
            description: "Ownership, borrowing and bindings".to_string(),
            category: "Programming".to_string(),
            difficulty: Difficulty::Easy,
            time_limit: 10,
            questions: vec![sample_question(0, 2), sample_question(1, 3)],
            tags: vec!["rust".to_string()],
        },
        author_id,
    );
    quiz.id = Some(ObjectId::new());
    quiz
}
