use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::quiz::Quiz;
use crate::models::domain::quiz_question::QuizQuestion;
use crate::models::domain::serde_helpers::{
    chrono_datetime_as_bson_datetime, optional_chrono_datetime_as_bson_datetime,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub quiz_id: ObjectId,
    #[serde(default)]
    pub answers: Vec<AttemptAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_snapshot: Option<Vec<QuizQuestion>>,
    #[serde(default)]
    pub score: i32,
    pub total_possible_score: i32,
    #[serde(default)]
    pub percentage: i32,
    #[serde(default)]
    pub time_taken: i32, // seconds
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        with = "optional_chrono_datetime_as_bson_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttemptAnswer {
    pub question_index: i32,
    pub selected_option: i32, // -1 when skipped or timed out
    pub is_correct: bool,
    pub points_earned: i32,
    pub time_spent: i32, // seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Default, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Excellent,
    Good,
    #[default]
    Average,
    BelowAverage,
    Poor,
}

impl Feedback {
    pub fn from_percentage(percentage: i32) -> Self {
        match percentage {
            p if p >= 90 => Feedback::Excellent,
            p if p >= 80 => Feedback::Good,
            p if p >= 70 => Feedback::Average,
            p if p >= 60 => Feedback::BelowAverage,
            _ => Feedback::Poor,
        }
    }
}

impl QuizAttempt {
    /// Opens an attempt against a copy of the quiz's current questions.
    pub fn start(user_id: ObjectId, quiz: &Quiz) -> Self {
        let now = Utc::now();
        QuizAttempt {
            id: None,
            user_id,
            quiz_id: quiz.id.unwrap_or_default(),
            answers: Vec::new(),
            questions_snapshot: Some(quiz.questions.clone()),
            score: 0,
            total_possible_score: quiz.total_points(),
            percentage: 0,
            time_taken: 0,
            started_at: now,
            completed_at: None,
            is_completed: false,
            feedback: Feedback::Average,
            rank: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self) -> &[QuizQuestion] {
        self.questions_snapshot.as_deref().unwrap_or(&[])
    }

    /// Inserts the answer, replacing any earlier answer for the same question.
    pub fn upsert_answer(&mut self, answer: AttemptAnswer) {
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_index == answer.question_index)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    /// Recomputes score, percentage, time and feedback; run before every write.
    pub fn recalculate(&mut self) {
        self.updated_at = Utc::now();
        if self.answers.is_empty() {
            return;
        }

        self.score = self.answers.iter().map(|a| a.points_earned).sum();
        if self.total_possible_score > 0 {
            let ratio = self.score as f64 / self.total_possible_score as f64;
            self.percentage = (ratio * 100.0).round().clamp(0.0, 100.0) as i32;
        }
        self.time_taken = self.answers.iter().map(|a| a.time_spent).sum();
        self.feedback = Feedback::from_percentage(self.percentage);
    }

    pub fn mark_completed(&mut self) {
        self.is_completed = true;
        self.completed_at = Some(Utc::now());
        self.recalculate();
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|oid| oid.to_hex()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::quiz::sample_quiz;

    fn answer(question_index: i32, points_earned: i32, time_spent: i32) -> AttemptAnswer {
        AttemptAnswer {
            question_index,
            selected_option: 0,
            is_correct: points_earned > 0,
            points_earned,
            time_spent,
            explanation: None,
        }
    }

    #[test]
    fn start_copies_questions_and_total() {
        let quiz = sample_quiz(ObjectId::new());
        let attempt = QuizAttempt::start(ObjectId::new(), &quiz);

        assert_eq!(attempt.snapshot().len(), 2);
        assert_eq!(attempt.total_possible_score, 5);
        assert_eq!(attempt.quiz_id, quiz.id.unwrap());
        assert!(!attempt.is_completed);
        assert!(attempt.answers.is_empty());
    }

    #[test]
    fn recalculate_derives_score_percentage_time_and_feedback() {
        let quiz = sample_quiz(ObjectId::new());
        let mut attempt = QuizAttempt::start(ObjectId::new(), &quiz);
        attempt.upsert_answer(answer(0, 2, 12));
        attempt.upsert_answer(answer(1, 0, 8));
        attempt.recalculate();

        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.percentage, 40);
        assert_eq!(attempt.time_taken, 20);
        assert_eq!(attempt.feedback, Feedback::Poor);
    }

    #[test]
    fn recalculate_without_answers_keeps_defaults() {
        let quiz = sample_quiz(ObjectId::new());
        let mut attempt = QuizAttempt::start(ObjectId::new(), &quiz);
        attempt.recalculate();

        assert_eq!(attempt.score, 0);
        assert_eq!(attempt.percentage, 0);
        assert_eq!(attempt.feedback, Feedback::Average);
    }

    #[test]
    fn upsert_answer_replaces_existing_index() {
        let quiz = sample_quiz(ObjectId::new());
        let mut attempt = QuizAttempt::start(ObjectId::new(), &quiz);
        attempt.upsert_answer(answer(1, 0, 5));
        attempt.upsert_answer(answer(1, 3, 9));

        assert_eq!(attempt.answers.len(), 1);
        assert_eq!(attempt.answers[0].points_earned, 3);
        assert_eq!(attempt.answers[0].time_spent, 9);
    }

    #[test]
    fn feedback_thresholds() {
        assert_eq!(Feedback::from_percentage(100), Feedback::Excellent);
        assert_eq!(Feedback::from_percentage(90), Feedback::Excellent);
        assert_eq!(Feedback::from_percentage(89), Feedback::Good);
        assert_eq!(Feedback::from_percentage(80), Feedback::Good);
        assert_eq!(Feedback::from_percentage(70), Feedback::Average);
        assert_eq!(Feedback::from_percentage(60), Feedback::BelowAverage);
        assert_eq!(Feedback::from_percentage(59), Feedback::Poor);
    }

    #[test]
    fn feedback_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Feedback::BelowAverage).unwrap(),
            "\"below_average\""
        );
    }

    #[test]
    fn mark_completed_sets_timestamp() {
        let quiz = sample_quiz(ObjectId::new());
        let mut attempt = QuizAttempt::start(ObjectId::new(), &quiz);
        attempt.upsert_answer(answer(0, 2, 4));
        attempt.upsert_answer(answer(1, 3, 4));
        attempt.mark_completed();

        assert!(attempt.is_completed);
        assert!(attempt.completed_at.is_some());
        assert_eq!(attempt.percentage, 100);
        assert_eq!(attempt.feedback, Feedback::Excellent);
    }
}
