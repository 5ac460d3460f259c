use serde::{Deserialize, Serialize};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;
pub const MIN_QUESTION_TIME_LIMIT: i32 = 10;

/// Option index recorded when a question is skipped or its timer runs out.
pub const SKIPPED_OPTION: i32 = -1;

/// One multiple-choice question. Attempts keep a copy of these as their snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default = "default_points")]
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i32>, // seconds
}

fn default_points() -> i32 {
    1
}

impl QuizQuestion {
    pub fn has_option(&self, index: i32) -> bool {
        index >= 0 && (index as usize) < self.options.len()
    }

    /// A selection is correct only when it is not a skip and matches the key.
    pub fn grade(&self, selected_option: i32) -> (bool, i32) {
        let is_correct = selected_option != SKIPPED_OPTION && selected_option == self.correct_answer;
        let points = if is_correct { self.points.max(0) } else { 0 };
        (is_correct, points)
    }
}

#[cfg(test)]
pub fn sample_question(correct_answer: i32, points: i32) -> QuizQuestion {
    QuizQuestion {
        question_text: "Which keyword declares an immutable binding?".to_string(),
        options: vec![
            "let".to_string(),
            "mut".to_string(),
            "var".to_string(),
            "const fn".to_string(),
        ],
        correct_answer,
        explanation: Some("`let` bindings are immutable by default".to_string()),
        points,
        time_limit: Some(30),
    }
}
