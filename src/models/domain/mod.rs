pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod refresh_token;
pub mod serde_helpers;
pub mod user;
pub use quiz::{Difficulty, Quiz};
pub use quiz_attempt::{AttemptAnswer, Feedback, QuizAttempt};
pub use quiz_question::QuizQuestion;
pub use refresh_token::RefreshToken;
pub use user::{Badge, User, UserRole};
