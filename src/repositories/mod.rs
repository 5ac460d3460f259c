pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod refresh_token_repository;
pub mod user_repository;

use mongodb::bson::{doc, Document};

pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizFilter, QuizRepository};
pub use refresh_token_repository::{MongoRefreshTokenRepository, RefreshTokenRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

/// Update expression for `(average * count + value) / (count + 1)`, rounded half up,
/// evaluated against the stored fields.
pub(crate) fn running_average(average: &str, count: &str, value: i32) -> Document {
    let count = doc! { "$ifNull": [count, 0] };
    let previous = doc! { "$multiply": [{ "$ifNull": [average, 0] }, count.clone()] };
    let sum = doc! { "$add": [previous, value] };
    doc! {
        "$toInt": {
            "$floor": { "$add": [{ "$divide": [sum, { "$add": [count, 1] }] }, 0.5] }
        }
    }
}

#[cfg(test)]
pub use quiz_attempt_repository::MockQuizAttemptRepository;
#[cfg(test)]
pub use quiz_repository::MockQuizRepository;
#[cfg(test)]
pub use refresh_token_repository::MockRefreshTokenRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
