use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZ_ATTEMPTS_COLLECTION, USERS_COLLECTION},
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptAnswer, QuizAttempt},
        dto::response::LeaderboardRow,
    },
};

const OPEN_WRITE_ATTEMPTS: usize = 5;

/// Matches the attempt only while it is open and its answers are exactly as read.
pub fn unchanged_open_filter(attempt: &QuizAttempt) -> AppResult<Document> {
    let id = attempt.id.ok_or_else(|| {
        AppError::BadRequest("Cannot update an attempt without an id".to_string())
    })?;
    Ok(doc! {
        "_id": id,
        "is_completed": false,
        "answers": bson::to_bson(&attempt.answers)?,
    })
}

/// Best first: score, percentage, fastest, most recent.
pub fn leaderboard_sort() -> Document {
    doc! { "score": -1, "percentage": -1, "time_taken": 1, "completed_at": -1 }
}

fn leaderboard_tail(limit: i64) -> Vec<Document> {
    vec![
        doc! { "$limit": limit },
        doc! {
            "$lookup": {
                "from": USERS_COLLECTION,
                "localField": "user_id",
                "foreignField": "_id",
                "as": "user"
            }
        },
        doc! { "$unwind": "$user" },
        doc! {
            "$project": {
                "_id": 1,
                "user_id": "$user._id",
                "username": "$user.username",
                "quiz_id": 1,
                "score": 1,
                "percentage": 1,
                "time_taken": 1,
                "completed_at": 1
            }
        },
    ]
}

/// Best completed attempt per user across all quizzes.
pub fn global_leaderboard_pipeline(limit: i64) -> Vec<Document> {
    let mut pipeline = vec![
        doc! { "$match": { "is_completed": true } },
        doc! { "$sort": leaderboard_sort() },
        doc! { "$group": { "_id": "$user_id", "attempt": { "$first": "$$ROOT" } } },
        doc! { "$replaceRoot": { "newRoot": "$attempt" } },
        // $group does not keep order
        doc! { "$sort": leaderboard_sort() },
    ];
    pipeline.extend(leaderboard_tail(limit));
    pipeline
}

/// Top completed attempts for one quiz.
pub fn quiz_leaderboard_pipeline(quiz_id: ObjectId, limit: i64) -> Vec<Document> {
    let mut pipeline = vec![
        doc! { "$match": { "is_completed": true, "quiz_id": quiz_id } },
        doc! { "$sort": leaderboard_sort() },
    ];
    pipeline.extend(leaderboard_tail(limit));
    pipeline
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>>;
    async fn find_open(
        &self,
        user_id: &ObjectId,
        quiz_id: &ObjectId,
    ) -> AppResult<Option<QuizAttempt>>;
    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>>;
    /// Records an answer on an open attempt and refreshes its totals.
    /// `None` once the attempt has been completed.
    async fn save_answer(
        &self,
        id: &ObjectId,
        answer: AttemptAnswer,
    ) -> AppResult<Option<QuizAttempt>>;
    /// Completes an open attempt. `None` if it was already completed.
    async fn complete(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>>;
    async fn global_leaderboard(&self, limit: i64) -> AppResult<Vec<LeaderboardRow>>;
    async fn quiz_leaderboard(
        &self,
        quiz_id: &ObjectId,
        limit: i64,
    ) -> AppResult<Vec<LeaderboardRow>>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZ_ATTEMPTS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let indexes = [
            ("user_quiz", doc! { "user_id": 1, "quiz_id": 1 }),
            ("quiz_score", doc! { "quiz_id": 1, "score": -1 }),
            ("user_completed", doc! { "user_id": 1, "completed_at": -1 }),
            ("completed_recent", doc! { "is_completed": 1, "completed_at": -1 }),
        ]
        .into_iter()
        .map(|(name, keys)| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        });

        self.collection.create_indexes(indexes).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }

    async fn run_leaderboard(&self, pipeline: Vec<Document>) -> AppResult<Vec<LeaderboardRow>> {
        let documents: Vec<Document> = self.collection.aggregate(pipeline).await?.try_collect().await?;

        documents
            .into_iter()
            .map(|document| bson::from_document::<LeaderboardRow>(document).map_err(AppError::from))
            .collect()
    }

    /// Read, change and write back an open attempt, retrying when another
    /// request wrote answers in between.
    async fn modify_open<F>(&self, id: &ObjectId, change: F) -> AppResult<Option<QuizAttempt>>
    where
        F: Fn(&mut QuizAttempt) + Send + Sync,
    {
        for _ in 0..OPEN_WRITE_ATTEMPTS {
            let Some(mut attempt) = self
                .collection
                .find_one(doc! { "_id": *id, "is_completed": false })
                .await?
            else {
                return Ok(None);
            };

            let filter = unchanged_open_filter(&attempt)?;
            change(&mut attempt);

            let result = self.collection.replace_one(filter, &attempt).await?;
            if result.matched_count == 1 {
                return Ok(Some(attempt));
            }
            log::debug!("Attempt {} changed while writing, retrying", id.to_hex());
        }

        Err(AppError::DatabaseError(format!(
            "Attempt {} is being updated concurrently",
            id.to_hex()
        )))
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, mut attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        attempt.recalculate();
        let result = self.collection.insert_one(&attempt).await?;
        attempt.id = result.inserted_id.as_object_id();
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(attempt)
    }

    async fn find_open(
        &self,
        user_id: &ObjectId,
        quiz_id: &ObjectId,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "user_id": *user_id,
                "quiz_id": *quiz_id,
                "is_completed": false
            })
            .sort(doc! { "started_at": -1 })
            .await?;
        Ok(attempt)
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "user_id": *user_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn save_answer(
        &self,
        id: &ObjectId,
        answer: AttemptAnswer,
    ) -> AppResult<Option<QuizAttempt>> {
        self.modify_open(id, |attempt| {
            attempt.upsert_answer(answer.clone());
            attempt.recalculate();
        })
        .await
    }

    async fn complete(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        self.modify_open(id, QuizAttempt::mark_completed).await
    }

    async fn global_leaderboard(&self, limit: i64) -> AppResult<Vec<LeaderboardRow>> {
        self.run_leaderboard(global_leaderboard_pipeline(limit)).await
    }

    async fn quiz_leaderboard(
        &self,
        quiz_id: &ObjectId,
        limit: i64,
    ) -> AppResult<Vec<LeaderboardRow>> {
        self.run_leaderboard(quiz_leaderboard_pipeline(*quiz_id, limit))
            .await
    }
}
