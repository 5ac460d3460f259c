use async_trait::async_trait;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, USERS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{user::EXPERIENCE_PER_LEVEL, Badge, User},
    repositories::running_average,
};

/// Folds one completed attempt into the profile statistics in a single write.
pub fn attempt_statistics_update(percentage: i32, score: i32) -> Vec<Document> {
    let earned = i64::from(score.max(0));
    let experience = doc! { "$add": [{ "$ifNull": ["$experience", 0_i64] }, earned] };
    vec![doc! {
        "$set": {
            "average_score": running_average(
                "$average_score",
                "$total_quizzes_attempted",
                percentage
            ),
            "total_quizzes_attempted": {
                "$add": [{ "$ifNull": ["$total_quizzes_attempted", 0] }, 1]
            },
            "highest_score": { "$max": [{ "$ifNull": ["$highest_score", 0] }, percentage] },
            "level": {
                "$toInt": {
                    "$add": [
                        1,
                        { "$floor": { "$divide": [experience.clone(), EXPERIENCE_PER_LEVEL] } }
                    ]
                }
            },
            "experience": experience,
            "updated_at": bson::DateTime::now(),
        }
    }]
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_by_username_or_email(&self, username: &str, email: &str)
        -> AppResult<Option<User>>;
    /// Writes `username` and `avatar` only.
    async fn update_profile(&self, user: User) -> AppResult<User>;
    /// Returns false when the user no longer exists.
    async fn record_attempt(&self, id: &ObjectId, percentage: i32, score: i32) -> AppResult<bool>;
    /// Returns false when the user is missing or already holds a badge with this id.
    async fn add_badge(&self, id: &ObjectId, badge: Badge) -> AppResult<bool>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(USERS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for users collection");

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("username_unique".to_string())
                    .build(),
            )
            .build();

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();

        let role_index = IndexModel::builder()
            .keys(doc! { "role": 1 })
            .options(IndexOptions::builder().name("role".to_string()).build())
            .build();

        self.collection
            .create_indexes([username_index, email_index, role_index])
            .await?;

        log::info!("Successfully created indexes for users collection");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, mut user: User) -> AppResult<User> {
        let result = self.collection.insert_one(&user).await?;
        user.id = result.inserted_id.as_object_id();
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "username": username })
            .await?;
        Ok(user)
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<Option<User>> {
        let filter = doc! {
            "$or": [
                { "username": username },
                { "email": email.trim().to_lowercase() }
            ]
        };
        let user = self.collection.find_one(filter).await?;
        Ok(user)
    }

    async fn update_profile(&self, mut user: User) -> AppResult<User> {
        let id = user
            .id
            .ok_or_else(|| AppError::BadRequest("Cannot update a user without an id".to_string()))?;
        user.updated_at = chrono::Utc::now();

        let update = doc! {
            "$set": {
                "username": user.username.as_str(),
                "avatar": user.avatar.as_str(),
                "updated_at": bson::DateTime::from_chrono(user.updated_at),
            }
        };
        let result = self.collection.update_one(doc! { "_id": id }, update).await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        Ok(user)
    }

    async fn record_attempt(&self, id: &ObjectId, percentage: i32, score: i32) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": *id }, attempt_statistics_update(percentage, score))
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn add_badge(&self, id: &ObjectId, badge: Badge) -> AppResult<bool> {
        let filter = doc! { "_id": *id, "badges.id": { "$ne": badge.id.as_str() } };
        let update = doc! {
            "$push": { "badges": bson::to_bson(&badge)? },
            "$set": { "updated_at": bson::DateTime::now() },
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.modified_count == 1)
    }
}
