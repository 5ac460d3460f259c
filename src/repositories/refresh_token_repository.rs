use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, REFRESH_TOKENS_COLLECTION},
    errors::AppResult,
    models::domain::RefreshToken,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: RefreshToken) -> AppResult<RefreshToken>;
    async fn find_by_token_hash(&self, hash: &str) -> AppResult<Option<RefreshToken>>;
    /// Returns whether a live token was revoked. Unknown or already revoked tokens are not an error.
    async fn revoke_by_token_hash(&self, hash: &str) -> AppResult<bool>;
}

pub struct MongoRefreshTokenRepository {
    collection: Collection<RefreshToken>,
}

impl MongoRefreshTokenRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(REFRESH_TOKENS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let token_hash_options = IndexOptions::builder().unique(true).build();
        let token_hash_model = IndexModel::builder()
            .keys(doc! { "token_hash": 1 })
            .options(token_hash_options)
            .build();
        self.collection.create_index(token_hash_model).await?;
        info!("Created unique index on refresh_tokens.token_hash");

        let user_id_model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .build();
        self.collection.create_index(user_id_model).await?;
        info!("Created index on refresh_tokens.user_id");

        // Mongo removes documents once expires_at has passed.
        let expires_at_model = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();
        self.collection.create_index(expires_at_model).await?;
        info!("Created TTL index on refresh_tokens.expires_at");

        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MongoRefreshTokenRepository {
    async fn create(&self, mut token: RefreshToken) -> AppResult<RefreshToken> {
        let result = self.collection.insert_one(&token).await?;
        token.id = result.inserted_id.as_object_id();
        Ok(token)
    }

    async fn find_by_token_hash(&self, hash: &str) -> AppResult<Option<RefreshToken>> {
        let token = self
            .collection
            .find_one(doc! { "token_hash": hash })
            .await?;
        Ok(token)
    }

    async fn revoke_by_token_hash(&self, hash: &str) -> AppResult<bool> {
        let now = BsonDateTime::from_chrono(Utc::now());
        let result = self
            .collection
            .update_one(
                doc! { "token_hash": hash, "revoked_at": { "$exists": false } },
                doc! { "$set": { "revoked_at": now } },
            )
            .await?;

        Ok(result.modified_count > 0)
    }
}
