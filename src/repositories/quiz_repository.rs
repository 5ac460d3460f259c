use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document, Regex},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZZES_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::Quiz,
    repositories::running_average,
};

/// Fields fixed at creation or owned by `record_attempt`; content edits never write them.
const PRESERVED_FIELDS: [&str; 5] = [
    "_id",
    "author_id",
    "created_at",
    "total_attempts",
    "average_score",
];

/// `$set` of everything an author may change.
pub fn content_update(quiz: &Quiz) -> AppResult<Document> {
    let mut fields = bson::to_document(quiz)?;
    for key in PRESERVED_FIELDS {
        fields.remove(key);
    }
    Ok(doc! { "$set": fields })
}

/// Folds one completed attempt into the stored counters in a single write.
pub fn attempt_statistics_update(percentage: i32) -> Vec<Document> {
    vec![doc! {
        "$set": {
            "average_score": running_average("$average_score", "$total_attempts", percentage),
            "total_attempts": { "$add": [{ "$ifNull": ["$total_attempts", 0] }, 1] },
            "updated_at": bson::DateTime::now(),
        }
    }]
}

/// Filters for the public quiz listing. Only listed quizzes are ever matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuizFilter {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub search: Option<String>,
}

impl QuizFilter {
    pub fn new(
        category: Option<String>,
        difficulty: Option<String>,
        search: Option<String>,
    ) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            category: non_blank(category),
            difficulty: non_blank(difficulty),
            search: non_blank(search),
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! { "is_published": true, "is_public": true };

        if let Some(category) = &self.category {
            filter.insert("category", category);
        }
        if let Some(difficulty) = &self.difficulty {
            filter.insert("difficulty", difficulty);
        }
        if let Some(search) = &self.search {
            let pattern = Regex {
                pattern: regex::escape(search),
                options: "i".to_string(),
            };
            filter.insert(
                "$or",
                vec![
                    doc! { "title": pattern.clone() },
                    doc! { "description": pattern.clone() },
                    doc! { "tags": pattern },
                ],
            );
        }

        filter
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>>;
    async fn list_listed(
        &self,
        filter: &QuizFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)>;
    async fn find_by_author(&self, author_id: &ObjectId) -> AppResult<Vec<Quiz>>;
    /// Writes the editable content. Attempt statistics are left as stored.
    async fn update(&self, quiz: Quiz) -> AppResult<Quiz>;
    /// Returns false when the quiz no longer exists.
    async fn record_attempt(&self, id: &ObjectId, percentage: i32) -> AppResult<bool>;
    /// Deletes the quiz only while nobody has completed it.
    async fn delete_unattempted(&self, id: &ObjectId) -> AppResult<bool>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZZES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let author_index = IndexModel::builder()
            .keys(doc! { "author_id": 1, "is_published": 1 })
            .options(
                IndexOptions::builder()
                    .name("author_published".to_string())
                    .build(),
            )
            .build();

        let catalog_index = IndexModel::builder()
            .keys(doc! { "category": 1, "difficulty": 1, "is_public": 1 })
            .options(
                IndexOptions::builder()
                    .name("category_difficulty_public".to_string())
                    .build(),
            )
            .build();

        let tags_index = IndexModel::builder()
            .keys(doc! { "tags": 1 })
            .options(IndexOptions::builder().name("tags".to_string()).build())
            .build();

        self.collection
            .create_indexes([author_index, catalog_index, tags_index])
            .await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        quiz.recalculate_totals();
        let result = self.collection.insert_one(&quiz).await?;
        quiz.id = result.inserted_id.as_object_id();
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "_id": *id }).await?;
        Ok(quiz)
    }

    async fn list_listed(
        &self,
        filter: &QuizFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        let filter = filter.to_document();

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let quizzes = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .skip(offset.max(0) as u64)
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok((quizzes, total))
    }

    async fn find_by_author(&self, author_id: &ObjectId) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "author_id": *author_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn update(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        let id = quiz
            .id
            .ok_or_else(|| AppError::BadRequest("Cannot update a quiz without an id".to_string()))?;
        quiz.recalculate_totals();
        quiz.updated_at = chrono::Utc::now();

        let result = self
            .collection
            .update_one(doc! { "_id": id }, content_update(&quiz)?)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        Ok(quiz)
    }

    async fn record_attempt(&self, id: &ObjectId, percentage: i32) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(doc! { "_id": *id }, attempt_statistics_update(percentage))
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_unattempted(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": *id, "total_attempts": 0 })
            .await?;
        Ok(result.deleted_count == 1)
    }
}
