#![allow(dead_code)]

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use secrecy::SecretString;
use tokio::sync::RwLock;

use smartquiz_server::{
    app_state::{AppState, Repositories},
    config::{Config, Environment},
    errors::{AppError, AppResult},
    models::{
        domain::{AttemptAnswer, Badge, Quiz, QuizAttempt, RefreshToken, User},
        dto::response::LeaderboardRow,
    },
    repositories::{
        QuizAttemptRepository, QuizFilter, QuizRepository, RefreshTokenRepository,
        UserRepository,
    },
};

pub fn test_config() -> Config {
    Config {
        environment: Environment::Test,
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "smartquiz-test".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 5002,
        api_prefix: "/api".to_string(),
        api_version: "v1".to_string(),
        jwt_secret: SecretString::from("integration_jwt_secret".to_string()),
        jwt_refresh_secret: SecretString::from("integration_jwt_refresh_secret".to_string()),
        jwt_expiration_hours: 1,
        jwt_refresh_expiration_hours: 24,
        cors_origins: vec!["http://localhost:3000".to_string()],
        max_body_bytes: 1024 * 1024,
    }
}

type Store<T> = Arc<RwLock<HashMap<ObjectId, T>>>;

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Store<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, mut user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::AlreadyExists("Duplicate key".to_string()));
        }
        let id = ObjectId::new();
        user.id = Some(id);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_profile(&self, mut user: User) -> AppResult<User> {
        let id = user
            .id
            .ok_or_else(|| AppError::BadRequest("Cannot update a user without an id".to_string()))?;
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != Some(id) && u.username == user.username)
        {
            return Err(AppError::AlreadyExists("Duplicate key".to_string()));
        }
        let stored = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.updated_at = Utc::now();
        stored.username = user.username.clone();
        stored.avatar = user.avatar.clone();
        stored.updated_at = user.updated_at;
        Ok(user)
    }

    async fn record_attempt(&self, id: &ObjectId, percentage: i32, score: i32) -> AppResult<bool> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(id) {
            Some(user) => {
                user.record_completed_attempt(percentage, score);
                true
            }
            None => false,
        })
    }

    async fn add_badge(&self, id: &ObjectId, badge: Badge) -> AppResult<bool> {
        let mut users = self.users.write().await;
        Ok(users
            .get_mut(id)
            .map_or(false, |user| user.award_badge(badge)))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryQuizRepository {
    quizzes: Store<Quiz>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(quiz: &Quiz, filter: &QuizFilter) -> bool {
    if !quiz.is_listed() {
        return false;
    }
    if filter.category.as_ref().is_some_and(|c| *c != quiz.category) {
        return false;
    }
    if filter
        .difficulty
        .as_ref()
        .is_some_and(|d| d != quiz.difficulty.as_str())
    {
        return false;
    }
    match &filter.search {
        Some(search) => {
            let needle = search.to_lowercase();
            quiz.title.to_lowercase().contains(&needle)
                || quiz.description.to_lowercase().contains(&needle)
                || quiz.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        quiz.recalculate_totals();
        let id = ObjectId::new();
        quiz.id = Some(id);
        self.quizzes.write().await.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn list_listed(
        &self,
        filter: &QuizFilter,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<Quiz> = quizzes
            .values()
            .filter(|q| matches_filter(q, filter))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_author(&self, author_id: &ObjectId) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<Quiz> = quizzes
            .values()
            .filter(|q| q.author_id == *author_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update(&self, mut quiz: Quiz) -> AppResult<Quiz> {
        let id = quiz
            .id
            .ok_or_else(|| AppError::BadRequest("Cannot update a quiz without an id".to_string()))?;
        let mut quizzes = self.quizzes.write().await;
        let stored = quizzes
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        quiz.recalculate_totals();

        let mut written = quiz.clone();
        written.author_id = stored.author_id;
        written.created_at = stored.created_at;
        written.total_attempts = stored.total_attempts;
        written.average_score = stored.average_score;
        *stored = written;
        Ok(quiz)
    }

    async fn record_attempt(&self, id: &ObjectId, percentage: i32) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        Ok(match quizzes.get_mut(id) {
            Some(quiz) => {
                quiz.record_completed_attempt(percentage);
                true
            }
            None => false,
        })
    }

    async fn delete_unattempted(&self, id: &ObjectId) -> AppResult<bool> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.get(id).is_some_and(Quiz::is_deletable) {
            quizzes.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Attempts need the user store to resolve usernames for leaderboards.
#[derive(Clone)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Store<QuizAttempt>,
    users: Store<User>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new(users: &InMemoryUserRepository) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            users: users.users.clone(),
        }
    }

    async fn modify_open(
        &self,
        id: &ObjectId,
        change: impl FnOnce(&mut QuizAttempt) + Send,
    ) -> Option<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts.get_mut(id).filter(|a| !a.is_completed)?;
        change(attempt);
        Some(attempt.clone())
    }

    async fn to_rows(&self, attempts: Vec<QuizAttempt>) -> Vec<LeaderboardRow> {
        let users = self.users.read().await;
        attempts
            .into_iter()
            .filter_map(|attempt| {
                let user = users.get(&attempt.user_id)?;
                Some(LeaderboardRow {
                    attempt_id: attempt.id?,
                    user_id: attempt.user_id,
                    username: user.username.clone(),
                    quiz_id: attempt.quiz_id,
                    score: attempt.score,
                    percentage: attempt.percentage,
                    time_taken: attempt.time_taken,
                    completed_at: attempt.completed_at,
                })
            })
            .collect()
    }

    async fn completed_sorted(&self, quiz_id: Option<&ObjectId>) -> Vec<QuizAttempt> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<QuizAttempt> = attempts
            .values()
            .filter(|a| a.is_completed && quiz_id.map_or(true, |id| a.quiz_id == *id))
            .cloned()
            .collect();
        items.sort_by(leaderboard_order);
        items
    }
}

fn leaderboard_order(a: &QuizAttempt, b: &QuizAttempt) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.percentage.cmp(&a.percentage))
        .then(a.time_taken.cmp(&b.time_taken))
        .then(b.completed_at.cmp(&a.completed_at))
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn create(&self, mut attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        attempt.recalculate();
        let id = ObjectId::new();
        attempt.id = Some(id);
        self.attempts.write().await.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        Ok(self.attempts.read().await.get(id).cloned())
    }

    async fn find_open(
        &self,
        user_id: &ObjectId,
        quiz_id: &ObjectId,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| a.user_id == *user_id && a.quiz_id == *quiz_id && !a.is_completed)
            .max_by_key(|a| a.started_at)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &ObjectId) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        let mut items: Vec<QuizAttempt> = attempts
            .values()
            .filter(|a| a.user_id == *user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn save_answer(
        &self,
        id: &ObjectId,
        answer: AttemptAnswer,
    ) -> AppResult<Option<QuizAttempt>> {
        Ok(self
            .modify_open(id, |attempt| {
                attempt.upsert_answer(answer);
                attempt.recalculate();
            })
            .await)
    }

    async fn complete(&self, id: &ObjectId) -> AppResult<Option<QuizAttempt>> {
        Ok(self.modify_open(id, QuizAttempt::mark_completed).await)
    }

    async fn global_leaderboard(&self, limit: i64) -> AppResult<Vec<LeaderboardRow>> {
        let mut best: Vec<QuizAttempt> = Vec::new();
        for attempt in self.completed_sorted(None).await {
            if !best.iter().any(|b| b.user_id == attempt.user_id) {
                best.push(attempt);
            }
        }
        best.truncate(limit.max(0) as usize);
        Ok(self.to_rows(best).await)
    }

    async fn quiz_leaderboard(
        &self,
        quiz_id: &ObjectId,
        limit: i64,
    ) -> AppResult<Vec<LeaderboardRow>> {
        let mut items = self.completed_sorted(Some(quiz_id)).await;
        items.truncate(limit.max(0) as usize);
        Ok(self.to_rows(items).await)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenRepository {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, mut token: RefreshToken) -> AppResult<RefreshToken> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(AppError::AlreadyExists("Duplicate key".to_string()));
        }
        token.id = Some(ObjectId::new());
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_token_hash(&self, hash: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.tokens.read().await.get(hash).cloned())
    }

    async fn revoke_by_token_hash(&self, hash: &str) -> AppResult<bool> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(hash) {
            Some(token) if token.revoked_at.is_none() => {
                token.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub struct TestStores {
    pub users: InMemoryUserRepository,
    pub quizzes: InMemoryQuizRepository,
    pub attempts: InMemoryQuizAttemptRepository,
    pub refresh_tokens: InMemoryRefreshTokenRepository,
}

impl TestStores {
    pub fn new() -> Self {
        let users = InMemoryUserRepository::new();
        let attempts = InMemoryQuizAttemptRepository::new(&users);
        Self {
            users,
            quizzes: InMemoryQuizRepository::new(),
            attempts,
            refresh_tokens: InMemoryRefreshTokenRepository::new(),
        }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.users.clone()),
            quizzes: Arc::new(self.quizzes.clone()),
            attempts: Arc::new(self.attempts.clone()),
            refresh_tokens: Arc::new(self.refresh_tokens.clone()),
        }
    }
}

pub fn test_state() -> (AppState, TestStores) {
    let stores = TestStores::new();
    let state = AppState::with_repositories(test_config(), stores.repositories(), None);
    (state, stores)
}
