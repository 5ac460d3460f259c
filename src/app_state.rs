use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoQuizAttemptRepository, MongoQuizRepository, MongoRefreshTokenRepository,
        MongoUserRepository, QuizAttemptRepository, QuizRepository, RefreshTokenRepository,
        UserRepository,
    },
    services::{AuthService, LeaderboardService, QuizAttemptService, QuizService, UserService},
};

/// Storage backends the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub quiz_service: Arc<QuizService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub leaderboard_service: Arc<LeaderboardService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
    pub db: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let user_repository = Arc::new(MongoUserRepository::new(&db));
        user_repository.ensure_indexes().await?;

        let quiz_repository = Arc::new(MongoQuizRepository::new(&db));
        quiz_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;

        let refresh_token_repository = Arc::new(MongoRefreshTokenRepository::new(&db));
        refresh_token_repository.ensure_indexes().await?;

        let repositories = Repositories {
            users: user_repository,
            quizzes: quiz_repository,
            attempts: attempt_repository,
            refresh_tokens: refresh_token_repository,
        };

        Ok(Self::with_repositories(config, repositories, Some(db)))
    }

    pub fn with_repositories(config: Config, repositories: Repositories, db: Option<Database>) -> Self {
        let jwt_service = Arc::new(JwtService::from_config(&config));

        let auth_service = Arc::new(AuthService::new(
            repositories.users.clone(),
            repositories.refresh_tokens.clone(),
            jwt_service.clone(),
        ));
        let user_service = Arc::new(UserService::new(repositories.users.clone()));
        let quiz_service = Arc::new(QuizService::new(repositories.quizzes.clone()));
        let attempt_service = Arc::new(QuizAttemptService::new(
            repositories.attempts.clone(),
            repositories.quizzes.clone(),
            repositories.users.clone(),
        ));
        let leaderboard_service = Arc::new(LeaderboardService::new(
            repositories.attempts,
            repositories.quizzes,
        ));

        Self {
            auth_service,
            user_service,
            quiz_service,
            attempt_service,
            leaderboard_service,
            jwt_service,
            config: Arc::new(config),
            db,
        }
    }
}
