mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;

use smartquiz_server::{
    errors::AppError,
    models::domain::{
        quiz::NewQuiz,
        refresh_token::{hash_token, ClientInfo},
        AttemptAnswer, Badge, Difficulty, Quiz, QuizAttempt, QuizQuestion, RefreshToken, User,
    },
    repositories::{
        QuizAttemptRepository, QuizFilter, QuizRepository, RefreshTokenRepository,
        UserRepository,
    },
};

use common::TestStores;

fn make_question(correct_answer: i32, points: i32) -> QuizQuestion {
    QuizQuestion {
        question_text: "Pick one".to_string(),
        options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        correct_answer,
        explanation: None,
        points,
        time_limit: Some(30),
    }
}

fn make_quiz(title: &str, author_id: ObjectId, published: bool) -> Quiz {
    let mut quiz = Quiz::new(
        NewQuiz {
            title: title.to_string(),
            description: format!("{} description", title),
            category: "science".to_string(),
            difficulty: Difficulty::Medium,
            time_limit: 15,
            questions: vec![make_question(0, 2), make_question(2, 3)],
            tags: vec!["physics".to_string()],
        },
        author_id,
    );
    quiz.is_published = published;
    quiz
}

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

async fn finish(
    attempts: &Arc<dyn QuizAttemptRepository>,
    attempt: &QuizAttempt,
    points: &[i32],
    seconds: i32,
) -> QuizAttempt {
    let id = attempt.id.unwrap();
    for (index, earned) in points.iter().enumerate() {
        attempts
            .save_answer(&id, answer(index as i32, *earned, seconds))
            .await
            .unwrap()
            .unwrap();
    }
    attempts.complete(&id).await.unwrap().unwrap()
}

#[tokio::test]
async fn user_repository_enforces_unique_identity() {
    let stores = TestStores::new();
    let users: Arc<dyn UserRepository> = Arc::new(stores.users.clone());

    let created = users
        .create(User::new("ada", "Ada@Example.com", "hash"))
        .await
        .unwrap();
    let id = created.id.unwrap();
    assert_eq!(created.email, "ada@example.com");

    let duplicate = users.create(User::new("ada", "other@example.com", "hash")).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    assert!(users.find_by_email(" ADA@example.com ").await.unwrap().is_some());
    assert!(users
        .find_by_username_or_email("nobody", "ada@example.com")
        .await
        .unwrap()
        .is_some());

    let mut renamed = users.find_by_id(&id).await.unwrap().unwrap();
    renamed.username = "countess".to_string();
    users.update_profile(renamed).await.unwrap();
    assert!(users.find_by_username("countess").await.unwrap().is_some());
    assert!(users.find_by_username("ada").await.unwrap().is_none());

    let mut ghost = User::new("ghost", "ghost@example.com", "hash");
    ghost.id = Some(ObjectId::new());
    assert!(matches!(users.update_profile(ghost).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn user_statistics_and_badges_accumulate() {
    let stores = TestStores::new();
    let users: Arc<dyn UserRepository> = Arc::new(stores.users.clone());
    let id = users
        .create(User::new("ada", "ada@example.com", "hash"))
        .await
        .unwrap()
        .id
        .unwrap();

    assert!(users.record_attempt(&id, 80, 40).await.unwrap());
    assert!(users.record_attempt(&id, 95, 70).await.unwrap());
    assert!(users.add_badge(&id, Badge::first_attempt()).await.unwrap());
    assert!(!users.add_badge(&id, Badge::first_attempt()).await.unwrap());

    // A profile edit made from a stale read keeps the statistics.
    let mut stale = User::new("countess", "ada@example.com", "hash");
    stale.id = Some(id);
    users.update_profile(stale).await.unwrap();

    let user = users.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(user.username, "countess");
    assert_eq!(user.total_quizzes_attempted, 2);
    assert_eq!(user.average_score, 88);
    assert_eq!(user.highest_score, 95);
    assert_eq!(user.experience, 110);
    assert_eq!(user.level, 2);
    assert_eq!(user.badges.len(), 1);

    assert!(!users.record_attempt(&ObjectId::new(), 50, 10).await.unwrap());
    assert!(!users.add_badge(&ObjectId::new(), Badge::high_scorer()).await.unwrap());
}

#[tokio::test]
async fn quiz_repository_lists_only_published_public_quizzes() {
    let stores = TestStores::new();
    let quizzes: Arc<dyn QuizRepository> = Arc::new(stores.quizzes.clone());
    let author = ObjectId::new();

    let listed = quizzes.create(make_quiz("Gravity", author, true)).await.unwrap();
    quizzes.create(make_quiz("Draft Optics", author, false)).await.unwrap();
    let mut private = make_quiz("Private Waves", author, true);
    private.is_public = false;
    quizzes.create(private).await.unwrap();

    assert_eq!(listed.total_questions, 2);
    assert_eq!(listed.total_time, 60);

    let (page, total) = quizzes
        .list_listed(&QuizFilter::default(), 0, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].title, "Gravity");

    let filter = QuizFilter::new(None, Some("medium".to_string()), Some("GRAV".to_string()));
    let (_, total) = quizzes.list_listed(&filter, 0, 10).await.unwrap();
    assert_eq!(total, 1);

    let filter = QuizFilter::new(Some("history".to_string()), None, None);
    let (page, total) = quizzes.list_listed(&filter, 0, 10).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 0);

    assert_eq!(quizzes.find_by_author(&author).await.unwrap().len(), 3);

    let id = listed.id.unwrap();
    assert!(quizzes.delete_unattempted(&id).await.unwrap());
    assert!(quizzes.find_by_id(&id).await.unwrap().is_none());
    assert!(!quizzes.delete_unattempted(&id).await.unwrap());
}

#[tokio::test]
async fn quiz_statistics_survive_content_edits() {
    let stores = TestStores::new();
    let quizzes: Arc<dyn QuizRepository> = Arc::new(stores.quizzes.clone());
    let quiz = quizzes
        .create(make_quiz("Gravity", ObjectId::new(), false))
        .await
        .unwrap();
    let id = quiz.id.unwrap();

    // The author's copy was read before these completions landed.
    assert!(quizzes.record_attempt(&id, 100).await.unwrap());
    assert!(quizzes.record_attempt(&id, 50).await.unwrap());

    let mut edited = quiz.clone();
    edited.title = "Gravity II".to_string();
    quizzes.update(edited).await.unwrap();

    let stored = quizzes.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Gravity II");
    assert_eq!(stored.total_attempts, 2);
    assert_eq!(stored.average_score, 75);

    assert!(!quizzes.delete_unattempted(&id).await.unwrap());
    assert!(quizzes.find_by_id(&id).await.unwrap().is_some());
    assert!(!quizzes.record_attempt(&ObjectId::new(), 10).await.unwrap());
}

#[tokio::test]
async fn attempt_repository_completes_at_most_once() {
    let stores = TestStores::new();
    let attempts: Arc<dyn QuizAttemptRepository> = Arc::new(stores.attempts.clone());
    let mut quiz = make_quiz("Gravity", ObjectId::new(), true);
    quiz.id = Some(ObjectId::new());
    let user_id = ObjectId::new();

    let open = attempts
        .create(QuizAttempt::start(user_id, &quiz))
        .await
        .unwrap();
    assert_eq!(open.total_possible_score, 5);

    let found = attempts
        .find_open(&user_id, &quiz.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, open.id);

    let finished = finish(&attempts, &open, &[2, 0], 10).await;
    assert!(finished.is_completed);
    assert_eq!(finished.score, 2);

    let id = open.id.unwrap();
    assert!(attempts.complete(&id).await.unwrap().is_none());
    assert!(attempts.save_answer(&id, answer(1, 3, 5)).await.unwrap().is_none());
    assert!(attempts.complete(&ObjectId::new()).await.unwrap().is_none());

    assert!(attempts
        .find_open(&user_id, &quiz.id.unwrap())
        .await
        .unwrap()
        .is_none());
    assert_eq!(attempts.find_by_user(&user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_answers_on_one_attempt_are_all_kept() {
    let stores = TestStores::new();
    let attempts: Arc<dyn QuizAttemptRepository> = Arc::new(stores.attempts.clone());
    let mut quiz = make_quiz("Gravity", ObjectId::new(), true);
    quiz.id = Some(ObjectId::new());

    let open = attempts
        .create(QuizAttempt::start(ObjectId::new(), &quiz))
        .await
        .unwrap();
    let id = open.id.unwrap();

    let (first, second) = tokio::join!(
        attempts.save_answer(&id, answer(0, 2, 7)),
        attempts.save_answer(&id, answer(1, 3, 9)),
    );
    first.unwrap().unwrap();
    second.unwrap().unwrap();

    // Re-answering replaces rather than appends.
    let latest = attempts
        .save_answer(&id, answer(1, 0, 4))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.answers.len(), 2);
    assert_eq!(latest.score, 2);
    assert_eq!(latest.time_taken, 11);
    assert_eq!(latest.percentage, 40);

    let stored = attempts.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.answers, latest.answers);
}

#[tokio::test]
async fn leaderboards_rank_best_attempts() {
    let stores = TestStores::new();
    let users: Arc<dyn UserRepository> = Arc::new(stores.users.clone());
    let attempts: Arc<dyn QuizAttemptRepository> = Arc::new(stores.attempts.clone());

    let alice = users
        .create(User::new("alice", "alice@example.com", "hash"))
        .await
        .unwrap();
    let bob = users
        .create(User::new("bob", "bob@example.com", "hash"))
        .await
        .unwrap();

    let mut quiz = make_quiz("Gravity", ObjectId::new(), true);
    quiz.id = Some(ObjectId::new());
    let quiz_id = quiz.id.unwrap();

    for (user, points, seconds) in [
        (&alice, [2, 0], 10),
        (&alice, [2, 3], 20),
        (&bob, [2, 3], 5),
    ] {
        let attempt = attempts
            .create(QuizAttempt::start(user.id.unwrap(), &quiz))
            .await
            .unwrap();
        finish(&attempts, &attempt, &points, seconds).await;
    }

    let global = attempts.global_leaderboard(10).await.unwrap();
    assert_eq!(global.len(), 2);
    assert_eq!(global[0].username, "bob");
    assert_eq!(global[0].time_taken, 10);
    assert_eq!(global[1].username, "alice");
    assert_eq!(global[1].score, 5);

    let per_quiz = attempts.quiz_leaderboard(&quiz_id, 2).await.unwrap();
    assert_eq!(per_quiz.len(), 2);
    assert!(per_quiz.iter().all(|row| row.quiz_id == quiz_id));
    assert!(attempts
        .quiz_leaderboard(&ObjectId::new(), 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn refresh_tokens_revoke_once() {
    let stores = TestStores::new();
    let tokens: Arc<dyn RefreshTokenRepository> = Arc::new(stores.refresh_tokens.clone());
    let hash = hash_token("opaque-refresh-token");

    tokens
        .create(RefreshToken::new(
            ObjectId::new(),
            hash.clone(),
            Utc::now() + Duration::hours(1),
            ClientInfo::default(),
        ))
        .await
        .unwrap();

    let stored = tokens.find_by_token_hash(&hash).await.unwrap().unwrap();
    assert!(stored.is_valid());

    assert!(tokens.revoke_by_token_hash(&hash).await.unwrap());
    assert!(!tokens.revoke_by_token_hash(&hash).await.unwrap());
    assert!(!tokens.revoke_by_token_hash("unknown").await.unwrap());

    let revoked = tokens.find_by_token_hash(&hash).await.unwrap().unwrap();
    assert!(!revoked.is_valid());
}
