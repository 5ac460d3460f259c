use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::serde_helpers::chrono_datetime_as_bson_datetime;

/// Experience needed per level; level 1 starts at zero.
pub const EXPERIENCE_PER_LEVEL: i64 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub avatar: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub join_date: DateTime<Utc>,
    #[serde(default)]
    pub total_quizzes_attempted: i32,
    #[serde(default)]
    pub average_score: i32,
    #[serde(default)]
    pub highest_score: i32,
    #[serde(default)]
    pub badges: Vec<Badge>,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub experience: i64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Default, Copy)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Player,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub earned_at: DateTime<Utc>,
}

impl Badge {
    pub fn new(id: &str, name: &str, description: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            earned_at: Utc::now(),
        }
    }

    pub fn first_attempt() -> Self {
        Badge::new("first_attempt", "First Attempt", "Completed your first quiz", "🥇")
    }

    pub fn high_scorer() -> Self {
        Badge::new("high_scorer", "High Scorer", "Scored 90% or above", "🎯")
    }
}

fn default_level() -> i32 {
    1
}

impl User {
    pub fn new(username: &str, email: &str, password_hash: &str) -> Self {
        let now = Utc::now();
        User {
            id: None,
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: password_hash.to_string(),
            role: UserRole::Player,
            avatar: String::new(),
            join_date: now,
            total_quizzes_attempted: 0,
            average_score: 0,
            highest_score: 0,
            badges: Vec::new(),
            level: 1,
            experience: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|oid| oid.to_hex()).unwrap_or_default()
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.badges.iter().any(|b| b.id == badge_id)
    }

    /// Returns false when a badge with the same id is already held.
    pub fn award_badge(&mut self, badge: Badge) -> bool {
        if self.has_badge(&badge.id) {
            return false;
        }
        self.badges.push(badge);
        true
    }

    /// Folds one completed attempt into the profile statistics.
    pub fn record_completed_attempt(&mut self, percentage: i32, score: i32) {
        let previous = self.total_quizzes_attempted as i64;
        let total = previous + 1;
        let sum = self.average_score as i64 * previous + percentage as i64;

        self.total_quizzes_attempted = total as i32;
        self.average_score = ((sum as f64) / (total as f64)).round() as i32;
        self.highest_score = self.highest_score.max(percentage);
        self.experience += score.max(0) as i64;
        self.level = (1 + self.experience / EXPERIENCE_PER_LEVEL) as i32;
    }
}

#[cfg(test)]
impl User {
    pub fn test_user(username: &str) -> Self {
        let mut user = User::new(
            username,
            &format!("{}@example.com", username),
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
        );
        user.id = Some(ObjectId::new());
        user
    }
}
