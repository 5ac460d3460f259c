use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::domain::serde_helpers::{
    chrono_datetime_as_bson_datetime, optional_chrono_datetime_as_bson_datetime,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RefreshToken {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub token_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
    #[serde(
        default,
        with = "optional_chrono_datetime_as_bson_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Where a refresh token was issued from.
#[derive(Clone, Debug, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshToken {
    pub fn new(
        user_id: ObjectId,
        token_hash: String,
        expires_at: DateTime<Utc>,
        client: ClientInfo,
    ) -> Self {
        Self {
            id: None,
            user_id,
            token_hash,
            created_at: Utc::now(),
            expires_at,
            revoked_at: None,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> RefreshToken {
        RefreshToken::new(
            ObjectId::new(),
            "hash123".to_string(),
            expires_at,
            ClientInfo {
                user_agent: Some("test-agent".to_string()),
                ip_address: Some("127.0.0.1".to_string()),
            },
        )
    }

    #[test]
    fn test_refresh_token_creation() {
        let token = token_expiring_at(Utc::now() + Duration::days(7));

        assert_eq!(token.token_hash, "hash123");
        assert_eq!(token.user_agent.as_deref(), Some("test-agent"));
        assert!(token.revoked_at.is_none());
        assert!(token.is_valid());
    }

    #[test]
    fn test_refresh_token_expired() {
        let token = token_expiring_at(Utc::now() - Duration::hours(1));
        assert!(!token.is_valid());
    }

    #[test]
    fn test_refresh_token_revoked() {
        let mut token = token_expiring_at(Utc::now() + Duration::days(7));
        token.revoked_at = Some(Utc::now());

        assert!(!token.is_valid());
    }

    #[test]
    fn test_hash_token_consistency() {
        let hash1 = hash_token("my-secret-token");
        let hash2 = hash_token("my-secret-token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex chars
        assert_ne!(hash1, hash_token("other-token"));
    }
}
