use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Badge, User},
        dto::{
            request::{AddBadgeRequest, UpdateProfileRequest},
            response::UserDto,
        },
    },
    repositories::UserRepository,
    services::parse_object_id,
};

const USERNAME_TAKEN: &str = "Username already taken";

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_profile(&self, user_id: &str) -> AppResult<UserDto> {
        Ok(self.load(user_id).await?.into())
    }

    /// Only `username` and `avatar` can change here.
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> AppResult<UserDto> {
        let request = request.normalized()?;
        let mut user = self.load(user_id).await?;

        if let Some(username) = request.username {
            if username != user.username {
                if let Some(existing) = self.repository.find_by_username(&username).await? {
                    if existing.id != user.id {
                        return Err(AppError::AlreadyExists(USERNAME_TAKEN.to_string()));
                    }
                }
                user.username = username;
            }
        }
        if let Some(avatar) = request.avatar {
            user.avatar = avatar;
        }

        let user = self.repository.update_profile(user).await.map_err(|e| match e {
            AppError::AlreadyExists(_) => AppError::AlreadyExists(USERNAME_TAKEN.to_string()),
            other => other,
        })?;
        Ok(user.into())
    }

    /// Adding a badge the user already holds leaves the profile unchanged.
    pub async fn add_badge(&self, user_id: &str, request: AddBadgeRequest) -> AppResult<UserDto> {
        let badge = Badge::try_from(request)?;
        let mut user = self.load(user_id).await?;
        let id = user
            .id
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.has_badge(&badge.id) {
            return Ok(user.into());
        }

        if !self.repository.add_badge(&id, badge.clone()).await? {
            // Awarded by a concurrent request, or the user is gone.
            return Ok(self.load(user_id).await?.into());
        }

        user.award_badge(badge);
        Ok(user.into())
    }

    async fn load(&self, user_id: &str) -> AppResult<User> {
        let id: ObjectId = parse_object_id(user_id, "User not found")?;
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
