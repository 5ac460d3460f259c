use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::user::UserRole,
};

pub fn require_role(claims: &Claims, roles: &[UserRole]) -> AppResult<()> {
    if !roles.contains(&claims.role) {
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(())
}

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    require_role(claims, &[UserRole::Admin])
}

/// Owner checks carry their own message so each resource can word it.
pub fn require_owner(claims: &Claims, owner_id: &str, message: &str) -> AppResult<()> {
    if claims.sub != owner_id {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}
