//! User creation/lookup. Thin glue, no password, no auth beyond the
//! opaque id the client is handed back.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub last_joined_at: OffsetDateTime,
}

pub async fn create_user(store: &Store, name: String) -> Result<User, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    let now = OffsetDateTime::now_utc();
    let user = User { id: Uuid::new_v4(), name, created_at: now, last_joined_at: now };
    store.put_user(&user).await?;
    Ok(user)
}

pub async fn get_user(store: &Store, id: &str) -> Result<Option<User>, AppError> {
    store.get_user(id).await
}

/// Called whenever a user joins a room to bump their last-seen
/// timestamp.
pub async fn touch_user_on_join(store: &Store, id: &str) -> Result<Option<User>, AppError> {
    let Some(mut user) = store.get_user(id).await? else { return Ok(None) };
    user.last_joined_at = OffsetDateTime::now_utc();
    store.put_user(&user).await?;
    Ok(Some(user))
}
