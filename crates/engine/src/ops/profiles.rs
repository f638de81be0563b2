use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, UserProfile, fold, profiles};

use super::{Engine, normalize_user_id, pair, with_tx};

impl Engine {
    /// The profile of `user_id`.
    pub async fn profile(&self, user_id: &str) -> ResultEngine<UserProfile> {
        let user = normalize_user_id(user_id, "user_id")?;
        let user = user.as_str();
        let found = self
            .retrying("profile", move || pair::find_profile(&self.database, user))
            .await?;
        found.ok_or_else(|| EngineError::UserNotFound(user.to_string()))
    }

    /// Create the profile of `user_id`, or update its username, email and
    /// image. Relationship sets of an existing profile are left untouched.
    pub async fn upsert_profile(
        &self,
        user_id: &str,
        username: &str,
        email: &str,
        image_url: &str,
    ) -> ResultEngine<UserProfile> {
        let user = normalize_user_id(user_id, "user_id")?;
        let username = profiles::validate_username(username)?;
        let (user, username) = (user.as_str(), username.as_str());
        let (email, image_url) = (email.trim(), image_url.trim());

        let profile = self
            .retrying("upsert_profile", move || {
                self.try_upsert_profile(user, username, email, image_url)
            })
            .await?;
        tracing::info!(user, username, "profile saved");
        Ok(profile)
    }

    async fn try_upsert_profile(
        &self,
        user: &str,
        username: &str,
        email: &str,
        image_url: &str,
    ) -> ResultEngine<UserProfile> {
        with_tx!(self, |db_tx| {
            let existing = pair::find_profile(&db_tx, user).await?;
            ensure_username_free(&db_tx, user, username).await?;

            let created = existing.is_none();
            let mut profile = existing.unwrap_or_else(|| {
                UserProfile::new(user.to_string(), String::new(), String::new(), String::new())
            });
            profile.username = username.to_string();
            profile.email = email.to_string();
            profile.image_url = image_url.to_string();
            profile.touch(Utc::now().timestamp_millis());

            let model = profiles::ActiveModel::try_from(&profile)?;
            if created {
                model.insert(&db_tx).await?;
            } else {
                model.update(&db_tx).await?;
            }
            Ok(profile)
        })
    }

    /// Change the username of an existing profile.
    pub async fn update_username(&self, user_id: &str, username: &str) -> ResultEngine<UserProfile> {
        let user = normalize_user_id(user_id, "user_id")?;
        let username = profiles::validate_username(username)?;
        let (user, username) = (user.as_str(), username.as_str());

        let profile = self
            .retrying("update_username", move || {
                self.try_update_username(user, username)
            })
            .await?;
        tracing::info!(user, username, "username updated");
        Ok(profile)
    }

    async fn try_update_username(&self, user: &str, username: &str) -> ResultEngine<UserProfile> {
        with_tx!(self, |db_tx| {
            let mut profile = pair::find_profile(&db_tx, user)
                .await?
                .ok_or_else(|| EngineError::UserNotFound(user.to_string()))?;
            ensure_username_free(&db_tx, user, username).await?;

            profile.username = username.to_string();
            profile.touch(Utc::now().timestamp_millis());
            profiles::ActiveModel::try_from(&profile)?
                .update(&db_tx)
                .await?;
            Ok(profile)
        })
    }
}

/// Fail with `UsernameTaken` if another user already owns `username` once folded.
async fn ensure_username_free(
    db: &DatabaseTransaction,
    user_id: &str,
    username: &str,
) -> ResultEngine<()> {
    let taken = profiles::Entity::find()
        .filter(profiles::Column::UsernameFolded.eq(fold(username)))
        .filter(profiles::Column::UserId.ne(user_id))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(EngineError::UsernameTaken(username.to_string()));
    }
    Ok(())
}
