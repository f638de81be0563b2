//! The module contains `UserProfile` and the `users` table.
//!
//! A profile caches the user's relationship sets (`friends`, incoming and
//! outgoing requests). The sets are derived from `friend_requests` and
//! `friendships` and are only written inside the same DB transaction as those
//! records.

use std::collections::BTreeSet;

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

pub(crate) const USERNAME_MIN_LEN: usize = 6;
pub(crate) const USERNAME_MAX_LEN: usize = 14;

/// A user as seen by the relationship subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable identifier provided by the authentication layer.
    pub user_id: String,
    /// Username as entered by the user.
    pub username: String,
    pub email: String,
    pub image_url: String,
    /// Milliseconds since the epoch of the last write, strictly increasing.
    pub updated_at: i64,
    pub friends: BTreeSet<String>,
    pub incoming_requests: BTreeSet<String>,
    pub outgoing_requests: BTreeSet<String>,
}

impl UserProfile {
    pub fn new(user_id: String, username: String, email: String, image_url: String) -> Self {
        Self {
            user_id,
            username,
            email,
            image_url,
            updated_at: 0,
            friends: BTreeSet::new(),
            incoming_requests: BTreeSet::new(),
            outgoing_requests: BTreeSet::new(),
        }
    }

    /// Case-folded username used for search and uniqueness.
    pub fn username_folded(&self) -> String {
        fold(&self.username)
    }

    /// Bump `updated_at`, never going backwards even if the clock does.
    pub(crate) fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
    }

    /// Drop every trace of `other` from the relationship sets.
    pub(crate) fn forget(&mut self, other: &str) {
        self.friends.remove(other);
        self.incoming_requests.remove(other);
        self.outgoing_requests.remove(other);
    }
}

/// Trim, NFKC-normalize and lowercase `value`.
pub fn fold(value: &str) -> String {
    value.trim().nfkc().collect::<String>().to_lowercase()
}

/// Validate a username and return it trimmed.
pub(crate) fn validate_username(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < USERNAME_MIN_LEN {
        return Err(EngineError::InvalidUsername(format!(
            "username must be at least {USERNAME_MIN_LEN} characters"
        )));
    }
    if len > USERNAME_MAX_LEN {
        return Err(EngineError::InvalidUsername(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(EngineError::InvalidUsername(
            "username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub username: String,
    #[sea_orm(unique)]
    pub username_folded: String,
    pub email: String,
    pub image_url: String,
    pub updated_at: i64,
    /// JSON array of user ids.
    pub friends: String,
    pub incoming_requests: String,
    pub outgoing_requests: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn encode_set(set: &BTreeSet<String>) -> ResultEngine<String> {
    serde_json::to_string(set).map_err(|err| EngineError::CorruptRecord(err.to_string()))
}

fn decode_set(user_id: &str, column: &str, value: &str) -> ResultEngine<BTreeSet<String>> {
    serde_json::from_str(value).map_err(|err| {
        EngineError::CorruptRecord(format!("users/{user_id}.{column}: {err}"))
    })
}

impl TryFrom<&UserProfile> for ActiveModel {
    type Error = EngineError;

    fn try_from(profile: &UserProfile) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: ActiveValue::Set(profile.user_id.clone()),
            username: ActiveValue::Set(profile.username.clone()),
            username_folded: ActiveValue::Set(profile.username_folded()),
            email: ActiveValue::Set(profile.email.clone()),
            image_url: ActiveValue::Set(profile.image_url.clone()),
            updated_at: ActiveValue::Set(profile.updated_at),
            friends: ActiveValue::Set(encode_set(&profile.friends)?),
            incoming_requests: ActiveValue::Set(encode_set(&profile.incoming_requests)?),
            outgoing_requests: ActiveValue::Set(encode_set(&profile.outgoing_requests)?),
        })
    }
}

impl TryFrom<Model> for UserProfile {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let friends = decode_set(&model.user_id, "friends", &model.friends)?;
        let incoming_requests =
            decode_set(&model.user_id, "incoming_requests", &model.incoming_requests)?;
        let outgoing_requests =
            decode_set(&model.user_id, "outgoing_requests", &model.outgoing_requests)?;
        Ok(Self {
            user_id: model.user_id,
            username: model.username,
            email: model.email,
            image_url: model.image_url,
            updated_at: model.updated_at,
            friends,
            incoming_requests,
            outgoing_requests,
        })
    }
}
