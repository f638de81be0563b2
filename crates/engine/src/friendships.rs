//! Friendship primitives.
//!
//! There is exactly one record per unordered pair of users, stored under
//! [`pair_key`]. Removing a friend does not delete the record: it is kept as a
//! `blocked` tombstone.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Active,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
        }
    }
}

impl TryFrom<&str> for FriendshipStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "blocked" => Ok(Self::Blocked),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid friendship status: {other}"
            ))),
        }
    }
}

/// Order two user ids lexicographically.
pub fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Key of the friendship between `a` and `b`, independent of argument order.
pub fn pair_key(a: &str, b: &str) -> String {
    let (low, high) = sorted_pair(a, b);
    format!("{low}_{high}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    /// `[low, high]`, sorted.
    pub users: [String; 2],
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: DateTime<Utc>,
    pub status: FriendshipStatus,
}

impl Friendship {
    pub fn active(a: &str, b: &str, now: DateTime<Utc>) -> Self {
        let (low, high) = sorted_pair(a, b);
        Self {
            users: [low.to_string(), high.to_string()],
            created_at: now,
            last_interaction_at: now,
            status: FriendshipStatus::Active,
        }
    }

    pub fn key(&self) -> String {
        pair_key(&self.users[0], &self.users[1])
    }

    pub fn is_active(&self) -> bool {
        self.status == FriendshipStatus::Active
    }

    /// The participant that is not `user_id`.
    pub fn other(&self, user_id: &str) -> &str {
        if self.users[0] == user_id {
            &self.users[1]
        } else {
            &self.users[0]
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "friendships")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_low: String,
    pub user_high: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub last_interaction_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Friendship> for ActiveModel {
    fn from(friendship: &Friendship) -> Self {
        Self {
            id: ActiveValue::Set(friendship.key()),
            user_low: ActiveValue::Set(friendship.users[0].clone()),
            user_high: ActiveValue::Set(friendship.users[1].clone()),
            status: ActiveValue::Set(friendship.status.as_str().to_string()),
            created_at: ActiveValue::Set(friendship.created_at),
            last_interaction_at: ActiveValue::Set(friendship.last_interaction_at),
        }
    }
}

impl TryFrom<Model> for Friendship {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            status: FriendshipStatus::try_from(model.status.as_str())?,
            users: [model.user_low, model.user_high],
            created_at: model.created_at,
            last_interaction_at: model.last_interaction_at,
        })
    }
}
