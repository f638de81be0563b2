//! Friend request primitives.
//!
//! A request is directed: `alice -> bob` and `bob -> alice` are two different
//! records, stored under [`request_key`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid friend request status: {other}"
            ))),
        }
    }
}

/// Which side of a request a listing looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestDirection {
    /// Requests other users sent to me.
    Incoming,
    /// Requests I sent.
    Outgoing,
}

impl RequestDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl TryFrom<&str> for RequestDirection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "incoming" => Ok(Self::Incoming),
            "outgoing" => Ok(Self::Outgoing),
            other => Err(EngineError::InvalidInput(format!(
                "invalid request direction: {other}"
            ))),
        }
    }
}

/// Key of the request sent by `from_user_id` to `to_user_id`.
pub fn request_key(from_user_id: &str, to_user_id: &str) -> String {
    format!("{from_user_id}_{to_user_id}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn pending(from_user_id: String, to_user_id: String, now: DateTime<Utc>) -> Self {
        Self {
            from_user_id,
            to_user_id,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> String {
        request_key(&self.from_user_id, &self.to_user_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "friend_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FriendRequest> for ActiveModel {
    fn from(request: &FriendRequest) -> Self {
        Self {
            id: ActiveValue::Set(request.key()),
            from_user_id: ActiveValue::Set(request.from_user_id.clone()),
            to_user_id: ActiveValue::Set(request.to_user_id.clone()),
            status: ActiveValue::Set(request.status.as_str().to_string()),
            created_at: ActiveValue::Set(request.created_at),
            updated_at: ActiveValue::Set(request.updated_at),
        }
    }
}

impl TryFrom<Model> for FriendRequest {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            status: RequestStatus::try_from(model.status.as_str())?,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
