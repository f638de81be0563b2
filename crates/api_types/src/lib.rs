use serde::{Deserialize, Serialize};

pub mod friends {
    use super::*;

    /// A user profile as exposed on the wire.
    ///
    /// The relationship sets are sorted user ids.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Profile {
        pub user_id: String,
        pub username: String,
        pub email: String,
        pub image_url: String,
        /// Milliseconds since the epoch of the last write.
        pub updated_at: i64,
        #[serde(default)]
        pub friends: Vec<String>,
        #[serde(default)]
        pub incoming_requests: Vec<String>,
        #[serde(default)]
        pub outgoing_requests: Vec<String>,
    }

    /// Response body for every endpoint listing profiles.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfilesResponse {
        pub profiles: Vec<Profile>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SearchQuery {
        #[serde(default)]
        pub q: String,
    }

    /// Request body for sending a friend request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RequestNew {
        pub to_user_id: String,
    }

    /// Request body for creating or updating the caller's profile.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProfileUpsert {
        pub username: String,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub image_url: String,
    }

    /// Which side of a pending request the caller is on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Direction {
        Incoming,
        Outgoing,
    }

    impl Direction {
        /// Path segment used by `GET /requests/{direction}`.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Incoming => "incoming",
                Self::Outgoing => "outgoing",
            }
        }
    }

    #[cfg(feature = "engine")]
    impl From<engine::UserProfile> for Profile {
        fn from(profile: engine::UserProfile) -> Self {
            Self {
                user_id: profile.user_id,
                username: profile.username,
                email: profile.email,
                image_url: profile.image_url,
                updated_at: profile.updated_at,
                friends: profile.friends.into_iter().collect(),
                incoming_requests: profile.incoming_requests.into_iter().collect(),
                outgoing_requests: profile.outgoing_requests.into_iter().collect(),
            }
        }
    }

    #[cfg(feature = "engine")]
    impl From<Direction> for engine::RequestDirection {
        fn from(direction: Direction) -> Self {
            match direction {
                Direction::Incoming => Self::Incoming,
                Direction::Outgoing => Self::Outgoing,
            }
        }
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    ///
    /// `code` is the stable snake_case error kind, `error` a human readable
    /// message.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub error: String,
        pub code: String,
    }
}
