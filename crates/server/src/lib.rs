use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, ErrorKind};

use api_types::error::ErrorBody;
pub use server::{app, run_with_listener, spawn_with_listener};

mod friends;
mod profiles;
mod server;

pub mod types {
    pub mod friends {
        pub use api_types::friends::{
            Direction, Profile, ProfileUpsert, ProfilesResponse, RequestNew, SearchQuery,
        };
    }

    pub mod error {
        pub use api_types::error::ErrorBody;
    }
}

pub enum ServerError {
    Engine(EngineError),
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UserNotFound | ErrorKind::RequestNotFound | ErrorKind::FriendshipNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorKind::AlreadyFriends
        | ErrorKind::DuplicateRequest
        | ErrorKind::ReverseRequestExists
        | ErrorKind::PairBlocked
        | ErrorKind::UsernameTaken => StatusCode::CONFLICT,
        ErrorKind::SelfRequest | ErrorKind::InvalidInput | ErrorKind::InvalidUsername => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InvalidStatus | ErrorKind::CorruptRecord | ErrorKind::Database => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let ServerError::Engine(err) = self;
        let kind = err.kind();
        let body = ErrorBody {
            error: message_for_engine_error(err),
            code: kind.as_str().to_string(),
        };

        (status_for_kind(kind), Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_types::friends::Profile;
    use engine::UserProfile;

    #[test]
    fn not_found_kinds_map_to_404() {
        let res = ServerError::from(EngineError::RequestNotFound).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = ServerError::from(EngineError::UserNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn relationship_conflicts_map_to_409() {
        for err in [
            EngineError::DuplicateRequest,
            EngineError::ReverseRequestExists,
            EngineError::AlreadyFriends,
            EngineError::PairBlocked,
        ] {
            assert_eq!(ServerError::from(err).into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn validation_maps_to_422() {
        let res = ServerError::from(EngineError::SelfRequest).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let res =
            ServerError::from(EngineError::InvalidUsername("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn store_unavailable_maps_to_503() {
        let res =
            ServerError::from(EngineError::StoreUnavailable("busy".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn corruption_maps_to_500() {
        let res = ServerError::from(EngineError::InvalidStatus("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn wire_profile_flattens_sets() {
        let mut profile = UserProfile::new(
            "u1".to_string(),
            "alice_01".to_string(),
            String::new(),
            String::new(),
        );
        profile.friends.insert("u3".to_string());
        profile.friends.insert("u2".to_string());

        let view = Profile::from(profile);
        assert_eq!(view.friends, ["u2", "u3"]);
        assert!(view.incoming_requests.is_empty());
    }
}
