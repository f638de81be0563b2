//! Friend request and friendship endpoints, always acting as the caller.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use api_types::friends::{Profile, ProfilesResponse, RequestNew};
use engine::RequestDirection;

use crate::{
    ServerError,
    server::{CurrentUser, ServerState},
};

pub async fn list_friends(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<ProfilesResponse>, ServerError> {
    let profiles = state
        .engine
        .friends(&user)
        .await?
        .into_iter()
        .map(Profile::from)
        .collect();

    Ok(Json(ProfilesResponse { profiles }))
}

pub async fn list_requests(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(direction): Path<String>,
) -> Result<Json<ProfilesResponse>, ServerError> {
    let direction = RequestDirection::try_from(direction.as_str())?;
    let profiles = state
        .engine
        .requests(&user, direction)
        .await?
        .into_iter()
        .map(Profile::from)
        .collect();

    Ok(Json(ProfilesResponse { profiles }))
}

pub async fn send_request(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<RequestNew>,
) -> Result<StatusCode, ServerError> {
    state.engine.send_request(&user, &payload.to_user_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn accept_request(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.accept_request(&user, &friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reject_request(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.reject_request(&user, &friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_friend(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_friend(&user, &friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
