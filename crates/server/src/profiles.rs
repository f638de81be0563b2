//! Profile endpoints: the caller's own profile and user search.

use axum::{
    Extension, Json,
    extract::{Query, State},
};

use api_types::friends::{Profile, ProfileUpsert, ProfilesResponse, SearchQuery};

use crate::{
    ServerError,
    server::{CurrentUser, ServerState},
};

pub async fn get(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
) -> Result<Json<Profile>, ServerError> {
    let profile = state.engine.profile(&user).await?;
    Ok(Json(Profile::from(profile)))
}

/// Create or update the caller's profile.
pub async fn upsert(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpsert>,
) -> Result<Json<Profile>, ServerError> {
    let profile = state
        .engine
        .upsert_profile(&user, &payload.username, &payload.email, &payload.image_url)
        .await?;
    Ok(Json(Profile::from(profile)))
}

/// Users whose username starts with `q`, never including the caller.
pub async fn search(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ProfilesResponse>, ServerError> {
    let profiles = state
        .engine
        .search_users(&query.q, &user)
        .await?
        .into_iter()
        .map(Profile::from)
        .collect();

    Ok(Json(ProfilesResponse { profiles }))
}
