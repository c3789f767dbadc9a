//! Profile endpoint handlers.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Profile, ProfileUpdate};

/// GET /api/profile/{user_id}
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.accounts.get_profile(user_id).await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    pub user_id: i64,
    #[serde(flatten)]
    pub update: ProfileUpdate,
}

#[derive(Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
}

/// PUT /api/profile/update
pub async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    state
        .accounts
        .update_profile(body.user_id, body.update)
        .await?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated".to_string(),
    }))
}
