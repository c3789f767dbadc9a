//! Scan endpoint handlers: save classifier results, list history, and serve
//! disease reference data.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{DiseaseInfo, NewScan, ScanRecord};

/// All fields optional at the wire level so absent ones can be reported
/// together instead of failing on the first. The classifier client sends
/// snake_case keys on this endpoint, unlike the rest of the surface.
#[derive(Debug, Deserialize)]
pub struct SaveScanBody {
    pub user_id: Option<i64>,
    pub disease_detected: Option<String>,
    pub confidence: Option<f64>,
    pub scan_image: Option<String>,
}

#[derive(Serialize)]
pub struct SaveScanResponse {
    pub message: String,
    pub rice_leaf_scan_id: i64,
}

/// POST /save
pub async fn save_scan(
    State(state): State<AppState>,
    Json(body): Json<SaveScanBody>,
) -> Result<impl IntoResponse, ApiError> {
    let mut missing = Vec::new();
    if body.user_id.is_none() {
        missing.push("user_id".to_string());
    }
    if body.disease_detected.is_none() {
        missing.push("disease_detected".to_string());
    }
    if body.confidence.is_none() {
        missing.push("confidence".to_string());
    }
    if body.scan_image.is_none() {
        missing.push("scan_image".to_string());
    }
    if !missing.is_empty() {
        return Err(ApiError::missing_fields(missing));
    }

    let scan = NewScan {
        user_id: body.user_id.unwrap_or_default(),
        disease_detected: body.disease_detected.unwrap_or_default(),
        confidence: body.confidence.unwrap_or_default(),
        scan_image: body.scan_image.unwrap_or_default(),
    };
    let rice_leaf_scan_id = state.scans.save_scan(scan).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveScanResponse {
            message: "Scan saved".to_string(),
            rice_leaf_scan_id,
        }),
    ))
}

/// GET /api/scan-history/{user_id}
pub async fn scan_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ScanRecord>>, ApiError> {
    let history = state.scans.history(user_id).await?;
    Ok(Json(history))
}

/// GET /disease-info/{class_number}
pub async fn disease_info(
    State(state): State<AppState>,
    Path(class_number): Path<i32>,
) -> Result<Json<DiseaseInfo>, ApiError> {
    let info = state.scans.disease_info(class_number).await?;
    Ok(Json(info))
}
