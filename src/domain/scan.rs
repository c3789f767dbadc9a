//! Scan records and disease lookup contracts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DomainError;

/// A persisted disease scan. Serialized with camelCase keys for the mobile
/// client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub rice_leaf_scan_id: i64,
    pub user_id: i64,
    pub disease_detected: String,
    pub confidence: f64,
    pub scan_image: String,
    pub scanned_at: DateTime<Utc>,
}

/// Fields required to persist a scan.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub user_id: i64,
    pub disease_detected: String,
    pub confidence: f64,
    pub scan_image: String,
}

/// Reference data for one disease class produced by the classifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseInfo {
    pub class_number: i32,
    pub disease_name: String,
    pub description: String,
    pub treatments: Vec<String>,
}

#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Insert a scan, returning the generated `rice_leaf_scan_id`.
    async fn insert_scan(&self, scan: &NewScan) -> Result<i64, DomainError>;

    /// All scans for a user, most recent first.
    async fn history_for_user(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError>;

    async fn disease_by_class(
        &self,
        class_number: i32,
    ) -> Result<Option<DiseaseInfo>, DomainError>;
}
