//! Scan workflows: persist classifier results, list a user's history, and
//! serve disease reference data.

use std::sync::Arc;

use tracing::info;

use crate::domain::{DiseaseInfo, DomainError, NewScan, ScanRecord, ScanRepository};

pub struct ScanService<R: ScanRepository> {
    repository: Arc<R>,
}

impl<R: ScanRepository> ScanService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn save_scan(&self, scan: NewScan) -> Result<i64, DomainError> {
        let scan_id = self.repository.insert_scan(&scan).await?;
        info!(scan_id, user_id = scan.user_id, disease = %scan.disease_detected, "scan saved");
        Ok(scan_id)
    }

    /// Most recent first. A user with no scans gets an empty list, not an
    /// error.
    pub async fn history(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError> {
        self.repository.history_for_user(user_id).await
    }

    pub async fn disease_info(&self, class_number: i32) -> Result<DiseaseInfo, DomainError> {
        self.repository
            .disease_by_class(class_number)
            .await?
            .ok_or_else(|| DomainError::not_found("Unknown disease class"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::InMemoryScanRepository;
    use super::*;

    #[tokio::test]
    async fn test_save_and_history() {
        let service = ScanService::new(Arc::new(InMemoryScanRepository::new()));

        let id = service
            .save_scan(NewScan {
                user_id: 7,
                disease_detected: "Tungro".to_string(),
                confidence: 0.88,
                scan_image: "https://cdn/scan.jpg".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(id, 1);

        let history = service.history(7).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(service.history(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_disease_class() {
        let service = ScanService::new(Arc::new(InMemoryScanRepository::new()));
        let result = service.disease_info(99).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
