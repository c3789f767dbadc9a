//! In-memory scan repository for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{DiseaseInfo, DomainError, NewScan, ScanRecord, ScanRepository};

#[derive(Default)]
pub struct InMemoryScanRepository {
    scans: RwLock<Vec<ScanRecord>>,
    diseases: RwLock<HashMap<i32, DiseaseInfo>>,
    next_id: AtomicI64,
}

impl InMemoryScanRepository {
    pub fn new() -> Self {
        Self {
            scans: RwLock::new(Vec::new()),
            diseases: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seed reference data that production reads from the diseases tables.
    pub async fn insert_disease(&self, info: DiseaseInfo) {
        self.diseases.write().await.insert(info.class_number, info);
    }
}

#[async_trait]
impl ScanRepository for InMemoryScanRepository {
    async fn insert_scan(&self, scan: &NewScan) -> Result<i64, DomainError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.scans.write().await.push(ScanRecord {
            rice_leaf_scan_id: id,
            user_id: scan.user_id,
            disease_detected: scan.disease_detected.clone(),
            confidence: scan.confidence,
            scan_image: scan.scan_image.clone(),
            scanned_at: Utc::now(),
        });
        Ok(id)
    }

    async fn history_for_user(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError> {
        let scans = self.scans.read().await;
        let mut matching: Vec<ScanRecord> = scans
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        Ok(matching)
    }

    async fn disease_by_class(
        &self,
        class_number: i32,
    ) -> Result<Option<DiseaseInfo>, DomainError> {
        Ok(self.diseases.read().await.get(&class_number).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_scan(user_id: i64, disease: &str) -> NewScan {
        NewScan {
            user_id,
            disease_detected: disease.to_string(),
            confidence: 0.93,
            scan_image: "https://cdn/scan.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_history_scoped_to_user() {
        let repo = InMemoryScanRepository::new();
        repo.insert_scan(&new_scan(1, "Blast")).await.unwrap();
        repo.insert_scan(&new_scan(2, "Tungro")).await.unwrap();
        repo.insert_scan(&new_scan(1, "Blight")).await.unwrap();

        let history = repo.history_for_user(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.user_id == 1));
        assert!(history[0].scanned_at >= history[1].scanned_at);
    }

    #[tokio::test]
    async fn test_disease_lookup() {
        let repo = InMemoryScanRepository::new();
        repo.insert_disease(DiseaseInfo {
            class_number: 0,
            disease_name: "Bacterial Leaf Blight".to_string(),
            description: "Water-soaked lesions along leaf margins.".to_string(),
            treatments: vec!["Use balanced fertilization".to_string()],
        })
        .await;

        let found = repo.disease_by_class(0).await.unwrap().unwrap();
        assert_eq!(found.disease_name, "Bacterial Leaf Blight");
        assert!(repo.disease_by_class(42).await.unwrap().is_none());
    }
}
