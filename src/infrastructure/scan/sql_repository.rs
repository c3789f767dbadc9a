//! SQL scan repository: scan persistence plus disease reference lookups.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DiseaseInfo, DomainError, NewScan, ScanRecord, ScanRepository};
use crate::infrastructure::db::{QueryExecutor, SqlRow, SqlValue};

pub struct SqlScanRepository {
    executor: Arc<QueryExecutor>,
}

impl SqlScanRepository {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

fn row_to_scan(row: &SqlRow) -> Result<ScanRecord, DomainError> {
    Ok(ScanRecord {
        rice_leaf_scan_id: row[0].as_int()?,
        user_id: row[1].as_int()?,
        disease_detected: row[2].as_text()?.to_string(),
        confidence: row[3].as_float()?,
        scan_image: row[4].as_text()?.to_string(),
        scanned_at: row[5].as_timestamp()?,
    })
}

#[async_trait]
impl ScanRepository for SqlScanRepository {
    async fn insert_scan(&self, scan: &NewScan) -> Result<i64, DomainError> {
        let result = self
            .executor
            .execute(
                "INSERT INTO rice_leaf_scans \
                     (user_id, disease_detected, confidence, scan_image, scanned_at) \
                 VALUES ($1, $2, $3, $4, NOW()) \
                 RETURNING rice_leaf_scan_id",
                &[
                    SqlValue::Int(scan.user_id),
                    SqlValue::Text(scan.disease_detected.clone()),
                    SqlValue::Float(scan.confidence),
                    SqlValue::Text(scan.scan_image.clone()),
                ],
            )
            .await?;

        let row = result
            .first()
            .ok_or_else(|| DomainError::infra("scan insert returned no id"))?;
        Ok(row[0].as_int()?)
    }

    async fn history_for_user(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError> {
        let result = self
            .executor
            .execute(
                "SELECT rice_leaf_scan_id, user_id, disease_detected, confidence, \
                        scan_image, scanned_at \
                 FROM rice_leaf_scans \
                 WHERE user_id = $1 \
                 ORDER BY scanned_at DESC",
                &[SqlValue::Int(user_id)],
            )
            .await?;

        result.rows.iter().map(row_to_scan).collect()
    }

    async fn disease_by_class(
        &self,
        class_number: i32,
    ) -> Result<Option<DiseaseInfo>, DomainError> {
        // One row per treatment; diseases without treatments still yield a
        // single row with a NULL treatment column.
        let result = self
            .executor
            .execute(
                "SELECT d.class_number, d.disease_name, d.description, t.treatment \
                 FROM diseases d \
                 LEFT JOIN disease_treatments t ON t.class_number = d.class_number \
                 WHERE d.class_number = $1 \
                 ORDER BY t.treatment_id",
                &[SqlValue::Int(class_number.into())],
            )
            .await?;

        let Some(first) = result.first() else {
            return Ok(None);
        };

        let mut info = DiseaseInfo {
            class_number: first[0].as_int()? as i32,
            disease_name: first[1].as_text()?.to_string(),
            description: first[2].as_text()?.to_string(),
            treatments: Vec::new(),
        };
        for row in &result.rows {
            if let Some(treatment) = row[3].as_opt_text()? {
                info.treatments.push(treatment.to_string());
            }
        }
        Ok(Some(info))
    }
}
