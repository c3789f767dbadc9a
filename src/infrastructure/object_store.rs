//! Object storage collaborator for uploaded images.
//!
//! The production implementation talks to a Supabase-style storage REST API:
//! `POST {endpoint}/object/{bucket}/{key}` with the raw bytes, public URL at
//! `{public_base_url}/{bucket}/{key}`.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::domain::DomainError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` under `key` in `bucket` and return the public URL.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, DomainError>;
}

pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    public_base_url: String,
}

impl HttpObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, DomainError> {
        let url = format!("{}/object/{}/{}", self.endpoint, bucket, key);

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            warn!(bucket, key, error = %e, "object upload failed");
            DomainError::upstream(format!("Storage upload failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            warn!(bucket, key, %status, detail, "storage rejected upload");
            return Err(DomainError::upstream(format!(
                "Storage upload failed with status {}",
                status
            )));
        }

        debug!(bucket, key, "object uploaded");
        Ok(format!("{}/{}/{}", self.public_base_url, bucket, key))
    }
}

/// In-memory store backing upload tests.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: tokio::sync::Mutex<Vec<(String, usize)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stored_keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .await
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        _content_type: &str,
    ) -> Result<String, DomainError> {
        let path = format!("{}/{}", bucket, key);
        self.objects.lock().await.push((path.clone(), bytes.len()));
        Ok(format!("memory://{}", path))
    }
}
