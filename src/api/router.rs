use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth;
use super::health;
use super::profile;
use super::scan;
use super::state::AppState;
use super::upload;

/// Create the full router with application state. Paths are flat because the
/// mobile client addresses them verbatim.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/", get(health::health_check))
        .route("/check", get(health::db_check))
        // Account workflows
        .route("/pre-signup", post(auth::pre_signup))
        .route("/complete-signup", post(auth::complete_signup))
        .route("/resend-verification-code", post(auth::resend_verification_code))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-password-otp", post(auth::resend_password_otp))
        .route("/reset-password", post(auth::reset_password))
        .route("/change-password", post(auth::change_password))
        .route("/verify-email-change", post(auth::verify_email_change))
        .route("/confirm-email-change", post(auth::confirm_email_change))
        // Profile
        .route("/api/profile/{user_id}", get(profile::get_profile))
        .route("/api/profile/update", put(profile::update_profile))
        // Uploads
        .route("/upload", post(upload::upload_scan_image))
        .route("/upload-profile", post(upload::upload_profile_image))
        // Scans
        .route("/save", post(scan::save_scan))
        .route("/api/scan-history/{user_id}", get(scan::scan_history))
        .route("/disease-info/{class_number}", get(scan::disease_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use chrono::NaiveDate;

    use crate::config::VerificationConfig;
    use crate::domain::{DiseaseInfo, NewScan, NewUser, ScanRepository, UserRepository};
    use crate::infrastructure::db::testing::MockDriver;
    use crate::infrastructure::db::{ConnectionPool, PoolConfig, QueryExecutor};
    use crate::infrastructure::email::LogMailer;
    use crate::infrastructure::object_store::InMemoryObjectStore;
    use crate::infrastructure::scan::{InMemoryScanRepository, ScanService};
    use crate::infrastructure::user::{AccountService, Argon2Hasher, InMemoryUserRepository};
    use crate::infrastructure::verification::VerificationStores;

    use super::super::state::AppState;
    use super::*;

    fn test_state() -> (AppState, Arc<InMemoryScanRepository>, Arc<InMemoryUserRepository>) {
        let scan_repo = Arc::new(InMemoryScanRepository::new());
        let user_repo = Arc::new(InMemoryUserRepository::new());
        let accounts = AccountService::new(
            user_repo.clone(),
            Arc::new(Argon2Hasher::new()),
            Arc::new(LogMailer),
            Arc::new(VerificationStores::default()),
            &VerificationConfig::default(),
        );
        let pool = Arc::new(ConnectionPool::new(
            Arc::new(MockDriver::default()),
            PoolConfig {
                max_size: 1,
                acquire_timeout: Duration::from_secs(1),
            },
        ));

        let state = AppState {
            accounts: Arc::new(accounts),
            scans: Arc::new(ScanService::new(scan_repo.clone())),
            uploads: Arc::new(InMemoryObjectStore::new()),
            db: Arc::new(QueryExecutor::new(pool, Duration::from_secs(1))),
            scan_bucket: "rice-leaf-scans".to_string(),
            profile_bucket: "profile-images".to_string(),
        };
        (state, scan_repo, user_repo)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const BOUNDARY: &str = "leaf-form-boundary";

    fn multipart_request(uri: &str, parts: &str) -> Request<Body> {
        let body = format!("{}--{}--\r\n", parts, BOUNDARY);
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn file_part(name: &str, bytes: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
             filename=\"leaf.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n{bytes}\r\n"
        )
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    async fn seeded_user(user_repo: &InMemoryUserRepository) -> i64 {
        user_repo
            .create_user(&NewUser {
                username: "ana".to_string(),
                password_hash: "hash".to_string(),
                role_id: 2,
                firstname: "Ana".to_string(),
                lastname: "Reyes".to_string(),
                birthdate: NaiveDate::from_ymd_opt(1998, 4, 12).unwrap(),
                gender: "female".to_string(),
                email: "a@x.com".to_string(),
                mobile_number: "09171234567".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_liveness() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_save_scan_reports_missing_fields() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/save",
                json!({ "user_id": 1, "disease_detected": "Tungro", "confidence": 0.9 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["missingFields"], json!(["scan_image"]));
    }

    #[tokio::test]
    async fn test_save_scan_and_history() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/save",
                json!({
                    "user_id": 7,
                    "disease_detected": "Tungro",
                    "confidence": 0.88,
                    "scan_image": "https://cdn/scan.jpg"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["rice_leaf_scan_id"], 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/scan-history/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let history = body_json(response).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["diseaseDetected"], "Tungro");
    }

    #[tokio::test]
    async fn test_disease_info_lookup() {
        let (state, scan_repo, _) = test_state();
        scan_repo
            .insert_disease(DiseaseInfo {
                class_number: 2,
                disease_name: "Rice Blast".to_string(),
                description: "Diamond-shaped lesions.".to_string(),
                treatments: vec!["Apply tricyclazole".to_string()],
            })
            .await;
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/disease-info/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["diseaseName"], "Rice Blast");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/disease-info/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_login_with_unknown_user_is_bad_request() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(json_request(
                "POST",
                "/login",
                json!({ "identifier": "nobody", "password": "Secret123" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/profile/123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_scan_history_ignores_stray_scans() {
        let (state, scan_repo, _) = test_state();
        scan_repo
            .insert_scan(&NewScan {
                user_id: 3,
                disease_detected: "Blight".to_string(),
                confidence: 0.7,
                scan_image: "https://cdn/other.jpg".to_string(),
            })
            .await
            .unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/scan-history/4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let history = body_json(response).await;
        assert!(history.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_scan_image_returns_public_url() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request("/upload", &file_part("image", "jpegbytes")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("memory://rice-leaf-scans/"));
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_rejected() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request("/upload", &text_part("caption", "no file")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "No image provided");
    }

    #[tokio::test]
    async fn test_upload_profile_image_updates_profile() {
        let (state, _, user_repo) = test_state();
        let user_id = seeded_user(&user_repo).await;
        let app = create_router(state);

        // Text field after the file: the handler drains the whole form.
        let parts = format!(
            "{}{}",
            file_part("image", "jpegbytes"),
            text_part("userId", &user_id.to_string())
        );
        let response = app
            .clone()
            .oneshot(multipart_request("/upload-profile", &parts))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = body["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("memory://profile-images/"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/profile/{}", user_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let profile = body_json(response).await;
        assert_eq!(profile["profileImageUrl"], url);
    }

    #[tokio::test]
    async fn test_upload_profile_image_requires_user_id_field() {
        let (state, _, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(multipart_request(
                "/upload-profile",
                &file_part("image", "jpegbytes"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Missing or invalid userId field");
    }
}
