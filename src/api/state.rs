//! Application state for shared services

use std::sync::Arc;

use crate::domain::user::UserRepository;
use crate::domain::{
    DiseaseInfo, DomainError, NewScan, Profile, ProfileUpdate, ScanRecord, ScanRepository,
    UserSummary,
};
use crate::infrastructure::db::QueryExecutor;
use crate::infrastructure::object_store::ObjectStore;
use crate::infrastructure::scan::ScanService;
use crate::infrastructure::user::{AccountService, PasswordHasher, SignupRequest};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountServiceTrait>,
    pub scans: Arc<dyn ScanServiceTrait>,
    pub uploads: Arc<dyn ObjectStore>,
    pub db: Arc<QueryExecutor>,
    pub scan_bucket: String,
    pub profile_bucket: String,
}

/// Trait for account workflow operations
#[async_trait::async_trait]
pub trait AccountServiceTrait: Send + Sync {
    async fn pre_signup(&self, request: SignupRequest) -> Result<(), DomainError>;
    async fn complete_signup(&self, email: &str, code: &str) -> Result<i64, DomainError>;
    async fn resend_verification_code(&self, email: &str) -> Result<(), DomainError>;
    async fn login(&self, identifier: &str, password: &str) -> Result<UserSummary, DomainError>;
    async fn forgot_password(&self, email: &str) -> Result<(), DomainError>;
    async fn verify_otp(&self, email: &str, otp: &str) -> Result<i64, DomainError>;
    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), DomainError>;
    async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError>;
    async fn verify_email_change(
        &self,
        user_id: i64,
        password: &str,
        new_email: &str,
    ) -> Result<(), DomainError>;
    async fn confirm_email_change(&self, user_id: i64, otp: &str) -> Result<(), DomainError>;
    async fn get_profile(&self, user_id: i64) -> Result<Profile, DomainError>;
    async fn update_profile(&self, user_id: i64, update: ProfileUpdate)
        -> Result<(), DomainError>;
    async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<(), DomainError>;
}

/// Trait for scan operations
#[async_trait::async_trait]
pub trait ScanServiceTrait: Send + Sync {
    async fn save_scan(&self, scan: NewScan) -> Result<i64, DomainError>;
    async fn history(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError>;
    async fn disease_info(&self, class_number: i32) -> Result<DiseaseInfo, DomainError>;
}

// Implement traits for the actual services

#[async_trait::async_trait]
impl<R, H> AccountServiceTrait for AccountService<R, H>
where
    R: UserRepository + 'static,
    H: PasswordHasher + 'static,
{
    async fn pre_signup(&self, request: SignupRequest) -> Result<(), DomainError> {
        AccountService::pre_signup(self, request).await
    }

    async fn complete_signup(&self, email: &str, code: &str) -> Result<i64, DomainError> {
        AccountService::complete_signup(self, email, code).await
    }

    async fn resend_verification_code(&self, email: &str) -> Result<(), DomainError> {
        AccountService::resend_verification_code(self, email).await
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<UserSummary, DomainError> {
        AccountService::login(self, identifier, password).await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), DomainError> {
        AccountService::forgot_password(self, email).await
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<i64, DomainError> {
        AccountService::verify_otp(self, email, otp).await
    }

    async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), DomainError> {
        AccountService::reset_password(self, email, new_password).await
    }

    async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        AccountService::change_password(self, user_id, current_password, new_password).await
    }

    async fn verify_email_change(
        &self,
        user_id: i64,
        password: &str,
        new_email: &str,
    ) -> Result<(), DomainError> {
        AccountService::verify_email_change(self, user_id, password, new_email).await
    }

    async fn confirm_email_change(&self, user_id: i64, otp: &str) -> Result<(), DomainError> {
        AccountService::confirm_email_change(self, user_id, otp).await
    }

    async fn get_profile(&self, user_id: i64) -> Result<Profile, DomainError> {
        AccountService::get_profile(self, user_id).await
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<(), DomainError> {
        AccountService::update_profile(self, user_id, update).await
    }

    async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<(), DomainError> {
        AccountService::set_profile_image(self, user_id, url).await
    }
}

#[async_trait::async_trait]
impl<R: ScanRepository + 'static> ScanServiceTrait for ScanService<R> {
    async fn save_scan(&self, scan: NewScan) -> Result<i64, DomainError> {
        ScanService::save_scan(self, scan).await
    }

    async fn history(&self, user_id: i64) -> Result<Vec<ScanRecord>, DomainError> {
        ScanService::history(self, user_id).await
    }

    async fn disease_info(&self, class_number: i32) -> Result<DiseaseInfo, DomainError> {
        ScanService::disease_info(self, class_number).await
    }
}
