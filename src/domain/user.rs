//! User entities and repository contract.
//!
//! A user is split across two aggregates the way the persistence layer stores
//! them: a credentials row (`user_id`, `username`, password hash, role) and a
//! profile row (names, birthdate, gender, email, mobile number, image URL).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DomainError;

/// Role assigned to self-registered accounts.
pub const DEFAULT_ROLE_ID: i32 = 2;

/// Credentials aggregate, joined with the profile email for
/// username-or-email login lookups.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub role_id: i32,
    pub email: String,
}

/// Profile aggregate. Serialized with camelCase keys, the casing the mobile
/// client expects everywhere.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: i64,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub email: String,
    pub mobile_number: String,
    pub profile_image_url: Option<String>,
}

/// Minimal view returned by a successful login. No session token is issued
/// here; token issuance lives outside this service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role_id: i32,
}

/// Everything needed to persist a verified signup in one shot.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role_id: i32,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub email: String,
    pub mobile_number: String,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub mobile_number: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.firstname.is_none()
            && self.lastname.is_none()
            && self.birthdate.is_none()
            && self.gender.is_none()
            && self.mobile_number.is_none()
    }
}

/// Validate an email address shape. Not RFC-complete; rejects the obviously
/// malformed before any code is mailed to it.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let trimmed = email.trim();
    if trimmed.len() < 5 || trimmed.len() > 254 {
        return Err(DomainError::validation("Invalid email address"));
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(DomainError::validation("Invalid email address"));
    };
    if local.is_empty() || domain.len() < 3 || !domain.contains('.') || domain.contains('@') {
        return Err(DomainError::validation("Invalid email address"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.len() < 3 || username.len() > 32 {
        return Err(DomainError::validation(
            "Username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(DomainError::validation(
            "Username may only contain letters, digits, '_' and '.'",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.len() < 8 {
        return Err(DomainError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if password.len() > 128 {
        return Err(DomainError::validation(
            "Password must be at most 128 characters",
        ));
    }
    Ok(())
}

/// Persistence contract for users. Production reaches storage exclusively
/// through the query executor; tests use the in-memory twin.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Is this email already attached to any profile?
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError>;

    /// Is this email attached to a profile other than `user_id`'s?
    async fn email_in_use_by_other(
        &self,
        email: &str,
        user_id: i64,
    ) -> Result<bool, DomainError>;

    /// Insert credentials and profile as a single atomic unit and return the
    /// generated user id. Either both rows exist afterwards or neither does.
    async fn create_user(&self, new_user: &NewUser) -> Result<i64, DomainError>;

    /// Look up credentials by username or email.
    async fn find_credentials(&self, identifier: &str) -> Result<Option<Credentials>, DomainError>;

    async fn find_credentials_by_id(
        &self,
        user_id: i64,
    ) -> Result<Option<Credentials>, DomainError>;

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, DomainError>;

    /// Returns false when the user does not exist.
    async fn update_password(&self, user_id: i64, password_hash: &str)
        -> Result<bool, DomainError>;

    /// Returns false when the user does not exist.
    async fn update_email(&self, user_id: i64, new_email: &str) -> Result<bool, DomainError>;

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, DomainError>;

    /// Returns false when the user does not exist.
    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<bool, DomainError>;

    /// Returns false when the user does not exist.
    async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@mail.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@no-local.com").is_err());
        assert!(validate_email("x@nodot").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b_c99").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret123").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());

        let update = ProfileUpdate {
            firstname: Some("Ana".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
