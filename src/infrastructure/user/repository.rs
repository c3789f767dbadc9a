//! In-memory user repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::user::{Credentials, NewUser, Profile, ProfileUpdate, UserRepository};
use crate::domain::DomainError;

struct StoredUser {
    credentials: Credentials,
    profile: Profile,
}

/// In-memory implementation of [`UserRepository`], used by tests and the
/// service-level workflow tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, StoredUser>>,
    next_id: AtomicI64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.profile.email == email))
    }

    async fn email_in_use_by_other(
        &self,
        email: &str,
        user_id: i64,
    ) -> Result<bool, DomainError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .any(|u| u.profile.email == email && u.profile.user_id != user_id))
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<i64, DomainError> {
        let mut users = self.users.write().await;

        // Mirrors the storage-layer uniqueness constraints.
        if users.values().any(|u| u.profile.email == new_user.email) {
            return Err(DomainError::conflict("Email already in use"));
        }
        if users
            .values()
            .any(|u| u.credentials.username == new_user.username)
        {
            return Err(DomainError::conflict("Username already in use"));
        }

        let user_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        users.insert(
            user_id,
            StoredUser {
                credentials: Credentials {
                    user_id,
                    username: new_user.username.clone(),
                    password_hash: new_user.password_hash.clone(),
                    role_id: new_user.role_id,
                    email: new_user.email.clone(),
                },
                profile: Profile {
                    user_id,
                    firstname: new_user.firstname.clone(),
                    lastname: new_user.lastname.clone(),
                    birthdate: new_user.birthdate,
                    gender: new_user.gender.clone(),
                    email: new_user.email.clone(),
                    mobile_number: new_user.mobile_number.clone(),
                    profile_image_url: None,
                },
            },
        );

        Ok(user_id)
    }

    async fn find_credentials(&self, identifier: &str) -> Result<Option<Credentials>, DomainError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.credentials.username == identifier || u.profile.email == identifier)
            .map(|u| u.credentials.clone()))
    }

    async fn find_credentials_by_id(
        &self,
        user_id: i64,
    ) -> Result<Option<Credentials>, DomainError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).map(|u| u.credentials.clone()))
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, DomainError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.profile.email == email)
            .map(|u| u.profile.user_id))
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<bool, DomainError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                user.credentials.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_email(&self, user_id: i64, new_email: &str) -> Result<bool, DomainError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.profile.email == new_email && u.profile.user_id != user_id)
        {
            return Err(DomainError::conflict("Email already in use"));
        }

        match users.get_mut(&user_id) {
            Some(user) => {
                user.profile.email = new_email.to_string();
                user.credentials.email = new_email.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, DomainError> {
        let users = self.users.read().await;
        Ok(users.get(&user_id).map(|u| u.profile.clone()))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<bool, DomainError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(false);
        };

        if let Some(firstname) = &update.firstname {
            user.profile.firstname = firstname.clone();
        }
        if let Some(lastname) = &update.lastname {
            user.profile.lastname = lastname.clone();
        }
        if let Some(birthdate) = update.birthdate {
            user.profile.birthdate = birthdate;
        }
        if let Some(gender) = &update.gender {
            user.profile.gender = gender.clone();
        }
        if let Some(mobile_number) = &update.mobile_number {
            user.profile.mobile_number = mobile_number.clone();
        }

        Ok(true)
    }

    async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<bool, DomainError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                user.profile.profile_image_url = Some(url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            role_id: 2,
            firstname: "Ana".to_string(),
            lastname: "Reyes".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1998, 4, 12).unwrap(),
            gender: "female".to_string(),
            email: email.to_string(),
            mobile_number: "09171234567".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = InMemoryUserRepository::new();
        let user_id = repo.create_user(&new_user("ana", "a@x.com")).await.unwrap();

        assert!(repo.email_exists("a@x.com").await.unwrap());
        assert!(!repo.email_exists("b@x.com").await.unwrap());

        let by_username = repo.find_credentials("ana").await.unwrap().unwrap();
        assert_eq!(by_username.user_id, user_id);

        let by_email = repo.find_credentials("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.username, "ana");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&new_user("ana", "a@x.com")).await.unwrap();

        let result = repo.create_user(&new_user("ben", "a@x.com")).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let repo = InMemoryUserRepository::new();
        let user_id = repo.create_user(&new_user("ana", "a@x.com")).await.unwrap();

        let update = ProfileUpdate {
            firstname: Some("Anna".to_string()),
            ..Default::default()
        };
        assert!(repo.update_profile(user_id, &update).await.unwrap());

        let profile = repo.get_profile(user_id).await.unwrap().unwrap();
        assert_eq!(profile.firstname, "Anna");
        assert_eq!(profile.lastname, "Reyes");
    }

    #[tokio::test]
    async fn test_update_email_checks_other_accounts() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create_user(&new_user("ana", "a@x.com")).await.unwrap();
        repo.create_user(&new_user("ben", "b@x.com")).await.unwrap();

        let result = repo.update_email(first, "b@x.com").await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        assert!(repo.update_email(first, "new@x.com").await.unwrap());
        let creds = repo.find_credentials("new@x.com").await.unwrap();
        assert!(creds.is_some());
    }

    #[tokio::test]
    async fn test_missing_user_returns_false() {
        let repo = InMemoryUserRepository::new();
        assert!(!repo.update_password(99, "hash").await.unwrap());
        assert!(!repo.set_profile_image(99, "url").await.unwrap());
        assert!(repo.get_profile(99).await.unwrap().is_none());
    }
}
