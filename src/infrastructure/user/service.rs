//! Account workflows: signup with email verification, login, password
//! reset, email change, and profile management.
//!
//! Each workflow is a short linear sequence of guarded steps; the first
//! failed guard stops the workflow, and nothing persisted is visible to the
//! client on failure. OTP and verification codes live in injected expiring
//! stores and are consumed (deleted) on success so they cannot be replayed.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::config::VerificationConfig;
use crate::domain::user::{
    validate_email, validate_password, validate_username, NewUser, Profile, ProfileUpdate,
    UserRepository, UserSummary, DEFAULT_ROLE_ID,
};
use crate::domain::DomainError;
use crate::infrastructure::email::Mailer;
use crate::infrastructure::verification::{
    generate_code, EmailChangeOtp, PasswordResetOtp, PendingSignup, VerificationStores,
};

use super::password::PasswordHasher;

/// Profile fields staged by pre-signup.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub email: String,
    pub mobile_number: String,
}

pub struct AccountService<R: UserRepository, H: PasswordHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
    mailer: Arc<dyn Mailer>,
    stores: Arc<VerificationStores>,
    signup_ttl: Duration,
    password_reset_ttl: Duration,
    email_change_ttl: Duration,
}

/// Whole minutes a code stays valid, as written into the email body.
fn ttl_minutes(ttl: Duration) -> i64 {
    ttl.num_minutes().max(1)
}

impl<R: UserRepository, H: PasswordHasher> AccountService<R, H> {
    pub fn new(
        repository: Arc<R>,
        hasher: Arc<H>,
        mailer: Arc<dyn Mailer>,
        stores: Arc<VerificationStores>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            repository,
            hasher,
            mailer,
            stores,
            signup_ttl: Duration::seconds(config.signup_ttl_secs),
            password_reset_ttl: Duration::seconds(config.password_reset_ttl_secs),
            email_change_ttl: Duration::seconds(config.email_change_ttl_secs),
        }
    }

    // -- Signup -------------------------------------------------------------

    /// Stage a signup and email a verification code. Nothing is persisted
    /// until the code is confirmed.
    pub async fn pre_signup(&self, request: SignupRequest) -> Result<(), DomainError> {
        validate_email(&request.email)?;
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        if self.repository.email_exists(&request.email).await? {
            return Err(DomainError::conflict("Email already in use"));
        }

        let code = generate_code();
        self.stores
            .signup
            .put(
                request.email.clone(),
                PendingSignup {
                    username: request.username,
                    password: request.password,
                    firstname: request.firstname,
                    lastname: request.lastname,
                    birthdate: request.birthdate,
                    gender: request.gender,
                    mobile_number: request.mobile_number,
                    code: code.clone(),
                },
                self.signup_ttl,
            )
            .await;

        self.mailer
            .send(
                &request.email,
                "Verify your RiceScan account",
                &format!(
                    "Your verification code is {code}. It expires in {} minutes.",
                    ttl_minutes(self.signup_ttl)
                ),
            )
            .await?;

        info!(email = %request.email, "signup staged, verification code sent");
        Ok(())
    }

    /// Confirm the emailed code and persist the account.
    pub async fn complete_signup(&self, email: &str, code: &str) -> Result<i64, DomainError> {
        let pending = self
            .stores
            .signup
            .get(&email.to_string())
            .await
            .ok_or_else(|| {
                DomainError::invalid_credentials("Invalid or expired verification code")
            })?;

        if pending.code != code {
            return Err(DomainError::invalid_credentials(
                "Invalid or expired verification code",
            ));
        }

        let password_hash = self.hasher.hash(&pending.password)?;
        let user_id = self
            .repository
            .create_user(&NewUser {
                username: pending.username,
                password_hash,
                role_id: DEFAULT_ROLE_ID,
                firstname: pending.firstname,
                lastname: pending.lastname,
                birthdate: pending.birthdate,
                gender: pending.gender,
                email: email.to_string(),
                mobile_number: pending.mobile_number,
            })
            .await?;

        self.stores.signup.delete(&email.to_string()).await;
        info!(user_id, "signup completed");
        Ok(user_id)
    }

    /// Refresh the code on an existing pending signup and re-send it.
    pub async fn resend_verification_code(&self, email: &str) -> Result<(), DomainError> {
        let mut pending = self
            .stores
            .signup
            .get(&email.to_string())
            .await
            .ok_or_else(|| DomainError::validation("No pending signup for this email"))?;

        pending.code = generate_code();
        let code = pending.code.clone();
        self.stores
            .signup
            .put(email.to_string(), pending, self.signup_ttl)
            .await;

        self.mailer
            .send(
                email,
                "Verify your RiceScan account",
                &format!(
                    "Your verification code is {code}. It expires in {} minutes.",
                    ttl_minutes(self.signup_ttl)
                ),
            )
            .await
    }

    // -- Login --------------------------------------------------------------

    /// Authenticate by username or email. Unknown identifier and wrong
    /// password produce the same error.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<UserSummary, DomainError> {
        let credentials = self
            .repository
            .find_credentials(identifier)
            .await?
            .ok_or_else(|| DomainError::invalid_credentials("Invalid credentials"))?;

        if !self.hasher.verify(password, &credentials.password_hash) {
            return Err(DomainError::invalid_credentials("Invalid credentials"));
        }

        info!(user_id = credentials.user_id, "login succeeded");
        Ok(UserSummary {
            user_id: credentials.user_id,
            username: credentials.username,
            email: credentials.email,
            role_id: credentials.role_id,
        })
    }

    // -- Password reset -----------------------------------------------------

    /// Stage a password-reset OTP for a known email and mail it.
    pub async fn forgot_password(&self, email: &str) -> Result<(), DomainError> {
        let user_id = self
            .repository
            .find_user_id_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found("No account with this email"))?;

        let code = generate_code();
        self.stores
            .password_reset
            .put(
                email.to_string(),
                PasswordResetOtp {
                    user_id,
                    code: code.clone(),
                },
                self.password_reset_ttl,
            )
            .await;

        self.mailer
            .send(
                email,
                "RiceScan password reset",
                &format!(
                    "Your password reset code is {code}. It expires in {} minutes.",
                    ttl_minutes(self.password_reset_ttl)
                ),
            )
            .await?;

        info!(user_id, "password reset OTP sent");
        Ok(())
    }

    /// Check a reset OTP. Success returns the user id for the client to
    /// carry into reset-password; the record stays until the reset consumes
    /// it. An expired record is removed by the store on read.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<i64, DomainError> {
        let record = self
            .stores
            .password_reset
            .get(&email.to_string())
            .await
            .ok_or_else(|| DomainError::invalid_credentials("No OTP request found"))?;

        if record.code != otp {
            return Err(DomainError::invalid_credentials("Invalid OTP"));
        }

        Ok(record.user_id)
    }

    /// Update the password for the account behind `email`. Re-resolves the
    /// user independently of verify-otp (client-orchestrated two-step) and
    /// consumes any outstanding OTP on success.
    pub async fn reset_password(&self, email: &str, new_password: &str) -> Result<(), DomainError> {
        validate_password(new_password)?;

        let user_id = self
            .repository
            .find_user_id_by_email(email)
            .await?
            .ok_or_else(|| DomainError::not_found("No account with this email"))?;

        let password_hash = self.hasher.hash(new_password)?;
        self.repository
            .update_password(user_id, &password_hash)
            .await?;

        self.stores.password_reset.delete(&email.to_string()).await;
        info!(user_id, "password reset completed");
        Ok(())
    }

    /// Authenticated password change: current password re-asserted in-band.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let credentials = self
            .repository
            .find_credentials_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if !self.hasher.verify(current_password, &credentials.password_hash) {
            return Err(DomainError::unauthorized("Current password is incorrect"));
        }

        validate_password(new_password)?;
        let password_hash = self.hasher.hash(new_password)?;
        self.repository
            .update_password(user_id, &password_hash)
            .await?;

        info!(user_id, "password changed");
        Ok(())
    }

    // -- Email change -------------------------------------------------------

    /// Start an email change: re-assert the password, stage an OTP keyed by
    /// user id, and mail it to the new address to prove control of it.
    pub async fn verify_email_change(
        &self,
        user_id: i64,
        password: &str,
        new_email: &str,
    ) -> Result<(), DomainError> {
        validate_email(new_email)?;

        let credentials = self
            .repository
            .find_credentials_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if !self.hasher.verify(password, &credentials.password_hash) {
            return Err(DomainError::unauthorized("Password is incorrect"));
        }

        if self
            .repository
            .email_in_use_by_other(new_email, user_id)
            .await?
        {
            return Err(DomainError::validation("Email already in use"));
        }

        let code = generate_code();
        self.stores
            .email_change
            .put(
                user_id,
                EmailChangeOtp {
                    new_email: new_email.to_string(),
                    code: code.clone(),
                },
                self.email_change_ttl,
            )
            .await;

        self.mailer
            .send(
                new_email,
                "Confirm your new RiceScan email",
                &format!(
                    "Your email change code is {code}. It expires in {} minutes.",
                    ttl_minutes(self.email_change_ttl)
                ),
            )
            .await?;

        info!(user_id, "email change OTP sent");
        Ok(())
    }

    /// Confirm the OTP and apply the staged email. The record is consumed;
    /// a replay of the same code fails.
    pub async fn confirm_email_change(&self, user_id: i64, otp: &str) -> Result<(), DomainError> {
        let record = self
            .stores
            .email_change
            .get(&user_id)
            .await
            .ok_or_else(|| DomainError::invalid_credentials("No OTP request found"))?;

        if record.code != otp {
            return Err(DomainError::invalid_credentials("Invalid OTP"));
        }

        let updated = self
            .repository
            .update_email(user_id, &record.new_email)
            .await?;
        if !updated {
            return Err(DomainError::not_found("User not found"));
        }

        self.stores.email_change.delete(&user_id).await;
        info!(user_id, "email changed");
        Ok(())
    }

    // -- Profile ------------------------------------------------------------

    pub async fn get_profile(&self, user_id: i64) -> Result<Profile, DomainError> {
        self.repository
            .get_profile(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Profile not found"))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<(), DomainError> {
        let updated = self.repository.update_profile(user_id, &update).await?;
        if !updated {
            return Err(DomainError::not_found("Profile not found"));
        }
        Ok(())
    }

    pub async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<(), DomainError> {
        let updated = self.repository.set_profile_image(user_id, url).await?;
        if !updated {
            return Err(DomainError::not_found("Profile not found"));
        }
        Ok(())
    }
}
