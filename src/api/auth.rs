//! Account endpoint handlers: signup, login, password reset, and email
//! change.

use axum::http::StatusCode;
use axum::{extract::State, response::IntoResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::UserSummary;
use crate::infrastructure::user::SignupRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSignupBody {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub email: String,
    pub mobile_number: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSignupResponse {
    pub message: String,
    pub email: String,
}

/// POST /pre-signup
pub async fn pre_signup(
    State(state): State<AppState>,
    Json(body): Json<PreSignupBody>,
) -> Result<Json<PreSignupResponse>, ApiError> {
    let email = body.email.clone();
    state
        .accounts
        .pre_signup(SignupRequest {
            username: body.username,
            password: body.password,
            firstname: body.firstname,
            lastname: body.lastname,
            birthdate: body.birthdate,
            gender: body.gender,
            email: body.email,
            mobile_number: body.mobile_number,
        })
        .await?;

    Ok(Json(PreSignupResponse {
        message: "Verification code sent".to_string(),
        email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteSignupBody {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignupResponse {
    pub message: String,
    pub user_id: i64,
}

/// POST /complete-signup
pub async fn complete_signup(
    State(state): State<AppState>,
    Json(body): Json<CompleteSignupBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = state
        .accounts
        .complete_signup(&body.email, &body.code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CompleteSignupResponse {
            message: "Account created".to_string(),
            user_id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// POST /resend-verification-code
pub async fn resend_verification_code(
    State(state): State<AppState>,
    Json(body): Json<EmailBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .resend_verification_code(&body.email)
        .await?;
    Ok(Json(MessageResponse::new("Verification code re-sent")))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!(identifier = %body.identifier, "login attempt");
    let user = state.accounts.login(&body.identifier, &body.password).await?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
    }))
}

/// POST /forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.accounts.forgot_password(&body.email).await?;
    Ok(Json(MessageResponse::new("OTP sent")))
}

/// POST /resend-password-otp
///
/// Same effect as forgot-password: a fresh OTP replaces any outstanding one.
pub async fn resend_password_otp(
    State(state): State<AppState>,
    Json(body): Json<EmailBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.accounts.forgot_password(&body.email).await?;
    Ok(Json(MessageResponse::new("OTP re-sent")))
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub email: String,
    pub otp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user_id: i64,
}

/// POST /verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let user_id = state.accounts.verify_otp(&body.email, &body.otp).await?;

    Ok(Json(VerifyOtpResponse {
        message: "OTP verified".to_string(),
        user_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    pub email: String,
    pub new_password: String,
}

/// POST /reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .reset_password(&body.email, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successful")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub user_id: i64,
    pub current_password: String,
    pub new_password: String,
}

/// POST /change-password
pub async fn change_password(
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .change_password(body.user_id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password changed")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailChangeBody {
    pub user_id: i64,
    pub password: String,
    pub new_email: String,
}

/// POST /verify-email-change
pub async fn verify_email_change(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailChangeBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .verify_email_change(body.user_id, &body.password, &body.new_email)
        .await?;
    Ok(Json(MessageResponse::new("OTP sent to new email")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailChangeBody {
    pub user_id: i64,
    pub otp: String,
}

/// POST /confirm-email-change
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Json(body): Json<ConfirmEmailChangeBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .confirm_email_change(body.user_id, &body.otp)
        .await?;
    Ok(Json(MessageResponse::new("Email updated")))
}
