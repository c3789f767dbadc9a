//! SQL user repository issuing parameterized statements through the query
//! executor. This is the only persistence path: no workflow ever holds a
//! pooled connection beyond a single statement.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::user::{Credentials, NewUser, Profile, ProfileUpdate, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::db::{QueryExecutor, SqlRow, SqlValue};

pub struct SqlUserRepository {
    executor: Arc<QueryExecutor>,
}

impl SqlUserRepository {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }
}

fn row_to_credentials(row: &SqlRow) -> Result<Credentials, DomainError> {
    Ok(Credentials {
        user_id: row[0].as_int()?,
        username: row[1].as_text()?.to_string(),
        password_hash: row[2].as_text()?.to_string(),
        role_id: row[3].as_int()? as i32,
        email: row[4].as_text()?.to_string(),
    })
}

fn row_to_profile(row: &SqlRow) -> Result<Profile, DomainError> {
    Ok(Profile {
        user_id: row[0].as_int()?,
        firstname: row[1].as_text()?.to_string(),
        lastname: row[2].as_text()?.to_string(),
        birthdate: row[3].as_date()?,
        gender: row[4].as_text()?.to_string(),
        email: row[5].as_text()?.to_string(),
        mobile_number: row[6].as_text()?.to_string(),
        profile_image_url: row[7].as_opt_text()?.map(str::to_string),
    })
}

const CREDENTIALS_COLUMNS: &str =
    "u.user_id, u.username, u.password, u.role_id, p.email";

/// Postgres reports unique-constraint violations as class 23505 query
/// errors; the message is stable enough to branch on here.
fn is_unique_violation(error: &crate::infrastructure::db::QueryError) -> bool {
    matches!(
        error,
        crate::infrastructure::db::QueryError::Driver(d)
            if !d.is_terminal() && d.to_string().contains("duplicate key")
    )
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        let result = self
            .executor
            .execute(
                "SELECT 1 FROM user_profiles WHERE email = $1",
                &[SqlValue::Text(email.to_string())],
            )
            .await?;
        Ok(!result.is_empty())
    }

    async fn email_in_use_by_other(
        &self,
        email: &str,
        user_id: i64,
    ) -> Result<bool, DomainError> {
        let result = self
            .executor
            .execute(
                "SELECT 1 FROM user_profiles WHERE email = $1 AND user_id <> $2",
                &[
                    SqlValue::Text(email.to_string()),
                    SqlValue::Int(user_id),
                ],
            )
            .await?;
        Ok(!result.is_empty())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<i64, DomainError> {
        // Credentials and profile land in one statement: the data-modifying
        // CTE makes the pair atomic, so either both rows exist or neither.
        let result = self
            .executor
            .execute(
                r#"
                WITH creds AS (
                    INSERT INTO users (username, password, role_id)
                    VALUES ($1, $2, $3)
                    RETURNING user_id
                )
                INSERT INTO user_profiles
                    (user_id, firstname, lastname, birthdate, gender, email, mobile_number)
                SELECT user_id, $4, $5, $6, $7, $8, $9 FROM creds
                RETURNING user_id
                "#,
                &[
                    SqlValue::Text(new_user.username.clone()),
                    SqlValue::Text(new_user.password_hash.clone()),
                    SqlValue::Int(new_user.role_id.into()),
                    SqlValue::Text(new_user.firstname.clone()),
                    SqlValue::Text(new_user.lastname.clone()),
                    SqlValue::Date(new_user.birthdate),
                    SqlValue::Text(new_user.gender.clone()),
                    SqlValue::Text(new_user.email.clone()),
                    SqlValue::Text(new_user.mobile_number.clone()),
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict("Email or username already in use")
                } else {
                    e.into()
                }
            })?;

        let row = result
            .first()
            .ok_or_else(|| DomainError::internal("Insert returned no user id"))?;
        Ok(row[0].as_int()?)
    }

    async fn find_credentials(&self, identifier: &str) -> Result<Option<Credentials>, DomainError> {
        let result = self
            .executor
            .execute(
                &format!(
                    "SELECT {CREDENTIALS_COLUMNS}
                     FROM users u
                     JOIN user_profiles p ON p.user_id = u.user_id
                     WHERE u.username = $1 OR p.email = $1"
                ),
                &[SqlValue::Text(identifier.to_string())],
            )
            .await?;

        result.first().map(row_to_credentials).transpose()
    }

    async fn find_credentials_by_id(
        &self,
        user_id: i64,
    ) -> Result<Option<Credentials>, DomainError> {
        let result = self
            .executor
            .execute(
                &format!(
                    "SELECT {CREDENTIALS_COLUMNS}
                     FROM users u
                     JOIN user_profiles p ON p.user_id = u.user_id
                     WHERE u.user_id = $1"
                ),
                &[SqlValue::Int(user_id)],
            )
            .await?;

        result.first().map(row_to_credentials).transpose()
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<i64>, DomainError> {
        let result = self
            .executor
            .execute(
                "SELECT user_id FROM user_profiles WHERE email = $1",
                &[SqlValue::Text(email.to_string())],
            )
            .await?;

        match result.first() {
            Some(row) => Ok(Some(row[0].as_int()?)),
            None => Ok(None),
        }
    }

    async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<bool, DomainError> {
        let result = self
            .executor
            .execute(
                "UPDATE users SET password = $2 WHERE user_id = $1 RETURNING user_id",
                &[
                    SqlValue::Int(user_id),
                    SqlValue::Text(password_hash.to_string()),
                ],
            )
            .await?;
        Ok(!result.is_empty())
    }

    async fn update_email(&self, user_id: i64, new_email: &str) -> Result<bool, DomainError> {
        let result = self
            .executor
            .execute(
                "UPDATE user_profiles SET email = $2 WHERE user_id = $1 RETURNING user_id",
                &[
                    SqlValue::Int(user_id),
                    SqlValue::Text(new_email.to_string()),
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict("Email already in use")
                } else {
                    e.into()
                }
            })?;
        Ok(!result.is_empty())
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, DomainError> {
        let result = self
            .executor
            .execute(
                "SELECT user_id, firstname, lastname, birthdate, gender, email,
                        mobile_number, profile_image_url
                 FROM user_profiles
                 WHERE user_id = $1",
                &[SqlValue::Int(user_id)],
            )
            .await?;

        result.first().map(row_to_profile).transpose()
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<bool, DomainError> {
        if update.is_empty() {
            // Nothing to change; still report whether the user exists.
            return Ok(self.get_profile(user_id).await?.is_some());
        }

        let mut assignments = Vec::new();
        let mut params = vec![SqlValue::Int(user_id)];

        if let Some(firstname) = &update.firstname {
            params.push(SqlValue::Text(firstname.clone()));
            assignments.push(format!("firstname = ${}", params.len()));
        }
        if let Some(lastname) = &update.lastname {
            params.push(SqlValue::Text(lastname.clone()));
            assignments.push(format!("lastname = ${}", params.len()));
        }
        if let Some(birthdate) = update.birthdate {
            params.push(SqlValue::Date(birthdate));
            assignments.push(format!("birthdate = ${}", params.len()));
        }
        if let Some(gender) = &update.gender {
            params.push(SqlValue::Text(gender.clone()));
            assignments.push(format!("gender = ${}", params.len()));
        }
        if let Some(mobile_number) = &update.mobile_number {
            params.push(SqlValue::Text(mobile_number.clone()));
            assignments.push(format!("mobile_number = ${}", params.len()));
        }

        let statement = format!(
            "UPDATE user_profiles SET {} WHERE user_id = $1 RETURNING user_id",
            assignments.join(", ")
        );

        let result = self.executor.execute(&statement, &params).await?;
        Ok(!result.is_empty())
    }

    async fn set_profile_image(&self, user_id: i64, url: &str) -> Result<bool, DomainError> {
        let result = self
            .executor
            .execute(
                "UPDATE user_profiles SET profile_image_url = $2 WHERE user_id = $1
                 RETURNING user_id",
                &[SqlValue::Int(user_id), SqlValue::Text(url.to_string())],
            )
            .await?;
        Ok(!result.is_empty())
    }
}
