use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::auth::{
  entities::{StaffRole, User},
  errors::{AuthError, RepositoryError},
  ports::{PasswordHasher, UserProvider},
  value_objects::{Credentials, Email, PasswordHash, RememberToken, UserId},
};

/// PostgreSQL implementation of the UserProvider trait over `staff_users`
pub struct PostgresUserProvider {
  pool: PgPool,
  hasher: Arc<dyn PasswordHasher>,
}

impl PostgresUserProvider {
  /// Creates a new instance of PostgresUserProvider
  pub fn new(pool: PgPool, hasher: Arc<dyn PasswordHasher>) -> Self {
    Self { pool, hasher }
  }

  /// Inserts a staff account; the password must already be hashed
  pub async fn create(
    &self,
    email: &Email,
    full_name: &str,
    role: StaffRole,
    password_hash: &PasswordHash,
  ) -> Result<User, AuthError> {
    let row = sqlx::query_as::<_, StaffUserRow>(
      r#"
            INSERT INTO staff_users (email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, role, created_at
            "#,
    )
    .bind(email.as_str())
    .bind(full_name)
    .bind(role.as_str())
    .bind(password_hash.as_str())
    .fetch_one(&self.pool)
    .await?;

    row.try_into()
  }

  async fn password_hash(&self, id: UserId) -> Result<Option<PasswordHash>, AuthError> {
    let hash: Option<String> =
      sqlx::query_scalar(r#"SELECT password_hash FROM staff_users WHERE id = $1"#)
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

    hash
      .map(|hash| PasswordHash::from_hash(hash).map_err(AuthError::from))
      .transpose()
  }
}

/// Database row structure for the staff_users table, without secrets
#[derive(Debug, sqlx::FromRow)]
struct StaffUserRow {
  id: i64,
  email: String,
  full_name: String,
  role: String,
  created_at: DateTime<Utc>,
}

impl TryFrom<StaffUserRow> for User {
  type Error = AuthError;

  fn try_from(row: StaffUserRow) -> Result<Self, Self::Error> {
    let role = row.role.parse::<StaffRole>().map_err(|e| {
      tracing::error!("Staff user {} has an unknown role: {}", row.id, e);
      AuthError::Repository(RepositoryError::DatabaseError(e.to_string()))
    })?;

    Ok(User::from_db(
      UserId::new(row.id)?,
      row.email,
      row.full_name,
      role,
      row.created_at,
    ))
  }
}

fn into_user(row: Option<StaffUserRow>) -> Result<Option<User>, AuthError> {
  row.map(User::try_from).transpose()
}

#[async_trait]
impl UserProvider for PostgresUserProvider {
  async fn retrieve_by_id(&self, id: UserId) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, StaffUserRow>(
      r#"
            SELECT id, email, full_name, role, created_at
            FROM staff_users
            WHERE id = $1
            "#,
    )
    .bind(id.value())
    .fetch_optional(&self.pool)
    .await?;

    into_user(row)
  }

  async fn retrieve_by_token(
    &self,
    id: UserId,
    token: &RememberToken,
  ) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, StaffUserRow>(
      r#"
            SELECT id, email, full_name, role, created_at
            FROM staff_users
            WHERE id = $1 AND remember_token_hash = $2
            "#,
    )
    .bind(id.value())
    .bind(token.hash().as_str())
    .fetch_optional(&self.pool)
    .await?;

    into_user(row)
  }

  async fn update_remember_token(
    &self,
    id: UserId,
    token: &RememberToken,
  ) -> Result<(), AuthError> {
    sqlx::query(
      r#"
            UPDATE staff_users
            SET remember_token_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
    )
    .bind(id.value())
    .bind(token.hash().as_str())
    .execute(&self.pool)
    .await
    .map_err(|e| {
      tracing::error!("Failed to update remember token for user {}: {}", id, e);
      AuthError::from(e)
    })?;

    Ok(())
  }

  async fn retrieve_by_credentials(
    &self,
    credentials: &Credentials,
  ) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, StaffUserRow>(
      r#"
            SELECT id, email, full_name, role, created_at
            FROM staff_users
            WHERE LOWER(email) = $1
            "#,
    )
    .bind(credentials.email.as_str())
    .fetch_optional(&self.pool)
    .await?;

    into_user(row)
  }

  async fn validate_credentials(
    &self,
    user: &User,
    credentials: &Credentials,
  ) -> Result<bool, AuthError> {
    let Some(hash) = self.password_hash(user.id).await? else {
      return Ok(false);
    };

    self.hasher.verify(&credentials.password, &hash).await
  }
}
