use async_trait::async_trait;
use chrono::Duration;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::fmt;

use crate::domain::auth::entities::SessionRecord;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::ports::SessionRepository;
use crate::domain::auth::value_objects::SessionId;

/// Session repository storing each session as JSON under `{prefix}{id}`.
///
/// Expiry is left to Redis (`SET .. EX ttl`).
#[derive(Clone)]
pub struct RedisSessionRepository {
  conn: ConnectionManager,
  key_prefix: String,
}

impl fmt::Debug for RedisSessionRepository {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RedisSessionRepository")
      .field("connection", &"ConnectionManager")
      .field("key_prefix", &self.key_prefix)
      .finish()
  }
}

impl RedisSessionRepository {
  pub fn new(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
    Self {
      conn,
      key_prefix: key_prefix.into(),
    }
  }

  fn key(&self, id: &SessionId) -> String {
    format!("{}{}", self.key_prefix, id.as_str())
  }
}

#[async_trait]
impl SessionRepository for RedisSessionRepository {
  async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, AuthError> {
    let mut conn = self.conn.clone();
    let data: Option<String> = conn.get(self.key(id)).await?;

    let Some(json) = data else {
      return Ok(None);
    };

    match serde_json::from_str(&json) {
      Ok(record) => Ok(Some(record)),
      Err(e) => {
        tracing::warn!("Discarding unreadable session payload: {}", e);
        Ok(None)
      }
    }
  }

  async fn save(&self, record: &SessionRecord, ttl: Duration) -> Result<(), AuthError> {
    let json = serde_json::to_string(record)?;
    let seconds = ttl.num_seconds().max(1) as u64;

    let mut conn = self.conn.clone();
    conn
      .set_ex::<_, _, ()>(self.key(&record.id), json, seconds)
      .await
      .map_err(|e| {
        tracing::error!("Failed to store session: {}", e);
        AuthError::from(e)
      })?;

    Ok(())
  }

  async fn destroy(&self, id: &SessionId) -> Result<(), AuthError> {
    let mut conn = self.conn.clone();
    conn.del::<_, ()>(self.key(id)).await?;
    Ok(())
  }
}
