use crate::domain_model::{RefreshToken, Subject};
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, FromRedisValue, RedisResult, RedisWrite, ToRedisArgs, Value};
use std::future::Future;
use std::time::Duration;

const REVOKED_MARKER: &str = "revoked";

pub struct RedisRevocationStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, timeout: Duration) -> Self {
        RedisRevocationStore {
            conn,
            prefix: prefix.into(),
            timeout,
        }
    }

    fn key(&self, key: &StoreKey) -> String {
        prefixed_key(&self.prefix, key)
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, StoreError> {
        bounded(self.timeout, op).await
    }
}

fn prefixed_key(prefix: &str, key: &StoreKey) -> String {
    format!("{}:{}", prefix, key)
}

/// Run one round-trip under the store timeout. A timeout is a store fault
/// like any other; a reply of the wrong shape means the record is corrupt.
async fn bounded<T>(
    timeout: Duration,
    op: impl Future<Output = RedisResult<T>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result.map_err(|e| match e.kind() {
            redis::ErrorKind::TypeError => StoreError::Corrupt(e.to_string()),
            _ => StoreError::Unavailable(e.to_string()),
        }),
        Err(_) => Err(StoreError::Unavailable(format!(
            "no reply within {:?}",
            timeout
        ))),
    }
}

impl ToRedisArgs for RefreshToken {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.as_str().as_bytes())
    }
}

impl FromRedisValue for RefreshToken {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        Ok(RefreshToken(s))
    }
}

#[async_trait::async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn mark_revoked(&self, key: &StoreKey, ttl_secs: u64) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(conn.set_ex(&key, REVOKED_MARKER, ttl_secs.max(1)))
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, key: &StoreKey) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let found: bool = self.bounded(conn.exists(&key)).await?;
        Ok(found)
    }

    async fn set_current_refresh(
        &self,
        subject: &Subject,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let key = self.key(&StoreKey::current_refresh(subject));
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(conn.set_ex(&key, token, ttl_secs.max(1)))
            .await?;
        Ok(())
    }

    async fn get_current_refresh(
        &self,
        subject: &Subject,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let key = self.key(&StoreKey::current_refresh(subject));
        let mut conn = self.conn.clone();
        let val: Option<RefreshToken> = self.bounded(conn.get(&key)).await?;
        Ok(val)
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.del(&key)).await?;
        Ok(())
    }
}
