use crate::discovery::error::StoreError;
use crate::discovery::store::CacheStore;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, Script};

/// Sets the flag unless another caller already holds it, in one server-side step.
const ACQUIRE_FLAG_SCRIPT: &str = r"
    local current = redis.call('GET', KEYS[1])
    if current == false or current == 'false' then
        redis.call('SET', KEYS[1], 'true')
        return 1
    end
    return 0
";

/// [`CacheStore`] backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|e| StoreError::Connection(redis_url.to_string(), e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(redis_url.to_string(), e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn acquire_flag(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let acquired: i64 = Script::new(ACQUIRE_FLAG_SCRIPT)
            .key(key)
            .invoke_async(&mut conn)
            .await?;
        Ok(acquired == 1)
    }
}
