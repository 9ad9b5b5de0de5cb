//! The handful of Valkey commands the backend needs, behind a trait so the backend
//! logic can also run against an in-memory store.

use async_trait::async_trait;
use redis::{AsyncCommands as _, RedisResult, aio::MultiplexedConnection};

/// Minimal key/value + sorted set command surface.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `SET key value`
    async fn set(&self, key: &str, value: &str) -> RedisResult<()>;
    /// `GET key`
    async fn get(&self, key: &str) -> RedisResult<Option<String>>;
    /// `DEL key`
    async fn del(&self, key: &str) -> RedisResult<()>;
    /// `MGET keys...`, one entry per requested key in request order.
    async fn mget(&self, keys: &[String]) -> RedisResult<Vec<Option<String>>>;
    /// `ZADD index NX score member`
    async fn zadd_nx(&self, index: &str, score: i64, member: &str) -> RedisResult<()>;
    /// `ZREM index member`
    async fn zrem(&self, index: &str, member: &str) -> RedisResult<()>;
    /// `ZRANGE index 0 -1`
    async fn zrange_all(&self, index: &str) -> RedisResult<Vec<String>>;
}

/// A multiplexed connection to a Valkey (or Redis) server.
///
/// Cloning the connection is cheap and all clones share one socket.
#[derive(Clone)]
pub struct ValkeyConnection(pub(super) MultiplexedConnection);

impl ValkeyConnection {
    fn conn(&self) -> MultiplexedConnection {
        self.0.clone()
    }
}

#[async_trait]
impl KeyValueStore for ValkeyConnection {
    async fn set(&self, key: &str, value: &str) -> RedisResult<()> {
        self.conn().set(key, value).await
    }

    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        self.conn().get(key).await
    }

    async fn del(&self, key: &str) -> RedisResult<()> {
        self.conn().del(key).await
    }

    async fn mget(&self, keys: &[String]) -> RedisResult<Vec<Option<String>>> {
        // The `mget` helper sends a plain `GET` for a single key, which has a scalar reply.
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        cmd.query_async(&mut self.conn()).await
    }

    async fn zadd_nx(&self, index: &str, score: i64, member: &str) -> RedisResult<()> {
        redis::cmd("ZADD")
            .arg(index)
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut self.conn())
            .await
    }

    async fn zrem(&self, index: &str, member: &str) -> RedisResult<()> {
        self.conn().zrem(index, member).await
    }

    async fn zrange_all(&self, index: &str) -> RedisResult<Vec<String>> {
        self.conn().zrange(index, 0, -1).await
    }
}
