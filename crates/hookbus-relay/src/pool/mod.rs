//! Redis connection pool

mod redis_pool;

pub use redis_pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
pub(crate) use redis_pool::redact_url;
