//! Cache
//!
//! Este módulo contiene los sistemas de cache: Redis en producción y un
//! cache en memoria para desarrollo y pruebas.

pub mod cache_config;
pub mod memory_cache;
pub mod redis_client;

pub use cache_config::CacheConfig;
pub use memory_cache::MemoryCache;
pub use redis_client::RedisClient;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Operaciones de cache sobre valores serializados como JSON
#[async_trait::async_trait]
pub trait CacheOperations: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn ping(&self) -> bool;
}

impl dyn CacheOperations {
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: u64) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.set_raw(key, serialized, ttl).await
    }
}

/// Clave de la última posición conocida de un chofer
pub fn driver_location_key(prefix: &str, driver_id: &str) -> String {
    format!("{}:driver_location:{}", prefix, driver_id)
}
