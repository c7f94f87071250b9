//! Cache en Redis
//!
//! Guarda la última posición de cada chofer con TTL. Los errores de lectura
//! se tratan como un MISS: el historial del almacén sigue siendo la fuente
//! de respaldo.

use anyhow::{Context, Result};
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info, warn};

use super::{CacheConfig, CacheOperations};

#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Conectar y verificar con un PING
    pub async fn new(config: CacheConfig) -> Result<Self> {
        info!("🔗 Conectando a Redis (prefijo '{}')", config.key_prefix);

        let client = redis::Client::open(config.redis_url.as_str()).context("URL de Redis inválida")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("No se pudo abrir la conexión a Redis")?;

        let mut conn = manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("✅ Redis conectado ({})", pong);

        Ok(Self { manager, config })
    }

    fn effective_ttl(&self, ttl: u64) -> u64 {
        ttl_or_default(ttl, self.config.default_ttl)
    }
}

/// Un TTL de 0 usa el de la configuración
fn ttl_or_default(ttl: u64, default_ttl: u64) -> u64 {
    if ttl == 0 {
        default_ttl
    } else {
        ttl
    }
}

#[async_trait::async_trait]
impl CacheOperations for RedisClient {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Lectura de {} falló, se trata como MISS: {}", key, e);
                None
            }
        };

        debug!("📥 {} {}", if value.is_some() { "HIT" } else { "MISS" }, key);
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()> {
        let mut conn = self.manager.clone();
        let ttl = self.effective_ttl(ttl);

        conn.set_ex::<_, _, ()>(key, value, ttl)
            .await
            .with_context(|| format!("No se pudo guardar {} en Redis", key))?;

        debug!("💾 SET {} (TTL {}s)", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let removed: i64 = conn
            .del(key)
            .await
            .with_context(|| format!("No se pudo eliminar {} de Redis", key))?;

        debug!("🗑️ DEL {} ({})", key, removed);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.manager.clone();
        matches!(
            redis::cmd("PING").query_async::<_, String>(&mut conn).await.as_deref(),
            Ok("PONG")
        )
    }
}
