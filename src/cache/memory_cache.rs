//! Cache en memoria
//!
//! Se usa cuando no hay `REDIS_URL` configurado y en las pruebas.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::CacheOperations;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    default_ttl: u64,
}

impl MemoryCache {
    pub fn new(default_ttl: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Limpiar entradas expiradas
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Barrido periódico de entradas expiradas
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = cache.cleanup_expired().await;
                if removed > 0 {
                    debug!("🧹 {} entradas expiradas eliminadas del cache en memoria", removed);
                }
            }
        })
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[async_trait::async_trait]
impl CacheOperations for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expirada: se elimina al leerla
        let mut entries = self.entries.write().await;
        if entries.get(key).map_or(false, |e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()> {
        let ttl = if ttl == 0 { self.default_ttl } else { ttl };
        let entry = Entry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    async fn ping(&self) -> bool {
        true
    }
}
