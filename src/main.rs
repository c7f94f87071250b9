use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use dotenvy::dotenv;

use ice_delivery_routing::{
    build_app,
    cache::{CacheConfig, CacheOperations, MemoryCache, RedisClient},
    config::{
        database::{mask_database_url, run_migrations, DatabaseConfig},
        EnvironmentConfig,
    },
    repositories::{DeliveryStore, MemoryDeliveryStore, PgDeliveryStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    let level = config.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🧊 Ice Delivery Routing - API de optimización de rutas");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);

    let store = init_store(&config).await?;
    let cache = init_cache(&config).await;

    let addr: SocketAddr = config.server_url().parse()?;
    let app_state = AppState::new(config, store, cache)?;
    let app = build_app(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   GET  /metrics - Métricas Prometheus");
    info!("   POST /api/auth/login - Login");
    info!("🚚 Rutas:");
    info!("   POST  /api/routes/optimize - Optimizar rutas de una ubicación");
    info!("   GET   /api/routes - Listar rutas");
    info!("   GET   /api/routes/:id - Detalle de ruta");
    info!("   GET   /api/routes/:id/progress - Progreso de ruta");
    info!("   PATCH /api/routes/:id/status - Cambiar estado");
    info!("   POST  /api/routes/:id/stops/:stop_id/complete - Completar parada");
    info!("   GET   /api/routes/:id/waypoints - Puntos de paso para el mapa");
    info!("📍 Choferes:");
    info!("   POST /api/drivers/:id/location - Reportar posición");
    info!("   GET  /api/drivers/:id/location - Última posición");
    info!("📦 Pedidos:");
    info!("   POST /api/orders - Crear pedido");
    info!("   GET  /api/orders - Listar pedidos");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// PostgreSQL si hay `DATABASE_URL`, si no el almacén en memoria
async fn init_store(config: &EnvironmentConfig) -> Result<Arc<dyn DeliveryStore>> {
    match &config.database_url {
        Some(url) => {
            info!("🗄️ Conectando a PostgreSQL: {}", mask_database_url(url));
            let pool = DatabaseConfig::new(url.clone()).create_pool().await.map_err(|e| {
                error!("❌ Error conectando a la base de datos: {}", e);
                anyhow::anyhow!("Error de base de datos: {}", e)
            })?;
            run_migrations(&pool).await?;
            info!("✅ Migraciones aplicadas");
            Ok(Arc::new(PgDeliveryStore::new(pool)))
        }
        None => {
            warn!("⚠️ DATABASE_URL no configurado, usando almacén en memoria con datos de demostración");
            let store = MemoryDeliveryStore::new();
            let password_hash = match &config.demo_password {
                Some(password) => Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?),
                None => None,
            };
            store.seed_demo_data(password_hash.as_deref()).await;
            Ok(Arc::new(store))
        }
    }
}

/// Redis si hay `REDIS_URL` y responde, si no cache en memoria
async fn init_cache(config: &EnvironmentConfig) -> Arc<dyn CacheOperations> {
    if let Some(redis_url) = &config.redis_url {
        let cache_config = CacheConfig {
            redis_url: redis_url.clone(),
            default_ttl: config.driver_location_ttl,
            key_prefix: config.cache_key_prefix.clone(),
        };
        match RedisClient::new(cache_config).await {
            Ok(client) => return Arc::new(client),
            Err(e) => error!("❌ Error conectando a Redis, se usa cache en memoria: {}", e),
        }
    }

    let cache = MemoryCache::new(config.driver_location_ttl);
    cache.spawn_cleanup(Duration::from_secs(60));
    Arc::new(cache)
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
