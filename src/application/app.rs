use crate::config::{CacheBackend, Settings};
use crate::infrastructure::log_messages::{application as messages, database as db_messages};
use crate::infrastructure::PostgresCacheStore;
use crate::proxy::cache::{CacheStore, InMemoryCacheStore, TtlCache};
use crate::proxy::cache_writer::CacheWriter;
use crate::proxy::upstream::HttpFetcher;
use crate::proxy::{into_router, ProxyService};
use crate::spatial::SpatialService;
use crate::{Error, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Main application struct that coordinates all components
pub struct Application {
    settings: Settings,
    router: Router,
    writer_task: JoinHandle<()>,
    writer_shutdown: mpsc::Sender<()>,
}

impl Application {
    /// Wire the cache backend, the background writer and both services
    #[instrument(skip_all)]
    pub async fn new(settings: Settings) -> Result<Self> {
        let store = Self::cache_store(&settings).await?;

        let (writer, handle, writer_shutdown) =
            CacheWriter::new(store.clone(), settings.cache.write_queue_capacity, None);
        let writer_task = tokio::spawn(writer.run());

        let cache = TtlCache::new(store, settings.cache.ttl_hours);
        let fetcher = Arc::new(HttpFetcher::new()?);
        let proxy = Arc::new(ProxyService::new(&settings.proxy, cache, handle, fetcher));
        let spatial = Arc::new(SpatialService::new(proxy.clone(), settings.spatial.clone()));
        let router = into_router(proxy, spatial);

        Ok(Self {
            settings,
            router,
            writer_task,
            writer_shutdown,
        })
    }

    async fn cache_store(settings: &Settings) -> Result<Arc<dyn CacheStore>> {
        match settings.cache.backend {
            CacheBackend::Memory => {
                info!("{}", db_messages::USING_MEMORY);
                Ok(Arc::new(InMemoryCacheStore::new()))
            }
            CacheBackend::Postgres => {
                info!(host = %settings.database.host, "{}", db_messages::USING_POSTGRES);
                let store =
                    PostgresCacheStore::connect_lazy(&settings.database_url(), &settings.database)
                        .map_err(|e| Error::application(e.to_string()))?;
                // The cache is optional; a down database degrades to misses
                if let Err(e) = store.ensure_schema().await {
                    warn!(error = %e, "Cache table could not be prepared");
                }
                Ok(Arc::new(store))
            }
        }
    }

    /// Serve until ctrl-c, then stop the cache writer
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        let address = format!(
            "{}:{}",
            self.settings.application.host, self.settings.application.port
        );
        let listener = TcpListener::bind(&address).await?;
        info!(address = %address, "{}", messages::LISTENING);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if self.writer_shutdown.send(()).await.is_err() {
            warn!("Cache writer already stopped");
        }
        if let Err(e) = self.writer_task.await {
            warn!(error = %e, "Cache writer task failed");
        }

        info!("{}", messages::STOPPED);
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("{}", messages::SHUTDOWN_SIGNAL);
}
