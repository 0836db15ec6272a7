//! Application state - shared across all handlers.

use std::sync::Arc;

use blogicum_core::BlogService;
use blogicum_core::ports::{Clock, SystemClock};
use blogicum_infra::{DatabaseConfig, InMemoryStore, in_memory_repositories};

#[cfg(feature = "postgres")]
use blogicum_infra::{DatabaseConnections, postgres_repositories};

/// Which store backs the running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    InMemory,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::InMemory => "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlogService>,
    pub storage: Storage,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

impl AppState {
    /// Connect to PostgreSQL when configured, falling back to the in-memory store.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> Self {
        let state = match db_config {
            Some(config) => Self::connect(config).await,
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                None
            }
        };

        let state = state.unwrap_or_else(|| Self::in_memory(Arc::new(SystemClock)));
        tracing::info!(storage = state.storage.as_str(), "Application state initialized");
        state
    }

    /// State over a fresh in-memory store. Data is lost on restart.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        let repos = in_memory_repositories(Arc::new(InMemoryStore::new()));
        Self {
            service: Arc::new(BlogService::new(repos, clock)),
            storage: Storage::InMemory,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }

    #[cfg(feature = "postgres")]
    async fn connect(config: &DatabaseConfig) -> Option<Self> {
        match DatabaseConnections::init(config).await {
            Ok(connections) => {
                let conn = Arc::new(connections);
                let repos = postgres_repositories(conn.main.clone());
                Some(Self {
                    service: Arc::new(BlogService::new(repos, Arc::new(SystemClock))),
                    storage: Storage::Postgres,
                    db: Some(conn),
                })
            }
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                None
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(_config: &DatabaseConfig) -> Option<Self> {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
        None
    }

    /// Whether the backing store answers. The in-memory store always does.
    pub async fn storage_healthy(&self) -> bool {
        #[cfg(feature = "postgres")]
        {
            if let Some(db) = &self.db {
                return db.ping().await;
            }
        }
        true
    }
}
