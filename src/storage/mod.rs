use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::client::api::ApiClient;
use crate::client::ClientError;
use crate::placement::PlacedBet;
use crate::slip::Slip;
use crate::types::{PostgresConfig, RemoteBackend, RemoteConfig};

pub mod memory;
pub mod models;
pub mod recorder;
pub mod state;

pub use memory::MemoryStore;
pub use state::RedisStateManager;

pub type PgPool = Pool<Postgres>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote copy of a user's active slip.
#[async_trait]
pub trait RemoteSlipStore: Send + Sync {
    async fn read(&self, user_id: &str) -> StoreResult<Option<Slip>>;

    async fn write(&self, user_id: &str, slip: &Slip) -> StoreResult<()>;
}

/// Remote collection of a user's placed ("active") bets.
#[async_trait]
pub trait PlacedBetsStore: Send + Sync {
    async fn append(&self, user_id: &str, bet: &PlacedBet) -> StoreResult<()>;

    async fn list(&self, user_id: &str) -> StoreResult<Vec<PlacedBet>>;
}

/// Both collaborators backed by the configured backend.
#[derive(Clone)]
pub struct Remotes {
    pub slips: Arc<dyn RemoteSlipStore>,
    pub bets: Arc<dyn PlacedBetsStore>,
}

impl Remotes {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: RemoteSlipStore + PlacedBetsStore + 'static,
    {
        Self {
            slips: store.clone(),
            bets: store,
        }
    }
}

/// Connect the remote stores selected in config.
pub async fn connect_remotes(cfg: &RemoteConfig) -> anyhow::Result<Remotes> {
    let remotes = match cfg.backend {
        RemoteBackend::Redis => {
            let url = cfg
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("remote.redis_url is required for the redis backend"))?;
            Remotes::from_store(Arc::new(RedisStateManager::new(url).await?))
        }
        RemoteBackend::Http => {
            let base = cfg.api_base_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("remote.api_base_url is required for the http backend")
            })?;
            Remotes::from_store(Arc::new(ApiClient::new(base, cfg.timeout())?))
        }
        RemoteBackend::Memory => Remotes::from_store(Arc::new(MemoryStore::default())),
    };
    Ok(remotes)
}

/// Create a PostgreSQL connection pool for the placement audit trail.
///
/// Connection establishment is performed eagerly so misconfiguration is
/// surfaced at startup.
pub async fn create_pg_pool(cfg: &PostgresConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(15))
        .connect(&cfg.url)
        .await?;
    Ok(pool)
}
