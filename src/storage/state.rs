use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::placement::PlacedBet;
use crate::slip::Slip;
use crate::storage::{PlacedBetsStore, RemoteSlipStore, StoreResult};

/// Slip and placed-bet persistence in Redis.
///
/// The active slip lives at `betslip:{user_id}:active` as one JSON document;
/// placed bets are a Redis list at `bets:{user_id}`, one JSON record per entry,
/// oldest first.
#[derive(Clone)]
pub struct RedisStateManager {
    conn: ConnectionManager,
}

impl RedisStateManager {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub fn slip_key(user_id: &str) -> String {
        format!("betslip:{user_id}:active")
    }

    pub fn bets_key(user_id: &str) -> String {
        format!("bets:{user_id}")
    }
}

#[async_trait]
impl RemoteSlipStore for RedisStateManager {
    async fn read(&self, user_id: &str) -> StoreResult<Option<Slip>> {
        let mut conn = self.conn.clone();
        let v: Option<String> = conn.get(Self::slip_key(user_id)).await?;
        match v {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, user_id: &str, slip: &Slip) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let val = serde_json::to_string(slip)?;
        let _: () = conn.set(Self::slip_key(user_id), val).await?;
        Ok(())
    }
}

#[async_trait]
impl PlacedBetsStore for RedisStateManager {
    async fn append(&self, user_id: &str, bet: &PlacedBet) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let val = serde_json::to_string(bet)?;
        let _: () = conn.rpush(Self::bets_key(user_id), val).await?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> StoreResult<Vec<PlacedBet>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(Self::bets_key(user_id), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Into::into))
            .collect()
    }
}
