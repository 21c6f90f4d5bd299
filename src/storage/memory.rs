use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::placement::PlacedBet;
use crate::slip::Slip;
use crate::storage::{PlacedBetsStore, RemoteSlipStore, StoreResult};

/// Process-local stand-in for the remote stores. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slips: Mutex<HashMap<String, Slip>>,
    bets: Mutex<HashMap<String, Vec<PlacedBet>>>,
}

#[async_trait]
impl RemoteSlipStore for MemoryStore {
    async fn read(&self, user_id: &str) -> StoreResult<Option<Slip>> {
        Ok(self.slips.lock().await.get(user_id).cloned())
    }

    async fn write(&self, user_id: &str, slip: &Slip) -> StoreResult<()> {
        self.slips
            .lock()
            .await
            .insert(user_id.to_string(), slip.clone());
        Ok(())
    }
}

#[async_trait]
impl PlacedBetsStore for MemoryStore {
    async fn append(&self, user_id: &str, bet: &PlacedBet) -> StoreResult<()> {
        self.bets
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(bet.clone());
        Ok(())
    }

    async fn list(&self, user_id: &str) -> StoreResult<Vec<PlacedBet>> {
        Ok(self
            .bets
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
