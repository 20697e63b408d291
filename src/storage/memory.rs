//! In-memory storage implementation for testing.

use anyhow::Result;
use tokio::sync::Mutex;

use super::PortfolioStorage;
use crate::models::Holding;

/// In-memory storage for testing purposes.
#[derive(Default)]
pub struct MemoryStorage {
    holdings: Mutex<Vec<Holding>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a pre-existing snapshot.
    pub fn with_initial(holdings: Vec<Holding>) -> Self {
        Self {
            holdings: Mutex::new(holdings),
        }
    }
}

#[async_trait::async_trait]
impl PortfolioStorage for MemoryStorage {
    async fn load_all(&self) -> Result<Vec<Holding>> {
        Ok(self.holdings.lock().await.clone())
    }

    async fn save_all(&self, holdings: &[Holding]) -> Result<()> {
        *self.holdings.lock().await = holdings.to_vec();
        Ok(())
    }
}
