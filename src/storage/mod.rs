mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::Holding;

/// Storage trait for persisting the full portfolio snapshot.
///
/// The portfolio store writes through after every accepted mutation, so
/// `save_all` always receives the complete current collection.
#[async_trait::async_trait]
pub trait PortfolioStorage: Send + Sync {
    /// Load the persisted snapshot, preserving insertion order.
    ///
    /// A missing or unreadable snapshot is not an error: implementations
    /// return an empty portfolio instead of surfacing corruption to callers.
    async fn load_all(&self) -> Result<Vec<Holding>>;

    /// Overwrite the persisted snapshot with the full current collection.
    async fn save_all(&self, holdings: &[Holding]) -> Result<()>;
}
