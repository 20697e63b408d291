use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::warn;

use super::PortfolioStorage;
use crate::models::Holding;

/// JSON file-based storage implementation.
///
/// The whole portfolio lives in one pretty-printed JSON array at
/// `{base_path}/portfolio.json`; every save rewrites the file.
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn portfolio_file(&self) -> PathBuf {
        self.base_path.join("portfolio.json")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create data directory")?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PortfolioStorage for JsonFileStorage {
    async fn load_all(&self) -> Result<Vec<Holding>> {
        let path = self.portfolio_file();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read portfolio file"),
        };

        // A corrupt snapshot decodes to an empty portfolio rather than an
        // error; the next save overwrites it.
        match serde_json::from_str(&content) {
            Ok(holdings) => Ok(holdings),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed portfolio snapshot");
                Ok(Vec::new())
            }
        }
    }

    async fn save_all(&self, holdings: &[Holding]) -> Result<()> {
        let path = self.portfolio_file();
        self.ensure_dir(&path).await?;
        let content =
            serde_json::to_string_pretty(holdings).context("Failed to serialize portfolio")?;
        fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
