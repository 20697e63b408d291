use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use anyhow::Result;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::models::{Holding, HoldingDraft, Id, ValidHolding};
use crate::quotes::{QuoteOutcome, QuoteSource};
use crate::storage::PortfolioStorage;

use super::{PortfolioSnapshot, StatusMessage};

/// Owner of the holdings collection.
///
/// All mutations go through this type; persistence is write-through (the full
/// snapshot is saved after every accepted mutation) and refreshes commit as a
/// single state transition, so readers never observe a half-updated
/// collection.
pub struct PortfolioStore {
    quotes: Arc<dyn QuoteSource>,
    storage: Arc<dyn PortfolioStorage>,
    clock: Arc<dyn Clock>,
    holdings: RwLock<Vec<Holding>>,
    /// One retained message; the latest outcome replaces any prior one.
    message: StdMutex<Option<StatusMessage>>,
    loading: AtomicBool,
    /// Single-flight gate for refresh cycles. A second caller waits here and
    /// then runs its own cycle; two cycles never overlap.
    refresh_gate: Mutex<()>,
}

impl PortfolioStore {
    /// Open the store, loading any persisted snapshot (fail-soft: a missing
    /// or corrupt snapshot starts an empty portfolio).
    pub async fn open(
        storage: Arc<dyn PortfolioStorage>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<Self> {
        let holdings = storage.load_all().await?;
        debug!(count = holdings.len(), "Loaded portfolio snapshot");
        Ok(Self {
            quotes,
            storage,
            clock: Arc::new(SystemClock),
            holdings: RwLock::new(holdings),
            message: StdMutex::new(None),
            loading: AtomicBool::new(false),
            refresh_gate: Mutex::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and insert a new holding, fetching one quote for it.
    ///
    /// Only an invalid symbol blocks the insert (returns `Ok(false)`); every
    /// other fetch outcome records the holding optimistically with the
    /// fallback flag set, leaving the price to a later refresh. Draft
    /// validation failures and persistence failures are `Err`.
    pub async fn add_holding(&self, draft: &HoldingDraft) -> Result<bool> {
        let valid = draft.validate()?;
        self.loading.store(true, Ordering::SeqCst);
        let result = self.add_validated(valid).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn add_validated(&self, valid: ValidHolding) -> Result<bool> {
        self.set_message(None);
        let symbol = valid.symbol.clone();
        let outcome = self.quotes.fetch_quote(&symbol).await;

        let mut holding = valid.into_holding();
        match &outcome {
            QuoteOutcome::Price(price) => {
                holding.current_price = Some(*price);
                holding.last_updated = Some(self.clock.now());
                holding.is_fallback_data = false;
                info!(%symbol, %price, "Added holding with live quote");
            }
            QuoteOutcome::InvalidSymbol => {
                info!(%symbol, "Rejected holding: symbol not recognized by provider");
                self.set_message(Some(StatusMessage::error(format!(
                    "Symbol \"{symbol}\" not found. Please check and try again."
                ))));
                return Ok(false);
            }
            QuoteOutcome::RateLimited => {
                holding.is_fallback_data = true;
                warn!(%symbol, "Quote rate-limited; adding holding without a price");
                self.set_message(Some(StatusMessage::warning(format!(
                    "API limit reached. {symbol} added, but price will update later."
                ))));
            }
            QuoteOutcome::NetworkError | QuoteOutcome::Unknown(_) => {
                holding.is_fallback_data = true;
                warn!(%symbol, ?outcome, "Quote unavailable; adding holding without a price");
                self.set_message(Some(StatusMessage::warning(format!(
                    "Added {symbol}, but couldn't get current price right now."
                ))));
            }
        }

        let snapshot = {
            let mut holdings = self.holdings.write().await;
            holdings.push(holding);
            holdings.clone()
        };
        self.storage.save_all(&snapshot).await?;
        Ok(true)
    }

    /// Remove a holding by id. Idempotent: removing an absent id is a no-op
    /// and does not rewrite the snapshot.
    pub async fn remove_holding(&self, id: &Id) -> Result<bool> {
        let snapshot = {
            let mut holdings = self.holdings.write().await;
            let before = holdings.len();
            holdings.retain(|holding| holding.id != *id);
            if holdings.len() == before {
                return Ok(false);
            }
            holdings.clone()
        };
        info!(%id, "Removed holding");
        self.storage.save_all(&snapshot).await?;
        Ok(true)
    }

    /// Refresh quotes for every holding concurrently and commit the results
    /// as one state transition.
    ///
    /// A holding whose fetch fails keeps its previous price untouched; a
    /// price that was good once is never cleared by a transient failure.
    pub async fn refresh_all(&self) -> Result<()> {
        let _flight = self.refresh_gate.lock().await;

        let targets: Vec<(Id, String)> = {
            let holdings = self.holdings.read().await;
            holdings
                .iter()
                .map(|holding| (holding.id.clone(), holding.symbol.clone()))
                .collect()
        };
        if targets.is_empty() {
            return Ok(());
        }

        // Fan out one fetch per holding; the lock is not held across I/O.
        let outcomes = futures::future::join_all(
            targets
                .iter()
                .map(|(_, symbol)| self.quotes.fetch_quote(symbol)),
        )
        .await;

        let now = self.clock.now();
        let mut updated = 0usize;
        let snapshot = {
            let mut holdings = self.holdings.write().await;
            for ((id, symbol), outcome) in targets.iter().zip(outcomes) {
                match outcome {
                    QuoteOutcome::Price(price) => {
                        if let Some(holding) =
                            holdings.iter_mut().find(|holding| holding.id == *id)
                        {
                            holding.current_price = Some(price);
                            holding.last_updated = Some(now);
                            holding.is_fallback_data = false;
                            updated += 1;
                        }
                    }
                    other => {
                        warn!(%symbol, outcome = ?other, "Refresh failed; keeping previous price");
                    }
                }
            }
            holdings.clone()
        };

        debug!(total = targets.len(), updated, "Refresh cycle committed");
        if updated > 0 {
            self.storage.save_all(&snapshot).await?;
        }
        Ok(())
    }

    /// Ordered copy of the current holdings.
    pub async fn holdings(&self) -> Vec<Holding> {
        self.holdings.read().await.clone()
    }

    /// Point-in-time view for consumers.
    pub async fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            holdings: self.holdings.read().await.clone(),
            loading: self.is_loading(),
            last_message: self.last_message(),
        }
    }

    /// Σ quantity × (current price, or purchase price while no quote exists).
    pub async fn total_value(&self) -> Decimal {
        self.holdings
            .read()
            .await
            .iter()
            .map(Holding::market_value)
            .sum()
    }

    /// Σ quantity × (current − purchase) over holdings with a live price;
    /// holdings without one contribute zero.
    pub async fn total_unrealized_pl(&self) -> Decimal {
        self.holdings
            .read()
            .await
            .iter()
            .filter_map(Holding::unrealized_pl)
            .sum()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn last_message(&self) -> Option<StatusMessage> {
        self.message.lock().expect("message lock poisoned").clone()
    }

    fn set_message(&self, message: Option<StatusMessage>) {
        *self.message.lock().expect("message lock poisoned") = message;
    }
}
