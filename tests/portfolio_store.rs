mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

use stockbook::clock::FixedClock;
use stockbook::models::HoldingDraft;
use stockbook::portfolio::{PortfolioStore, Severity};
use stockbook::quotes::{QuoteOutcome, QuoteSource};
use stockbook::storage::{MemoryStorage, PortfolioStorage};

use support::{DelayedQuoteSource, ScriptedQuoteSource};

async fn open_store(
    storage: Arc<MemoryStorage>,
    quotes: ScriptedQuoteSource,
) -> Result<PortfolioStore> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
    Ok(PortfolioStore::open(storage, Arc::new(quotes))
        .await?
        .with_clock(Arc::new(clock)))
}

#[tokio::test]
async fn add_with_live_quote_sets_price() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::price("AAPL", dec!(155));
    let store = open_store(Arc::clone(&storage), quotes).await?;

    let added = store
        .add_holding(&HoldingDraft::new("aapl", dec!(10), dec!(150)))
        .await?;

    assert!(added);
    let holdings = store.holdings().await;
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].symbol, "AAPL");
    assert_eq!(holdings[0].current_price, Some(dec!(155)));
    assert!(!holdings[0].is_fallback_data);
    assert!(holdings[0].last_updated.is_some());
    assert_eq!(store.last_message(), None);

    // Scenario A totals: 10 × (155 − 150) = +50.
    assert_eq!(store.total_unrealized_pl().await, dec!(50));
    assert_eq!(store.total_value().await, dec!(1550));
    Ok(())
}

#[tokio::test]
async fn add_invalid_symbol_blocks_insert() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new().script("ZZZZ", vec![QuoteOutcome::InvalidSymbol]);
    let store = open_store(Arc::clone(&storage), quotes).await?;

    let added = store
        .add_holding(&HoldingDraft::new("ZZZZ", dec!(1), dec!(10)))
        .await?;

    assert!(!added);
    assert!(store.holdings().await.is_empty());
    let message = store.last_message().expect("expected rejection message");
    assert_eq!(message.severity, Severity::Error);
    assert!(message.text.contains("ZZZZ"));
    // Nothing was persisted either.
    assert!(storage.load_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn add_rate_limited_inserts_fallback() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new().script("MSFT", vec![QuoteOutcome::RateLimited]);
    let store = open_store(Arc::clone(&storage), quotes).await?;

    let added = store
        .add_holding(&HoldingDraft::new("MSFT", dec!(2), dec!(300)))
        .await?;

    assert!(added);
    let holdings = store.holdings().await;
    assert_eq!(holdings[0].current_price, None);
    assert!(holdings[0].is_fallback_data);
    assert!(holdings[0].last_updated.is_none());
    let message = store.last_message().expect("expected warning");
    assert_eq!(message.severity, Severity::Warning);
    Ok(())
}

#[tokio::test]
async fn add_network_error_and_unknown_insert_fallback() -> Result<()> {
    for outcome in [
        QuoteOutcome::NetworkError,
        QuoteOutcome::Unknown("banner".into()),
    ] {
        let storage = Arc::new(MemoryStorage::new());
        let quotes = ScriptedQuoteSource::new().script("IBM", vec![outcome.clone()]);
        let store = open_store(storage, quotes).await?;

        let added = store
            .add_holding(&HoldingDraft::new("IBM", dec!(1), dec!(100)))
            .await?;

        assert!(added, "outcome {outcome:?} should still insert");
        let holdings = store.holdings().await;
        assert_eq!(holdings[0].current_price, None);
        assert!(holdings[0].is_fallback_data);
        assert_eq!(
            store.last_message().map(|m| m.severity),
            Some(Severity::Warning)
        );
    }
    Ok(())
}

#[tokio::test]
async fn successful_add_clears_previous_message() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script("ZZZZ", vec![QuoteOutcome::InvalidSymbol])
        .script("AAPL", vec![QuoteOutcome::Price(dec!(155))]);
    let store = open_store(storage, quotes).await?;

    assert!(
        !store
            .add_holding(&HoldingDraft::new("ZZZZ", dec!(1), dec!(10)))
            .await?
    );
    assert!(store.last_message().is_some());

    assert!(
        store
            .add_holding(&HoldingDraft::new("AAPL", dec!(1), dec!(150)))
            .await?
    );
    assert_eq!(store.last_message(), None);
    Ok(())
}

#[tokio::test]
async fn refresh_backfills_fallback_holding() -> Result<()> {
    // Scenario C: rate-limited add, then a successful refresh.
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new().script(
        "MSFT",
        vec![QuoteOutcome::RateLimited, QuoteOutcome::Price(dec!(310))],
    );
    let store = open_store(Arc::clone(&storage), quotes).await?;

    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(2), dec!(300)))
        .await?;
    store.refresh_all().await?;

    let holdings = store.holdings().await;
    assert_eq!(holdings[0].current_price, Some(dec!(310)));
    assert!(!holdings[0].is_fallback_data);
    assert!(holdings[0].last_updated.is_some());

    // The refresh commit was persisted.
    let persisted = storage.load_all().await?;
    assert_eq!(persisted, holdings);
    Ok(())
}

#[tokio::test]
async fn refresh_failure_preserves_stale_price() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script(
            "AAPL",
            vec![QuoteOutcome::Price(dec!(100)), QuoteOutcome::NetworkError],
        )
        .with_default(QuoteOutcome::NetworkError);
    let store = open_store(storage, quotes).await?;

    store
        .add_holding(&HoldingDraft::new("AAPL", dec!(5), dec!(90)))
        .await?;
    let before = store.holdings().await;

    store.refresh_all().await?;

    let after = store.holdings().await;
    assert_eq!(after, before, "failed refresh must leave holdings unchanged");
    assert_eq!(after[0].current_price, Some(dec!(100)));
    assert!(!after[0].is_fallback_data);
    Ok(())
}

#[tokio::test]
async fn refresh_updates_only_successful_fetches() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script(
            "AAPL",
            vec![QuoteOutcome::Price(dec!(100)), QuoteOutcome::Price(dec!(120))],
        )
        .script(
            "MSFT",
            vec![QuoteOutcome::Price(dec!(300)), QuoteOutcome::RateLimited],
        );
    let store = open_store(storage, quotes).await?;

    store
        .add_holding(&HoldingDraft::new("AAPL", dec!(1), dec!(90)))
        .await?;
    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(1), dec!(290)))
        .await?;

    store.refresh_all().await?;

    let holdings = store.holdings().await;
    assert_eq!(holdings[0].current_price, Some(dec!(120)));
    assert_eq!(holdings[1].current_price, Some(dec!(300)));
    Ok(())
}

#[tokio::test]
async fn refresh_on_empty_portfolio_fetches_nothing() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new();
    let store = PortfolioStore::open(storage, Arc::new(quotes)).await?;

    store.refresh_all().await?;
    assert!(store.holdings().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn remove_holding_is_idempotent() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::price("AAPL", dec!(155));
    let store = open_store(Arc::clone(&storage), quotes).await?;

    store
        .add_holding(&HoldingDraft::new("AAPL", dec!(1), dec!(150)))
        .await?;
    let id = store.holdings().await[0].id.clone();

    assert!(store.remove_holding(&id).await?);
    let once = store.holdings().await;

    assert!(!store.remove_holding(&id).await?);
    let twice = store.holdings().await;

    assert_eq!(once, twice);
    assert!(twice.is_empty());
    assert!(storage.load_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn totals_mix_live_and_fallback_holdings() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script("AAPL", vec![QuoteOutcome::Price(dec!(110))])
        .script("MSFT", vec![QuoteOutcome::RateLimited]);
    let store = open_store(storage, quotes).await?;

    store
        .add_holding(&HoldingDraft::new("AAPL", dec!(10), dec!(100)))
        .await?;
    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(2), dec!(300)))
        .await?;

    // AAPL at the live price, MSFT falls back to purchase price.
    assert_eq!(store.total_value().await, dec!(1700));
    // Only AAPL has a live price, so only it contributes P/L.
    assert_eq!(store.total_unrealized_pl().await, dec!(100));
    Ok(())
}

#[tokio::test]
async fn open_loads_persisted_snapshot_in_order() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script("AAPL", vec![QuoteOutcome::Price(dec!(100))])
        .script("MSFT", vec![QuoteOutcome::Price(dec!(300))]);
    let store = open_store(Arc::clone(&storage), quotes).await?;
    store
        .add_holding(&HoldingDraft::new("AAPL", dec!(1), dec!(90)))
        .await?;
    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(1), dec!(290)))
        .await?;
    let saved = store.holdings().await;

    // A fresh store over the same storage sees the same ordered collection.
    let reopened = PortfolioStore::open(storage, Arc::new(ScriptedQuoteSource::new())).await?;
    assert_eq!(reopened.holdings().await, saved);
    assert_eq!(reopened.holdings().await[0].symbol, "AAPL");
    Ok(())
}

#[tokio::test]
async fn add_rejects_bad_draft_without_fetching() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = Arc::new(ScriptedQuoteSource::new());
    let quotes_dyn: Arc<dyn QuoteSource> = Arc::clone(&quotes) as Arc<dyn QuoteSource>;
    let store = PortfolioStore::open(storage, quotes_dyn).await?;

    let result = store
        .add_holding(&HoldingDraft::new("AAPL", dec!(0), dec!(10)))
        .await;

    assert!(result.is_err());
    assert_eq!(quotes.call_count(), 0);
    assert!(store.holdings().await.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn loading_flag_is_visible_during_in_flight_add() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = Arc::new(DelayedQuoteSource {
        delay: Duration::from_secs(5),
        outcome: QuoteOutcome::Price(dec!(155)),
    });
    let store = Arc::new(PortfolioStore::open(storage, quotes).await?);

    let worker = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .add_holding(&HoldingDraft::new("AAPL", dec!(10), dec!(150)))
                .await
        })
    };

    // Let the add reach its quote fetch, then observe it mid-flight.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert!(store.is_loading());
    assert!(store.snapshot().await.loading);

    assert!(worker.await??);
    assert!(!store.is_loading());
    assert!(!store.snapshot().await.loading);
    assert_eq!(store.holdings().await[0].current_price, Some(dec!(155)));
    Ok(())
}

#[tokio::test]
async fn refresh_leaves_retained_message_untouched() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new()
        .script("MSFT", vec![QuoteOutcome::RateLimited])
        .with_default(QuoteOutcome::NetworkError);
    let store = open_store(storage, quotes).await?;

    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(2), dec!(300)))
        .await?;
    let before = store.last_message();
    assert_eq!(
        before.as_ref().map(|m| m.severity),
        Some(Severity::Warning)
    );

    // A refresh cycle reports through the holdings and the logs, not the
    // retained message, even when every fetch in it fails.
    store.refresh_all().await?;
    assert_eq!(store.last_message(), before);
    Ok(())
}

#[tokio::test]
async fn snapshot_reflects_holdings_and_message() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let quotes = ScriptedQuoteSource::new().script("MSFT", vec![QuoteOutcome::RateLimited]);
    let store = open_store(storage, quotes).await?;

    store
        .add_holding(&HoldingDraft::new("MSFT", dec!(1), dec!(300)))
        .await?;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.holdings.len(), 1);
    assert!(!snapshot.loading);
    assert_eq!(
        snapshot.last_message.map(|m| m.severity),
        Some(Severity::Warning)
    );
    Ok(())
}
