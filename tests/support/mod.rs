#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use stockbook::quotes::{QuoteOutcome, QuoteSource};

/// Quote source driven by per-symbol scripts of outcomes.
///
/// Each fetch pops the next scripted outcome for its symbol; when a script
/// runs dry (or a symbol has none) the default outcome is returned. Calls are
/// counted so tests can assert on fetch volume.
pub struct ScriptedQuoteSource {
    scripts: Mutex<HashMap<String, VecDeque<QuoteOutcome>>>,
    default: QuoteOutcome,
    calls: AtomicUsize,
}

impl ScriptedQuoteSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default: QuoteOutcome::NetworkError,
            calls: AtomicUsize::new(0),
        }
    }

    /// Outcome returned once all scripted outcomes for a symbol are consumed.
    pub fn with_default(mut self, outcome: QuoteOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Queue outcomes for a symbol, consumed in order.
    pub fn script(self, symbol: &str, outcomes: Vec<QuoteOutcome>) -> Self {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .entry(symbol.to_uppercase())
            .or_default()
            .extend(outcomes);
        self
    }

    pub fn price(symbol: &str, price: Decimal) -> Self {
        Self::new().script(symbol, vec![QuoteOutcome::Price(price)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote source that takes simulated time to answer, for asserting on
/// in-flight state and cycle overlap under a paused clock.
pub struct DelayedQuoteSource {
    pub delay: std::time::Duration,
    pub outcome: QuoteOutcome,
}

#[async_trait]
impl QuoteSource for DelayedQuoteSource {
    async fn fetch_quote(&self, _symbol: &str) -> QuoteOutcome {
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "delayed"
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuoteSource {
    async fn fetch_quote(&self, symbol: &str) -> QuoteOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().expect("script lock poisoned");
        scripts
            .get_mut(&symbol.to_uppercase())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
