use rust_decimal::Decimal;

/// Classified outcome of a single quote lookup.
///
/// This is a total classification, not an error type: transport failures come
/// back as [`QuoteOutcome::NetworkError`] rather than an `Err`, because the
/// portfolio store's insert/refresh policy branches on the classification and
/// treats every non-`Price` outcome as a recoverable degradation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOutcome {
    /// The provider returned a parseable live price.
    Price(Decimal),
    /// The provider's request quota is exhausted; the symbol may be fine.
    RateLimited,
    /// The provider does not recognize the symbol.
    InvalidSymbol,
    /// Request or response transport failed (DNS, TLS, non-2xx, bad body).
    NetworkError,
    /// The provider answered with something we cannot act on.
    Unknown(String),
}

impl QuoteOutcome {
    pub fn price(&self) -> Option<Decimal> {
        match self {
            QuoteOutcome::Price(p) => Some(*p),
            _ => None,
        }
    }
}

/// A single external quote lookup.
///
/// Implementations issue one request per call: no retries, no caching, no side
/// effects beyond the lookup itself.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> QuoteOutcome;

    fn name(&self) -> &str;
}
