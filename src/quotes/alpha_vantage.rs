//! Alpha Vantage quote provider.
//!
//! Uses the GLOBAL_QUOTE endpoint to fetch the latest price for a symbol.
//! Note: Free tier is limited to 25 requests/day.

use std::collections::HashMap;

use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{QuoteOutcome, QuoteSource};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Public demonstration key; heavily throttled but never an error to use.
pub const DEMO_API_KEY: &str = "demo";

/// Alpha Vantage provider for live stock quotes.
///
/// One GLOBAL_QUOTE request per call, classified into [`QuoteOutcome`].
/// The classification is the contract downstream policy depends on, so it is
/// kept in [`classify_body`] as a pure function over the response text.
pub struct AlphaVantageQuoteSource {
    api_key: SecretString,
    client: Client,
    base_url: String,
}

impl AlphaVantageQuoteSource {
    /// Create a new quote source with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key: String = api_key.into();
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a quote source from an optional configured key, falling back to
    /// the public demo key when none is set.
    pub fn from_configured_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(key) => {
                info!("Alpha Vantage: using configured API key");
                Self::new(key)
            }
            None => {
                info!("Alpha Vantage: no API key configured, using public demo key");
                Self::new(DEMO_API_KEY)
            }
        }
    }

    /// Replace the reqwest client (e.g. to set timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Override the endpoint base URL. Used by tests to point at a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl QuoteSource for AlphaVantageQuoteSource {
    async fn fetch_quote(&self, symbol: &str) -> QuoteOutcome {
        let response = match self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.expose_secret()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(symbol, error = %err, "Quote request failed");
                return QuoteOutcome::NetworkError;
            }
        };

        if !response.status().is_success() {
            warn!(symbol, status = %response.status(), "Quote request returned non-success status");
            return QuoteOutcome::NetworkError;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(symbol, error = %err, "Failed to read quote response body");
                return QuoteOutcome::NetworkError;
            }
        };

        let outcome = classify_body(&body);
        debug!(symbol, ?outcome, "Classified quote response");
        outcome
    }

    fn name(&self) -> &str {
        "alpha_vantage"
    }
}

/// Classify a raw GLOBAL_QUOTE response body.
///
/// Field checks happen in a fixed order; downstream insert/refresh policy
/// branches on the result, so this mapping must stay stable if the provider
/// is ever swapped out.
fn classify_body(body: &str) -> QuoteOutcome {
    let response: QuoteResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        // Malformed body is indistinguishable from a broken transport.
        Err(_) => return QuoteOutcome::NetworkError,
    };

    if response.note.is_some() {
        return QuoteOutcome::RateLimited;
    }
    if response.error_message.is_some() {
        return QuoteOutcome::InvalidSymbol;
    }
    if let Some(information) = response.information {
        return QuoteOutcome::Unknown(information);
    }

    match response.global_quote {
        Some(quote) => match quote.price {
            Some(raw) => match raw.parse::<Decimal>() {
                Ok(price) => QuoteOutcome::Price(price),
                Err(_) => QuoteOutcome::Unknown(format!("unparseable price {raw:?}")),
            },
            // An empty quote object is how the API reports unknown symbols.
            None if quote.rest.is_empty() => QuoteOutcome::InvalidSymbol,
            None => QuoteOutcome::Unknown("quote payload missing price field".to_string()),
        },
        None => QuoteOutcome::Unknown("unrecognized response shape".to_string()),
    }
}

/// Response envelope for the GLOBAL_QUOTE endpoint.
///
/// Error indicators ("Note", "Error Message", "Information") arrive as
/// top-level siblings of the quote payload, never nested inside it.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "Note")]
    note: Option<String>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,

    #[serde(rename = "Information")]
    information: Option<String>,

    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,

    #[serde(flatten)]
    rest: HashMap<String, serde_json::Value>,
}
