pub mod alpha_vantage;
mod provider;

pub use alpha_vantage::{AlphaVantageQuoteSource, DEMO_API_KEY};
pub use provider::{QuoteOutcome, QuoteSource};
