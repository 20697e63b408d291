use serde::{Deserialize, Serialize};

use crate::models::Holding;

/// Severity of the single retained status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The requested change went through, but degraded (missing price data).
    Warning,
    /// The requested change was rejected.
    Error,
}

/// The one current user-facing message. Each new outcome replaces the prior
/// message; there is no accumulation or log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

impl StatusMessage {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

/// Immutable point-in-time view of the store for consumers.
///
/// Returned by value so presentation code can render without holding any lock
/// on the live collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    /// True while an `add_holding` quote fetch is in flight.
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_message: Option<StatusMessage>,
}
