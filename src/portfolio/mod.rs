mod models;
mod store;

pub use models::{PortfolioSnapshot, Severity, StatusMessage};
pub use store::PortfolioStore;
