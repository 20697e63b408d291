mod holding;
mod id;

pub use holding::{Holding, HoldingDraft, HoldingError, ValidHolding};
pub use id::Id;
