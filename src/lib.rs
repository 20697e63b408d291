pub mod clock;
pub mod config;
pub mod duration;
pub mod models;
pub mod portfolio;
pub mod quotes;
pub mod scheduler;
pub mod storage;
