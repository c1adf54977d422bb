// Library root: the player analytics core. Re-exports all modules so the
// photo collaborator, the CLI and integration tests share one public API.

pub mod charts;
pub mod cohort;
pub mod config;
pub mod derived;
pub mod export;
pub mod filter;
pub mod insights;
pub mod loader;
pub mod percentile;
pub mod profile;
pub mod schema;
pub mod session;
pub mod table;
