//! mirror-daemon: poll-based daemon that mirrors external task platforms
//! into one task-management service.
//!
//! Uses the same mirror-core reconciliation engine as the test harnesses,
//! wired to real HTTP clients, JSON-file snapshot persistence, and a
//! per-source polling scheduler.

pub mod config;
pub mod health;
pub mod normalize;
pub mod platforms;
pub mod retry;
pub mod scheduler;
pub mod store;
