//! # ProofWatch Watcher
//!
//! The change-detection half of the integrity engine: one
//! [`CollectionWatcher`] per monitored collection baselines newly observed
//! records and records tamper events for baselined ones.
//!
//! Delivery is push-first (store change feed plus oplog replay from a
//! persisted resume marker) with a one-way fallback to interval polling
//! when the store has no feed support. See [`watcher`] for the record
//! state machine.

pub mod config;
pub mod error;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{Result, WatcherError};
pub use watcher::CollectionWatcher;
