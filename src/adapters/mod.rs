//! Concrete adapter implementations for ports, plus the two datastore tiers.

pub mod cached_source;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod ledger;
pub mod object_store;
pub mod run_lock;
pub mod summary_log;
#[cfg(feature = "webhook")]
pub mod webhook;
