//! Core domain types and pure pipeline logic.

pub mod calculus;
pub mod config_validation;
pub mod derived;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod patterns;
pub mod payload;
pub mod scoring;
pub mod summary;
pub mod timeframe;
pub mod universe;
