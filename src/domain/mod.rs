//! Core pipeline types and logic.

pub mod ohlcv;
pub mod dataset;
pub mod mapper;
pub mod simulator;
pub mod walkforward;
pub mod metrics;
pub mod config_validation;
pub mod error;
