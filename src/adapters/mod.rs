//! Concrete adapter implementations for ports.

pub mod csv_data;
pub mod ini_config;
pub mod json_report;
pub mod markers;
