//! Health Sheet Export
//!
//! Turns per-day health records into spreadsheet rows. Rows are either
//! merged into the tabs of a Google spreadsheet without duplicating
//! records, or written out as CSV files.

pub mod cloud_adapters;
pub mod config;
pub mod core;
pub mod export;
pub mod schedule;
pub mod source;
pub mod sync;
