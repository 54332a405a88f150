//! Runtime layer for the portal report pipeline.
//!
//! Waits for portal downloads, drives them through the normalizer, and
//! keeps the month-end rent-roll snapshots and their combined file current.

pub mod downloads;
pub mod pipeline;

pub use report_core as core;
pub use report_data as data;
