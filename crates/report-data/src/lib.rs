//! Data layer for the portal report pipeline.
//!
//! Reads raw portal exports, normalizes them per report kind, writes the
//! cleaned CSVs, stacks month-end rent-roll snapshots and computes the
//! portfolio metrics shown on the dashboard.

pub mod aggregator;
pub mod normalizer;
pub mod reader;
pub mod union;
pub mod writer;

pub use report_core as core;
