//! Shared types for the portal report pipeline: errors, settings, the
//! in-memory table model, report kinds, and date/number helpers.

pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
