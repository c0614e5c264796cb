//! Core library for the campus enrollment service: admission decisions,
//! approval workflow, waitlist promotion, and enrollment statistics, behind
//! injected store/catalog/policy/notifier seams.

pub mod catalog;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
