//! Cry Wolf Analytics - Decision classification for the Cry Wolf study
//!
//! Participants triaged network-security alerts, answering whether each
//! should be escalated. This crate turns the raw decision log into
//! per-participant performance metrics, per-event difficulty, median-split
//! performance groups and a flat master sheet.
//!
//! The domain is pure and synchronous; data enters through the
//! `StudyReader` port and leaves through the `ReportWriter` port.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
