//! Data layer module
//!
//! In-memory models for a single run:
//! - Meetings returned by the recordings catalog
//! - Recording files and the eligibility rule

mod models;

pub use models::*;
