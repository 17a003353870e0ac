//! Service layer
//!
//! Contains the sync logic separated from the HTTP clients and storage
//! backends it drives.

mod key;
mod orchestrator;
mod transfer;

pub use key::{KeyPolicy, derive_key, meeting_folder};
pub use orchestrator::{RunReport, SyncOptions, SyncOrchestrator};
pub use transfer::TransferEngine;
