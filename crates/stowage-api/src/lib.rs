//! Stowage API
//!
//! HTTP surface for the upload orchestrator: the upload session controller,
//! the storage-event ingestion endpoint, the live progress stream, and the
//! downstream job dispatch adapter.

pub mod api_doc;
pub mod broadcast;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
