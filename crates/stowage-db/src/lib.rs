//! Stowage lifecycle store.
//!
//! Postgres repositories for upload groups, sessions, and parts. Every
//! mutation is an individually atomic conditional update; cross-row
//! invariants (group counters vs. session status) are derived from the
//! session's own state transition, never from a recomputed scan.

pub mod db;

pub use db::{GroupRepository, PartRepository, SessionRepository};
