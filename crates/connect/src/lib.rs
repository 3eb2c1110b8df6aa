//! Clearway Connect - platform adapters, sync engine, and job layer.
//!
//! Everything that talks to the outside world lives here: the
//! `PlatformAdapter` contract and its REST implementation, the per-connection
//! `SyncEngine`, and the durable-queue orchestration (scheduler + worker)
//! that turns sync intent into reliably-executed engine calls.

pub mod adapters;
pub mod credentials;
pub mod engine;
pub mod jobs;

#[cfg(test)]
pub(crate) mod testkit;

pub use engine::{SyncEngine, SyncEngineConfig, SyncOutcome};
