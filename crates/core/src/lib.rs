//! Clearway Core - Consolidation domain entities, services, and traits.
//!
//! This crate contains the consolidated data model (connections, holdings,
//! transactions, performance, investor rosters), the conflict detection and
//! resolution engine, and the sync operation audit model. It is
//! database-agnostic: persistence goes through the repository traits, with
//! `store::MemoryStore` as the reference implementation.

pub mod connections;
pub mod conflicts;
pub mod errors;
pub mod holdings;
pub mod investors;
pub mod performance;
pub mod store;
pub mod sync;
pub mod transactions;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
