//! `RocksDB` storage layer for dockyard.
//!
//! This crate persists engine configuration and the cluster event log using
//! `RocksDB`, with one column family per table.
//!
//! # Architecture
//!
//! The storage uses the following tables:
//!
//! - `config`: Engine configuration records, keyed by `engine_id`
//! - `events`: Append-only event log, keyed by arrival sequence number
//!
//! Tables are created explicitly through [`Store::create_table`]. Opening a
//! database only attaches the tables that already exist, so callers can tell
//! a fresh database from a populated one.
//!
//! # Example
//!
//! ```no_run
//! use dockyard_store::{schema, RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/dockyard-db").unwrap();
//! for table in schema::all_tables() {
//!     if !store.has_table(table).unwrap() {
//!         store.create_table(table).unwrap();
//!     }
//! }
//!
//! let engines = store.list_engines().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{CertificateMaterial, EngineConfig};

use dockyard_core::{EngineId, Event};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Tables
    // =========================================================================

    /// Check whether a table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check itself fails.
    fn has_table(&self, table: &str) -> Result<bool>;

    /// Create a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_table(&self, table: &str) -> Result<()>;

    // =========================================================================
    // Engine Configuration
    // =========================================================================

    /// Insert a new engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an engine with the same ID is stored.
    fn insert_engine(&self, config: &EngineConfig) -> Result<()>;

    /// Delete an engine configuration.
    ///
    /// Deleting an ID that is not stored succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_engine(&self, engine_id: &EngineId) -> Result<()>;

    /// List all engine configurations in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_engines(&self) -> Result<Vec<EngineConfig>>;

    // =========================================================================
    // Event Log
    // =========================================================================

    /// Append an event to the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_event(&self, event: &Event) -> Result<()>;

    /// List all events in arrival order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_events(&self) -> Result<Vec<Event>>;
}
