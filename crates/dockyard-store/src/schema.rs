//! Table definitions.
//!
//! Each table is a `RocksDB` column family. Tables are not created when the
//! database is opened; callers check for them and create missing ones.

/// Table names.
pub mod table {
    /// Engine configuration records, keyed by engine ID.
    pub const CONFIG: &str = "config";

    /// Append-only event log, keyed by a big-endian sequence number.
    pub const EVENTS: &str = "events";
}

/// Returns all table names required by the control plane.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![table::CONFIG, table::EVENTS]
}
