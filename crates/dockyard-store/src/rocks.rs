//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dockyard_core::{EngineId, Event};
use parking_lot::Mutex;
use rocksdb::{BoundColumnFamily, DBWithThreadMode, IteratorMode, MultiThreaded, Options};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::table;
use crate::types::EngineConfig;
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    next_event_seq: AtomicU64,
    insert_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// Only the tables already present in the database are attached; use
    /// [`Store::create_table`] to add missing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // A database that does not exist yet has no column families to list.
        let existing = DBWithThreadMode::<MultiThreaded>::list_cf(&opts, path)
            .unwrap_or_else(|_| vec![rocksdb::DEFAULT_COLUMN_FAMILY_NAME.to_string()]);

        let db = DBWithThreadMode::open_cf(&opts, path, &existing)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self {
            db: Arc::new(db),
            next_event_seq: AtomicU64::new(0),
            insert_lock: Mutex::new(()),
        };
        store
            .next_event_seq
            .store(store.last_event_seq()?.map_or(0, |seq| seq + 1), Ordering::SeqCst);

        tracing::debug!(path = %path.display(), tables = ?existing, "Opened RocksDB store");

        Ok(store)
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Find the sequence number of the newest stored event.
    fn last_event_seq(&self) -> Result<Option<u64>> {
        let Some(cf) = self.db.cf_handle(table::EVENTS) else {
            return Ok(None);
        };

        match self.db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                Ok(keys::decode_event_key(&key))
            }
            None => Ok(None),
        }
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Tables
    // =========================================================================

    fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.db.cf_handle(table).is_some())
    }

    fn create_table(&self, table: &str) -> Result<()> {
        if self.has_table(table)? {
            return Ok(());
        }

        self.db
            .create_cf(table, &Options::default())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(table = %table, "Created table");

        Ok(())
    }

    // =========================================================================
    // Engine Configuration
    // =========================================================================

    fn insert_engine(&self, config: &EngineConfig) -> Result<()> {
        let cf = self.cf(table::CONFIG)?;
        let key = keys::engine_key(config.id());
        let value = Self::serialize(config)?;

        let _guard = self.insert_lock.lock();

        let exists = self
            .db
            .get_pinned_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if exists {
            return Err(StoreError::AlreadyExists(config.id().to_string()));
        }

        self.db
            .put_cf(&cf, &key, &value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn delete_engine(&self, engine_id: &EngineId) -> Result<()> {
        let cf = self.cf(table::CONFIG)?;
        let key = keys::engine_key(engine_id);

        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_engines(&self) -> Result<Vec<EngineConfig>> {
        let cf = self.cf(table::CONFIG)?;

        let mut engines = Vec::new();
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            engines.push(Self::deserialize(&value)?);
        }

        Ok(engines)
    }

    // =========================================================================
    // Event Log
    // =========================================================================

    fn append_event(&self, event: &Event) -> Result<()> {
        let cf = self.cf(table::EVENTS)?;
        let value = Self::serialize(event)?;
        let seq = self.next_event_seq.fetch_add(1, Ordering::SeqCst);

        self.db
            .put_cf(&cf, keys::event_key(seq), value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        let cf = self.cf(table::EVENTS)?;

        let mut events = Vec::new();
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        for item in iter {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            events.push(Self::deserialize(&value)?);
        }

        Ok(events)
    }
}
