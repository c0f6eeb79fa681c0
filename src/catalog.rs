//! Table registry.
//!
//! Maps a [`TableId`] to the heap file that stores the table and the name it
//! was registered under. In-memory only; nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Error, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::TupleDesc;

struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
    /// Registration order, for name lookups.
    seq: u64,
}

#[derive(Default)]
struct Tables {
    entries: HashMap<TableId, TableEntry>,
    next_seq: u64,
}

#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    ///
    /// Re-adding a table id replaces the old entry. Names are not unique;
    /// [`Catalog::table_id`] resolves to the table added last.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>) -> TableId {
        self.register(file, name.into(), None)
    }

    /// Like [`Catalog::add_table`], also recording the primary key column.
    pub fn add_table_with_pkey(
        &self,
        file: Arc<HeapFile>,
        name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> TableId {
        self.register(file, name.into(), Some(primary_key.into()))
    }

    fn register(&self, file: Arc<HeapFile>, name: String, primary_key: Option<String>) -> TableId {
        let table_id = file.id();
        log::debug!("catalog: {} registered as {:?}", table_id, name);

        let mut tables = self.tables.write();
        let seq = tables.next_seq;
        tables.next_seq += 1;
        tables.entries.insert(
            table_id,
            TableEntry {
                file,
                name,
                primary_key,
                seq,
            },
        );
        table_id
    }

    /// # Errors
    /// - `Error::TableNotFound` if no table has this id
    pub fn database_file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .entries
            .get(&table_id)
            .map(|entry| entry.file.clone())
            .ok_or(Error::TableNotFound(table_id))
    }

    /// # Errors
    /// - `Error::TableNotFound` if no table has this id
    pub fn tuple_desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        self.database_file(table_id).map(|file| file.desc().clone())
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| entry.name == name)
            .max_by_key(|(_, entry)| entry.seq)
            .map(|(id, _)| *id)
    }

    /// # Errors
    /// - `Error::TableNotFound` if no table has this id
    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.tables
            .read()
            .entries
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or(Error::TableNotFound(table_id))
    }

    /// The primary key column, if one was registered.
    ///
    /// # Errors
    /// - `Error::TableNotFound` if no table has this id
    pub fn primary_key(&self, table_id: TableId) -> Result<Option<String>> {
        self.tables
            .read()
            .entries
            .get(&table_id)
            .map(|entry| entry.primary_key.clone())
            .ok_or(Error::TableNotFound(table_id))
    }

    /// Registered ids in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.read().entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.tables.write().entries.clear();
    }
}
