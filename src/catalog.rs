//! Table catalog
//!
//! The `Database` is the registry mapping table names to `Table` structures
//! and owns every table's lifecycle. It is optimized for single-threaded
//! usage without locks; a server front end serving concurrent clients must
//! serialize whole operations around one instance.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::table::Table;

/// The table catalog: a mapping from table name to `Table`
#[derive(Debug, Default)]
pub struct Database {
    tables: HashMap<String, Table>,
}

impl Database {
    /// Create an empty database with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty table and register it in the catalog.
    ///
    /// The table starts with no columns, no rows, and an empty primary
    /// index. Fails if the name is empty or already registered.
    pub fn create_table(&mut self, name: &str) -> Result<&mut Table> {
        if name.is_empty() {
            return Err(Error::InvalidName("table".to_string()));
        }
        if self.tables.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name)))
    }

    /// Look up a table by name; absence is not an error
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Remove a table and everything it holds from the catalog
    pub fn drop_table(&mut self, name: &str) -> Result<Table> {
        self.tables
            .remove(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Registered table names in sorted order, so listings are deterministic
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
