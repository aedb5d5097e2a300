//! Table storage: column schema, row data, and the primary-key index
//!
//! A `Table` owns an ordered sequence of rows plus its column schema. If one
//! of the columns is flagged as the primary key, the table also maintains a
//! hash index from primary-key value to the row's current position, giving
//! constant-time lookup, update, and delete by key. Row order is insertion
//! order; a delete shifts later rows left and re-points their index entries.

use std::collections::hash_map;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::{ColumnType, Value};

/// One attribute of a table: name, declared type, and constraint flags
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub is_primary_key: bool,
    pub is_unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_primary_key: false,
            is_unique: false,
        }
    }

    /// Flag this column as the table's primary key
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Flag this column as unique
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// A single record: a mapping from column name to scalar value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.data.insert(column.into(), value);
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.data.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.data.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Value> {
        self.data.iter()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Row {
    fn from(fields: [(&str, Value); N]) -> Self {
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// A database table: schema, row store, and primary-key index
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    /// Maps primary-key values to row positions
    primary_index: HashMap<Value, usize>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            primary_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The first column flagged as primary key, if any. Every index code path
    /// goes through here, so if more than one column is flagged (the schema
    /// layer does not forbid it) the first one consistently wins.
    pub fn primary_key_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    /// Add a new column to the table schema.
    ///
    /// Existing rows are not retroactively populated: they simply lack the
    /// key, and presence checks treat the field as absent.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if column.name.is_empty() {
            return Err(Error::InvalidName("column".to_string()));
        }
        if self.has_column(&column.name) {
            return Err(Error::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove a column from the schema and purge its field from every row,
    /// so a later `add_column` with the same name cannot resurface stale
    /// values.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidName("column".to_string()));
        }
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(self.name.clone(), name.to_string()))?;
        self.columns.remove(position);
        for row in &mut self.rows {
            row.remove(name);
        }
        Ok(())
    }

    /// Insert a row at the end of the table.
    ///
    /// The row must carry a value for every declared column. If the table
    /// has a primary-key column, the row's key value must be new; on success
    /// it is recorded in the primary index.
    pub fn insert(&mut self, row: Row) -> Result<()> {
        for column in &self.columns {
            if !row.contains(&column.name) {
                return Err(Error::MissingColumn(column.name.clone()));
            }
        }

        let pk_value = match self.primary_key_column() {
            Some(pk_col) => {
                // Presence was checked above, so the field must exist
                let value = row
                    .get(&pk_col.name)
                    .ok_or_else(|| Error::MissingColumn(pk_col.name.clone()))?
                    .clone();
                if self.primary_index.contains_key(&value) {
                    return Err(Error::DuplicatePrimaryKey(value.to_string()));
                }
                Some(value)
            }
            None => None,
        };

        self.rows.push(row);
        if let Some(value) = pk_value {
            self.primary_index.insert(value, self.rows.len() - 1);
        }
        Ok(())
    }

    /// Constant-time lookup of a row by its primary-key value
    pub fn get_by_primary_key(&self, pk: &Value) -> Result<&Row> {
        if self.primary_key_column().is_none() {
            return Err(Error::NoPrimaryKeyIndex(self.name.clone()));
        }
        let position = self
            .primary_index
            .get(pk)
            .ok_or_else(|| Error::RowNotFound(pk.to_string()))?;
        Ok(&self.rows[*position])
    }

    /// Full scan returning rows whose field equals `value` by raw equality
    pub fn filter_by_column(&self, column: &str, value: &Value) -> Result<Vec<&Row>> {
        if !self.has_column(column) {
            return Err(Error::ColumnNotFound(self.name.clone(), column.to_string()));
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(column) == Some(value))
            .collect())
    }

    /// Overwrite fields of the row stored under `pk`.
    ///
    /// Every updated column is validated against the schema before any field
    /// is written, so a failed update leaves the row untouched. Changing the
    /// primary-key field itself re-points the index entry; a new key already
    /// held by another row is rejected with `DuplicatePrimaryKey`.
    pub fn update(&mut self, pk: &Value, updates: &HashMap<String, Value>) -> Result<()> {
        if self.primary_key_column().is_none() {
            return Err(Error::NoPrimaryKeyIndex(self.name.clone()));
        }
        for column in updates.keys() {
            if !self.has_column(column) {
                return Err(Error::ColumnNotFound(self.name.clone(), column.clone()));
            }
        }
        let position = *self
            .primary_index
            .get(pk)
            .ok_or_else(|| Error::RowNotFound(pk.to_string()))?;
        self.check_pk_reassignment(&[position], updates)?;

        let pk_name = self
            .primary_key_column()
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let mut new_pk = None;
        for (column, value) in updates {
            if *column == pk_name {
                new_pk = Some(value.clone());
            }
            self.rows[position].set(column.clone(), value.clone());
        }
        if let Some(new_pk) = new_pk {
            if new_pk != *pk {
                self.primary_index.remove(pk);
                self.primary_index.insert(new_pk, position);
            }
        }
        Ok(())
    }

    /// Remove the row stored under `pk` and return it.
    ///
    /// Rows after the removed position shift left, so every one of their
    /// index entries is re-pointed at its new position.
    pub fn delete(&mut self, pk: &Value) -> Result<Row> {
        if self.primary_key_column().is_none() {
            return Err(Error::NoPrimaryKeyIndex(self.name.clone()));
        }
        let position = self
            .primary_index
            .remove(pk)
            .ok_or_else(|| Error::RowNotFound(pk.to_string()))?;
        let removed = self.rows.remove(position);

        let pk_name = self
            .primary_key_column()
            .map(|c| c.name.clone())
            .unwrap_or_default();
        for shifted in position..self.rows.len() {
            if let Some(value) = self.rows[shifted].get(&pk_name) {
                self.primary_index.insert(value.clone(), shifted);
            }
        }
        Ok(removed)
    }

    /// Reject a primary-key reassignment that would leave two rows under
    /// one key. `matching` holds the positions about to receive `updates`;
    /// since every one of them would get the same new key, re-keying more
    /// than one row at once is always a duplicate, and re-keying a single
    /// row is only allowed when the new key is free or already its own.
    pub(crate) fn check_pk_reassignment(
        &self,
        matching: &[usize],
        updates: &HashMap<String, Value>,
    ) -> Result<()> {
        if matching.is_empty() {
            return Ok(());
        }
        let pk_name = match self.primary_key_column() {
            Some(column) => &column.name,
            None => return Ok(()),
        };
        let new_pk = match updates.get(pk_name) {
            Some(value) => value,
            None => return Ok(()),
        };
        if matching.len() > 1 {
            return Err(Error::DuplicatePrimaryKey(new_pk.to_string()));
        }
        if let Some(&held_by) = self.primary_index.get(new_pk) {
            if held_by != matching[0] {
                return Err(Error::DuplicatePrimaryKey(new_pk.to_string()));
            }
        }
        Ok(())
    }

    /// Overwrite fields of the row at `position` with pre-validated
    /// assignments, re-pointing the index entry if the primary-key field
    /// itself changes. Callers must have checked the assignment columns
    /// against the schema and run `check_pk_reassignment` already.
    pub(crate) fn apply_updates_at(&mut self, position: usize, updates: &HashMap<String, Value>) {
        let pk_name = self.primary_key_column().map(|c| c.name.clone());
        let old_pk = pk_name
            .as_deref()
            .and_then(|name| self.rows[position].get(name).cloned());

        for (column, value) in updates {
            self.rows[position].set(column.clone(), value.clone());
        }

        if let (Some(pk_name), Some(old_pk)) = (pk_name, old_pk) {
            if let Some(new_pk) = self.rows[position].get(&pk_name) {
                if *new_pk != old_pk {
                    let new_pk = new_pk.clone();
                    self.primary_index.remove(&old_pk);
                    self.primary_index.insert(new_pk, position);
                }
            }
        }
    }

    /// Remove every row whose flag in `matches` is true, preserving the
    /// relative order of the kept rows, and rebuild the primary index over
    /// them. Returns the removed rows in their original order.
    ///
    /// `matches` must be as long as the row sequence; the engine computes it
    /// from the plan's filters before mutating anything.
    pub fn remove_matching(&mut self, matches: &[bool]) -> Vec<Row> {
        debug_assert_eq!(matches.len(), self.rows.len());
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for (position, row) in std::mem::take(&mut self.rows).into_iter().enumerate() {
            if matches.get(position).copied().unwrap_or(false) {
                removed.push(row);
            } else {
                kept.push(row);
            }
        }
        self.rows = kept;

        self.primary_index.clear();
        if let Some(pk_name) = self.primary_key_column().map(|c| c.name.clone()) {
            for (position, row) in self.rows.iter().enumerate() {
                if let Some(value) = row.get(&pk_name) {
                    self.primary_index.insert(value.clone(), position);
                }
            }
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn primary_index(&self) -> &HashMap<Value, usize> {
        &self.primary_index
    }
}
