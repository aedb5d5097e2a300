//! Scalar values and column types
//!
//! Row fields are dynamically typed at the SQL level but closed at the Rust
//! level: every stored scalar is one of the `Value` variants below, so
//! comparisons and type checks stay exhaustive.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

/// Declared type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// IDs, counts, ages, numeric identifiers
    Int,
    /// Names, emails, descriptions, strings
    Text,
    /// Flags, active/inactive status, yes/no fields
    Bool,
    /// created_at, updated_at, or date fields
    Date,
    /// Prices, amounts, balances
    Float,
}

impl ColumnType {
    /// Parse a type name as written in SQL. Case-insensitive.
    pub fn parse(name: &str) -> Option<ColumnType> {
        match name.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" => Some(ColumnType::Int),
            "TEXT" => Some(ColumnType::Text),
            "BOOL" | "BOOLEAN" => Some(ColumnType::Bool),
            "DATE" => Some(ColumnType::Date),
            "FLOAT" | "REAL" => Some(ColumnType::Float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Text => "TEXT",
            ColumnType::Bool => "BOOL",
            ColumnType::Date => "DATE",
            ColumnType::Float => "FLOAT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically-typed scalar stored in a row field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
}

// Values key the primary index, so they need Eq + Hash. Floats hash by bit
// pattern; NaN never equals itself under PartialEq and therefore can never
// be found again once indexed, which is acceptable for a key type.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(i) => {
                state.write_u8(0);
                i.hash(state);
            }
            Value::Float(f) => {
                state.write_u8(1);
                f.to_bits().hash(state);
            }
            Value::Text(s) => {
                state.write_u8(2);
                s.hash(state);
            }
            Value::Bool(b) => {
                state.write_u8(3);
                b.hash(state);
            }
            Value::Date(d) => {
                state.write_u8(4);
                d.hash(state);
            }
        }
    }
}

impl Value {
    /// Numeric view of the value, used by ordering comparisons.
    /// Only integers and floats have one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Bool(_) => "BOOL",
            Value::Date(_) => "DATE",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{d}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}
