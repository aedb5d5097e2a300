use std::fmt;

/// Custom error type for mica operations
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A table or column name was empty where one is required
    InvalidName(String),
    /// Table already registered in the catalog
    TableAlreadyExists(String),
    /// Table not found in the catalog
    TableNotFound(String),
    /// Column not found in a table's schema (table, column)
    ColumnNotFound(String, String),
    /// Column already declared on the table
    DuplicateColumn(String),
    /// Inserted row is missing a value for a declared column
    MissingColumn(String),
    /// Primary-key value already present in the table
    DuplicatePrimaryKey(String),
    /// Table has no primary-key column, so keyed access is impossible
    NoPrimaryKeyIndex(String),
    /// No row stored under the given primary-key value
    RowNotFound(String),
    /// Filter operator not recognized by the planner or engine
    UnsupportedOperator(String),
    /// Ordering comparison attempted on a non-numeric value
    UnsupportedComparison(String),
    /// Plan kind a dispatcher does not know how to execute. The built-in
    /// engine handles every `PlanKind`, so it never produces this; it is
    /// reserved for front ends that layer their own dispatch over plans.
    UnsupportedPlanKind(String),
    /// Error during SQL parsing
    ParseError(String),
    /// Error during query planning
    PlanError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidName(what) => write!(f, "{what} name cannot be empty"),
            Error::TableAlreadyExists(table) => write!(f, "Table '{table}' already exists"),
            Error::TableNotFound(table) => write!(f, "Table '{table}' does not exist"),
            Error::ColumnNotFound(table, column) => {
                write!(f, "Column '{column}' does not exist in table '{table}'")
            }
            Error::DuplicateColumn(column) => write!(f, "Column '{column}' already exists"),
            Error::MissingColumn(column) => {
                write!(f, "Row is missing a value for column '{column}'")
            }
            Error::DuplicatePrimaryKey(pk) => {
                write!(f, "Primary key value '{pk}' already exists")
            }
            Error::NoPrimaryKeyIndex(table) => {
                write!(f, "Table '{table}' has no primary key index")
            }
            Error::RowNotFound(pk) => write!(f, "No row with primary key '{pk}'"),
            Error::UnsupportedOperator(op) => write!(f, "Unsupported operator '{op}'"),
            Error::UnsupportedComparison(msg) => {
                write!(f, "Unsupported comparison: {msg}")
            }
            Error::UnsupportedPlanKind(kind) => write!(f, "Unsupported plan kind '{kind}'"),
            Error::ParseError(msg) => write!(f, "SQL parse error: {msg}"),
            Error::PlanError(msg) => write!(f, "Query planning error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for mica operations
pub type Result<T> = std::result::Result<T, Error>;
