//! mica is a minimal in-process relational data store: a schema catalog,
//! row storage with a primary-key index, and an engine that executes
//! structured query plans, fronted by a small SQL parser and planner.
//!
//! Everything lives in memory; there is no durability, no transactions,
//! and no concurrency inside the core. A front end serving multiple
//! clients must serialize access to one `Engine`.
//!
//! ```
//! use mica::{Column, ColumnType, Database, Engine, Value};
//!
//! let mut db = Database::new();
//! let users = db.create_table("users").unwrap();
//! users.add_column(Column::new("id", ColumnType::Int).primary_key()).unwrap();
//! users.add_column(Column::new("names", ColumnType::Text)).unwrap();
//!
//! let mut engine = Engine::new(db);
//! engine.execute_sql("INSERT INTO users (id, names) VALUES (1, 'Alice')").unwrap();
//! let rows = engine.execute_sql("SELECT names FROM users WHERE id = 1").unwrap();
//! assert_eq!(rows[0].get("names"), Some(&Value::Text("Alice".to_string())));
//! ```

mod catalog;
mod engine;
mod error;
mod parser;
mod plan;
mod table;
mod value;

pub use catalog::Database;
pub use engine::Engine;
pub use error::{Error, Result};
pub use parser::{parse_sql, Statement};
pub use plan::{build_plan, Filter, FilterOp, Plan, PlanKind, ALL_COLUMNS};
pub use table::{Column, Row, Table};
pub use value::{ColumnType, Value};
