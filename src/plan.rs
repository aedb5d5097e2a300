//! Query plans and the statement→plan lowering
//!
//! A `Plan` is a language-agnostic description of one operation: the kind,
//! the target table, and whichever of the column list, filter predicates,
//! assignments, and DDL parameters the kind needs. Plans are built from
//! parsed statements by `build_plan`, or directly by front ends that never
//! see SQL text (a REST layer mapping routes onto operations, say). A plan
//! carries no state across calls; the engine consumes it once.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::parser::Statement;
use crate::value::{ColumnType, Value};

/// The operation a plan describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AddColumn,
    ShowTables,
    DescribeTable,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanKind::Select => "SELECT",
            PlanKind::Insert => "INSERT",
            PlanKind::Update => "UPDATE",
            PlanKind::Delete => "DELETE",
            PlanKind::CreateTable => "CREATE TABLE",
            PlanKind::AddColumn => "ADD COLUMN",
            PlanKind::ShowTables => "SHOW TABLES",
            PlanKind::DescribeTable => "DESCRIBE",
        };
        f.write_str(name)
    }
}

/// Comparison operator of a WHERE-style predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    /// Parse an operator token. Front ends building plans from non-SQL
    /// input (query strings, route parameters) go through here.
    pub fn parse(op: &str) -> Result<FilterOp> {
        match op {
            "=" => Ok(FilterOp::Eq),
            "!=" => Ok(FilterOp::Ne),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Le),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Ge),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WHERE-style predicate: column, operator, literal value
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }
}

/// Sentinel used in `columns` to request every column unprojected
pub const ALL_COLUMNS: &str = "*";

/// A structured, already-validated description of one database operation
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub kind: PlanKind,
    pub table_name: String,
    /// Requested columns for Select; may be the single sentinel `*`
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    /// Column → value assignments for Insert and Update
    pub assignments: HashMap<String, Value>,
    /// Column names for AddColumn
    pub columns_to_add: Vec<String>,
    /// Types taken positionally for `columns_to_add`; a missing entry
    /// defaults to TEXT at execution time
    pub column_types: Vec<ColumnType>,
}

impl Plan {
    pub fn new(kind: PlanKind, table_name: impl Into<String>) -> Self {
        Self {
            kind,
            table_name: table_name.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            assignments: HashMap::new(),
            columns_to_add: Vec::new(),
            column_types: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_assignments(mut self, assignments: HashMap<String, Value>) -> Self {
        self.assignments = assignments;
        self
    }
}

/// Lower a parsed statement into an executable plan
pub fn build_plan(statement: Statement) -> Result<Plan> {
    match statement {
        Statement::Select(select) => {
            let columns = if select.columns.is_empty() {
                vec![ALL_COLUMNS.to_string()]
            } else {
                select.columns
            };
            Ok(Plan::new(PlanKind::Select, select.table)
                .with_columns(columns)
                .with_filters(select.filters))
        }
        Statement::Insert(insert) => {
            if insert.columns.len() != insert.values.len() {
                return Err(Error::PlanError(format!(
                    "INSERT into '{}' names {} columns but provides {} values",
                    insert.table,
                    insert.columns.len(),
                    insert.values.len()
                )));
            }
            let assignments = insert
                .columns
                .into_iter()
                .zip(insert.values)
                .collect::<HashMap<_, _>>();
            Ok(Plan::new(PlanKind::Insert, insert.table).with_assignments(assignments))
        }
        Statement::Update(update) => {
            let assignments = update
                .assignments
                .into_iter()
                .map(|a| (a.column, a.value))
                .collect::<HashMap<_, _>>();
            Ok(Plan::new(PlanKind::Update, update.table)
                .with_assignments(assignments)
                .with_filters(update.filters))
        }
        Statement::Delete(delete) => {
            Ok(Plan::new(PlanKind::Delete, delete.table).with_filters(delete.filters))
        }
        Statement::CreateTable(create) => Ok(Plan::new(PlanKind::CreateTable, create.table)),
        Statement::AddColumn(add) => {
            let mut plan = Plan::new(PlanKind::AddColumn, add.table);
            for column in add.columns {
                let column_type = match column.type_name {
                    Some(name) => ColumnType::parse(&name).ok_or_else(|| {
                        Error::PlanError(format!(
                            "unknown column type '{}' for column '{}'",
                            name, column.name
                        ))
                    })?,
                    None => ColumnType::Text,
                };
                plan.columns_to_add.push(column.name);
                plan.column_types.push(column_type);
            }
            Ok(plan)
        }
        Statement::ShowTables => Ok(Plan::new(PlanKind::ShowTables, String::new())),
        Statement::DescribeTable(describe) => {
            Ok(Plan::new(PlanKind::DescribeTable, describe.table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_sql;

    fn plan_for(sql: &str) -> Plan {
        build_plan(parse_sql(sql).unwrap()).unwrap()
    }

    #[test]
    fn select_star_keeps_the_sentinel() {
        let plan = plan_for("SELECT * FROM users WHERE age > 21");
        assert_eq!(plan.kind, PlanKind::Select);
        assert_eq!(plan.table_name, "users");
        assert_eq!(plan.columns, vec![ALL_COLUMNS]);
        assert_eq!(
            plan.filters,
            vec![Filter::new("age", FilterOp::Gt, Value::Integer(21))]
        );
    }

    #[test]
    fn insert_zips_columns_and_values() {
        let plan = plan_for("INSERT INTO users (id, names) VALUES (1, 'Alice')");
        assert_eq!(plan.kind, PlanKind::Insert);
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.assignments.get("id"), Some(&Value::Integer(1)));
        assert_eq!(
            plan.assignments.get("names"),
            Some(&Value::Text("Alice".to_string()))
        );
    }

    #[test]
    fn insert_arity_mismatch_is_a_plan_error() {
        let statement = parse_sql("INSERT INTO users (id, names) VALUES (1)").unwrap();
        assert!(matches!(build_plan(statement), Err(Error::PlanError(_))));
    }

    #[test]
    fn update_carries_assignments_and_filters() {
        let plan = plan_for("UPDATE users SET age = 31 WHERE id = 1");
        assert_eq!(plan.kind, PlanKind::Update);
        assert_eq!(plan.assignments.get("age"), Some(&Value::Integer(31)));
        assert_eq!(plan.filters.len(), 1);
    }

    #[test]
    fn add_column_types_are_positional_with_text_default() {
        let plan = plan_for("ALTER TABLE users ADD COLUMN age INT, bio");
        assert_eq!(plan.kind, PlanKind::AddColumn);
        assert_eq!(plan.columns_to_add, vec!["age", "bio"]);
        assert_eq!(plan.column_types, vec![ColumnType::Int, ColumnType::Text]);
    }

    #[test]
    fn unknown_column_type_is_a_plan_error() {
        let statement = parse_sql("ALTER TABLE users ADD COLUMN age BIGSERIAL").unwrap();
        assert!(matches!(build_plan(statement), Err(Error::PlanError(_))));
    }

    #[test]
    fn operator_parsing_rejects_unknown_tokens() {
        assert_eq!(FilterOp::parse(">=").unwrap(), FilterOp::Ge);
        assert_eq!(
            FilterOp::parse("~=").unwrap_err(),
            Error::UnsupportedOperator("~=".to_string())
        );
    }
}
