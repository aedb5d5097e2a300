//! Plan-execution engine
//!
//! The engine interprets one `Plan` at a time against a `Database`: it
//! resolves the target table, validates every column the plan references
//! against the live schema before touching anything, performs the scan,
//! index lookup, or mutation, and returns result rows. Mutating operations
//! return the affected rows; DDL operations return no rows.
//!
//! The engine runs one plan to completion before returning; there is no
//! suspension point and no background work. It is not safe for concurrent
//! mutation — a front end serving multiple clients must hold a lock around
//! each `execute_plan` call.

use crate::catalog::Database;
use crate::error::{Error, Result};
use crate::parser::parse_sql;
use crate::plan::{build_plan, Filter, FilterOp, Plan, PlanKind, ALL_COLUMNS};
use crate::table::{Column, Row, Table};
use crate::value::{ColumnType, Value};

/// Executes query plans against a database
pub struct Engine {
    db: Database,
}

impl Engine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Direct access to the catalog, for front ends and seeding code that
    /// declare schemas programmatically (primary-key and unique flags are
    /// not expressible in a plan)
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Parse, plan, and execute one SQL statement
    pub fn execute_sql(&mut self, sql: &str) -> Result<Vec<Row>> {
        let statement = parse_sql(sql)?;
        let plan = build_plan(statement)?;
        self.execute_plan(&plan)
    }

    /// Execute a single plan, returning result rows.
    ///
    /// Select returns the matching (possibly projected) rows; Insert,
    /// Update, and Delete return the affected rows; DDL and listing
    /// operations return synthetic or no rows.
    pub fn execute_plan(&mut self, plan: &Plan) -> Result<Vec<Row>> {
        match plan.kind {
            PlanKind::CreateTable => {
                self.db.create_table(&plan.table_name)?;
                Ok(Vec::new())
            }
            PlanKind::AddColumn => self.execute_add_column(plan),
            PlanKind::ShowTables => Ok(self.execute_show_tables()),
            PlanKind::DescribeTable => self.execute_describe(plan),
            PlanKind::Select => self.execute_select(plan),
            PlanKind::Insert => self.execute_insert(plan),
            PlanKind::Update => self.execute_update(plan),
            PlanKind::Delete => self.execute_delete(plan),
        }
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.db
            .get_table_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.db
            .get_table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn execute_add_column(&mut self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table_mut(&plan.table_name)?;
        for (position, name) in plan.columns_to_add.iter().enumerate() {
            // The type is positional; a missing entry means TEXT
            let column_type = plan
                .column_types
                .get(position)
                .copied()
                .unwrap_or(ColumnType::Text);
            table.add_column(Column::new(name.clone(), column_type))?;
        }
        Ok(Vec::new())
    }

    fn execute_show_tables(&self) -> Vec<Row> {
        self.db
            .table_names()
            .into_iter()
            .map(|name| {
                let mut row = Row::new();
                row.set("table_name", Value::Text(name.to_string()));
                row
            })
            .collect()
    }

    fn execute_describe(&self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table(&plan.table_name)?;
        Ok(table
            .columns()
            .iter()
            .map(|column| {
                let mut row = Row::new();
                row.set("name", Value::Text(column.name.clone()));
                row.set("type", Value::Text(column.column_type.to_string()));
                row
            })
            .collect())
    }

    fn execute_select(&self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table(&plan.table_name)?;
        Self::check_filter_columns(table, &plan.filters)?;

        let project_all = plan.columns.len() == 1 && plan.columns[0] == ALL_COLUMNS;
        if !project_all {
            for column in &plan.columns {
                if !table.has_column(column) {
                    return Err(Error::ColumnNotFound(
                        table.name().to_string(),
                        column.clone(),
                    ));
                }
            }
        }

        let mut results = Vec::new();
        for row in table.rows() {
            if !row_matches(row, &plan.filters)? {
                continue;
            }
            if project_all {
                results.push(row.clone());
            } else {
                // Build a fresh row holding only the requested fields; a
                // matching row that lacks one (possible after ADD COLUMN)
                // is an error, not a silent null
                let mut projected = Row::new();
                for column in &plan.columns {
                    let value = row.get(column).ok_or_else(|| {
                        Error::ColumnNotFound(table.name().to_string(), column.clone())
                    })?;
                    projected.set(column.clone(), value.clone());
                }
                results.push(projected);
            }
        }
        Ok(results)
    }

    fn execute_insert(&mut self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table_mut(&plan.table_name)?;
        let mut row = Row::new();
        for (column, value) in &plan.assignments {
            if !table.has_column(column) {
                return Err(Error::ColumnNotFound(
                    table.name().to_string(),
                    column.clone(),
                ));
            }
            row.set(column.clone(), value.clone());
        }
        table.insert(row.clone())?;
        Ok(vec![row])
    }

    fn execute_update(&mut self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table_mut(&plan.table_name)?;
        Self::check_filter_columns(table, &plan.filters)?;
        // Validate every assignment column before touching any row, so a
        // failed update cannot leave partial writes behind
        for column in plan.assignments.keys() {
            if !table.has_column(column) {
                return Err(Error::ColumnNotFound(
                    table.name().to_string(),
                    column.clone(),
                ));
            }
        }

        let mut matching = Vec::new();
        for (position, row) in table.rows().iter().enumerate() {
            if row_matches(row, &plan.filters)? {
                matching.push(position);
            }
        }
        // A primary-key reassignment that would collide is rejected here,
        // before the first row is written
        table.check_pk_reassignment(&matching, &plan.assignments)?;

        let mut updated = Vec::with_capacity(matching.len());
        for position in matching {
            table.apply_updates_at(position, &plan.assignments);
            updated.push(table.rows()[position].clone());
        }
        Ok(updated)
    }

    fn execute_delete(&mut self, plan: &Plan) -> Result<Vec<Row>> {
        let table = self.table_mut(&plan.table_name)?;
        Self::check_filter_columns(table, &plan.filters)?;

        let mut matches = Vec::with_capacity(table.row_count());
        for row in table.rows() {
            matches.push(row_matches(row, &plan.filters)?);
        }
        Ok(table.remove_matching(&matches))
    }

    /// Eagerly validate a plan's declared filter columns against the
    /// schema, before any row is scanned or mutated
    fn check_filter_columns(table: &Table, filters: &[Filter]) -> Result<()> {
        for filter in filters {
            if !table.has_column(&filter.column) {
                return Err(Error::ColumnNotFound(
                    table.name().to_string(),
                    filter.column.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Does `row` satisfy every filter? Logical AND with short circuit on the
/// first failing predicate. A row missing the filtered field fails the
/// match; it does not fail the operation.
fn row_matches(row: &Row, filters: &[Filter]) -> Result<bool> {
    for filter in filters {
        let value = match row.get(&filter.column) {
            Some(value) => value,
            None => return Ok(false),
        };
        let matched = match filter.op {
            FilterOp::Eq => value == &filter.value,
            FilterOp::Ne => value != &filter.value,
            FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge => {
                let left = numeric(value, filter)?;
                let right = numeric(&filter.value, filter)?;
                match filter.op {
                    FilterOp::Lt => left < right,
                    FilterOp::Le => left <= right,
                    FilterOp::Gt => left > right,
                    FilterOp::Ge => left >= right,
                    _ => unreachable!(),
                }
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Ordering operators compare numerically; anything non-numeric on either
/// side is an error result, never a crash
fn numeric(value: &Value, filter: &Filter) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::UnsupportedComparison(format!(
            "operator '{}' on non-numeric {} value in column '{}'",
            filter.op,
            value.type_name(),
            filter.column
        ))
    })
}
