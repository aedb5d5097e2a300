//! SQL parser implementation using nom
//!
//! This module turns SQL text into `Statement` values for the supported
//! operations: SELECT, INSERT, UPDATE, DELETE, CREATE TABLE, ALTER TABLE
//! ADD COLUMN, SHOW TABLES, and DESCRIBE. The parser knows nothing about
//! schemas; it only recognizes syntax and coerces literals into typed
//! scalars. The planner lowers a `Statement` into an executable `Plan`.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, multispace1},
    combinator::{map, opt, peek, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::plan::{Filter, FilterOp};
use crate::value::Value;

/// A parsed SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    AddColumn(AddColumnStatement),
    ShowTables,
    DescribeTable(DescribeTableStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Requested column names; the single entry `*` means all columns
    pub columns: Vec<String>,
    pub table: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddColumnStatement {
    pub table: String,
    pub columns: Vec<ColumnToAdd>,
}

/// One `name TYPE` pair from an ALTER TABLE ADD COLUMN list.
/// The type is optional in the syntax; an omitted type means TEXT.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnToAdd {
    pub name: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescribeTableStatement {
    pub table: String,
}

/// Parse one SQL statement. Trailing whitespace and an optional `;` are
/// tolerated; anything else after the statement is an error.
pub fn parse_sql(input: &str) -> Result<Statement> {
    let (remaining, statement) = parse_statement
        .parse(input)
        .map_err(|e| convert_nom_error(input, e))?;

    let remaining = remaining.trim_start();
    let remaining = remaining.strip_prefix(';').unwrap_or(remaining);
    if !remaining.trim().is_empty() {
        return Err(Error::ParseError(format!(
            "unexpected input after statement: '{}'",
            remaining.trim().chars().take(20).collect::<String>()
        )));
    }
    Ok(statement)
}

fn convert_nom_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len() - e.input.len();
            let (line, column) = calculate_position(input, position);
            let found = e.input.chars().take(10).collect::<String>();
            if found.is_empty() {
                Error::ParseError(format!(
                    "unexpected end of input at line {line}, column {column}"
                ))
            } else {
                Error::ParseError(format!(
                    "unexpected token at line {line}, column {column}: '{found}'"
                ))
            }
        }
        nom::Err::Incomplete(_) => Error::ParseError("incomplete input".to_string()),
    }
}

/// Calculate line and column from input position
fn calculate_position(input: &str, position: usize) -> (usize, usize) {
    let before = &input[..position.min(input.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(position + 1, |last_newline| position - last_newline);
    (line, column)
}

/// Parse a single SQL statement
fn parse_statement(input: &str) -> IResult<&str, Statement> {
    let (input, _) = multispace0.parse(input)?;

    // Guard each branch with a non-consuming peek on the leading keyword
    alt((
        preceded(peek(tag_no_case("SELECT")), parse_select),
        preceded(peek(tag_no_case("INSERT")), parse_insert),
        preceded(peek(tag_no_case("UPDATE")), parse_update),
        preceded(peek(tag_no_case("DELETE")), parse_delete),
        preceded(peek(tag_no_case("CREATE")), parse_create_table),
        preceded(peek(tag_no_case("ALTER")), parse_add_column),
        preceded(peek(tag_no_case("SHOW")), parse_show_tables),
        preceded(peek(tag_no_case("DESCRIBE")), parse_describe),
    ))
    .parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_")))))).parse(input)
}

// Comma with optional surrounding whitespace
fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0).parse(input)
}

fn parse_select(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("SELECT").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, columns) = parse_column_list.parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("FROM").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    let (input, filters) = opt(parse_where_clause).parse(input)?;

    Ok((
        input,
        Statement::Select(SelectStatement {
            columns,
            table: table.to_string(),
            filters: filters.unwrap_or_default(),
        }),
    ))
}

fn parse_column_list(input: &str) -> IResult<&str, Vec<String>> {
    // Handle the special case of "*" (all columns)
    if let Ok((input, _)) = char::<&str, nom::error::Error<&str>>('*').parse(input) {
        return Ok((input, vec!["*".to_string()]));
    }
    let (input, columns) = separated_list1(comma, parse_identifier).parse(input)?;
    Ok((input, columns.into_iter().map(str::to_string).collect()))
}

fn parse_insert(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("INSERT").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("INTO").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    let (input, _) = multispace0.parse(input)?;

    let (input, columns) = delimited(
        pair(char('('), multispace0),
        separated_list1(comma, parse_identifier),
        pair(multispace0, char(')')),
    )
    .parse(input)?;

    let (input, _) = delimited(multispace0, tag_no_case("VALUES"), multispace0).parse(input)?;
    let (input, values) = delimited(
        pair(char('('), multispace0),
        separated_list1(comma, parse_value),
        pair(multispace0, char(')')),
    )
    .parse(input)?;

    Ok((
        input,
        Statement::Insert(InsertStatement {
            table: table.to_string(),
            columns: columns.into_iter().map(str::to_string).collect(),
            values,
        }),
    ))
}

fn parse_update(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("UPDATE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("SET").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, assignments) = separated_list1(comma, parse_assignment).parse(input)?;
    let (input, filters) = opt(parse_where_clause).parse(input)?;

    Ok((
        input,
        Statement::Update(UpdateStatement {
            table: table.to_string(),
            assignments,
            filters: filters.unwrap_or_default(),
        }),
    ))
}

fn parse_assignment(input: &str) -> IResult<&str, Assignment> {
    let (input, column) = parse_identifier.parse(input)?;
    let (input, _) = delimited(multispace0, char('='), multispace0).parse(input)?;
    let (input, value) = parse_value.parse(input)?;
    Ok((
        input,
        Assignment {
            column: column.to_string(),
            value,
        },
    ))
}

fn parse_delete(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("DELETE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("FROM").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    let (input, filters) = opt(parse_where_clause).parse(input)?;

    Ok((
        input,
        Statement::Delete(DeleteStatement {
            table: table.to_string(),
            filters: filters.unwrap_or_default(),
        }),
    ))
}

fn parse_create_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("CREATE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("TABLE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;

    Ok((
        input,
        Statement::CreateTable(CreateTableStatement {
            table: table.to_string(),
        }),
    ))
}

// ALTER TABLE t ADD COLUMN name [TYPE] [, name [TYPE] ...]
fn parse_add_column(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("ALTER").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("TABLE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("ADD").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("COLUMN").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, columns) = separated_list1(comma, parse_column_to_add).parse(input)?;

    Ok((
        input,
        Statement::AddColumn(AddColumnStatement {
            table: table.to_string(),
            columns,
        }),
    ))
}

fn parse_column_to_add(input: &str) -> IResult<&str, ColumnToAdd> {
    let (input, name) = parse_identifier.parse(input)?;
    let (input, type_name) =
        opt(preceded(multispace1, parse_identifier)).parse(input)?;
    Ok((
        input,
        ColumnToAdd {
            name: name.to_string(),
            type_name: type_name.map(str::to_string),
        },
    ))
}

fn parse_show_tables(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("SHOW").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("TABLES").parse(input)?;
    Ok((input, Statement::ShowTables))
}

fn parse_describe(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tag_no_case("DESCRIBE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (input, table) = parse_identifier.parse(input)?;
    Ok((
        input,
        Statement::DescribeTable(DescribeTableStatement {
            table: table.to_string(),
        }),
    ))
}

fn parse_where_clause(input: &str) -> IResult<&str, Vec<Filter>> {
    let (input, _) = multispace1.parse(input)?;
    let (input, _) = tag_no_case("WHERE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    separated_list1(
        delimited(multispace1, tag_no_case("AND"), multispace1),
        parse_filter,
    )
    .parse(input)
}

fn parse_filter(input: &str) -> IResult<&str, Filter> {
    let (input, column) = parse_identifier.parse(input)?;
    let (input, op) = delimited(multispace0, parse_filter_op, multispace0).parse(input)?;
    let (input, value) = parse_value.parse(input)?;
    Ok((
        input,
        Filter {
            column: column.to_string(),
            op,
            value,
        },
    ))
}

// Two-character operators must be tried before their one-character prefixes
fn parse_filter_op(input: &str) -> IResult<&str, FilterOp> {
    alt((
        map(tag(">="), |_| FilterOp::Ge),
        map(tag("<="), |_| FilterOp::Le),
        map(tag("!="), |_| FilterOp::Ne),
        map(tag("="), |_| FilterOp::Eq),
        map(tag("<"), |_| FilterOp::Lt),
        map(tag(">"), |_| FilterOp::Gt),
    ))
    .parse(input)
}

// Literals: DATE '2024-05-01', 'text', 1.5, 42, TRUE/FALSE
fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        parse_date_literal,
        map(parse_string_literal, Value::Text),
        map(parse_float, Value::Float),
        map(parse_integer, Value::Integer),
        map(tag_no_case("TRUE"), |_| Value::Bool(true)),
        map(tag_no_case("FALSE"), |_| Value::Bool(false)),
    ))
    .parse(input)
}

fn parse_date_literal(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag_no_case("DATE").parse(input)?;
    let (input, _) = multispace1.parse(input)?;
    let (rest, text) = parse_string_literal.parse(input)?;
    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
    })?;
    Ok((rest, Value::Date(date)))
}

// Parse a single-quoted string literal with escape sequence support
fn parse_string_literal(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\'').parse(input)?;
    let mut result = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => return Ok((chars.as_str(), result)),
            '\\' => match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    // Unknown escape sequence, treat as literal
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            },
            _ => result.push(ch),
        }
    }

    // The string was never closed
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn parse_integer(input: &str) -> IResult<&str, i64> {
    let (input, int_str) = recognize(pair(opt(char('-')), digit1)).parse(input)?;
    let value = int_str.parse::<i64>().map_err(|_e| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((input, value))
}

fn parse_float(input: &str) -> IResult<&str, f64> {
    let (input, float_str) =
        recognize((opt(char('-')), digit1, char('.'), digit1)).parse(input)?;
    let value = float_str.parse::<f64>().map_err(|_e| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
    })?;
    Ok((input, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_star() {
        let statement = parse_sql("SELECT * FROM users").unwrap();
        assert_eq!(
            statement,
            Statement::Select(SelectStatement {
                columns: vec!["*".to_string()],
                table: "users".to_string(),
                filters: vec![],
            })
        );
    }

    #[test]
    fn parses_select_with_columns_and_filters() {
        let statement =
            parse_sql("select id, names from users where age >= 25 AND names = 'Bob';").unwrap();
        match statement {
            Statement::Select(select) => {
                assert_eq!(select.columns, vec!["id", "names"]);
                assert_eq!(select.table, "users");
                assert_eq!(
                    select.filters,
                    vec![
                        Filter {
                            column: "age".to_string(),
                            op: FilterOp::Ge,
                            value: Value::Integer(25),
                        },
                        Filter {
                            column: "names".to_string(),
                            op: FilterOp::Eq,
                            value: Value::Text("Bob".to_string()),
                        },
                    ]
                );
            }
            other => panic!("expected Select, got {other:?}"),
        }
    }

    #[test]
    fn parses_insert() {
        let statement =
            parse_sql("INSERT INTO users (id, names, age) VALUES (1, 'Alice', 30)").unwrap();
        assert_eq!(
            statement,
            Statement::Insert(InsertStatement {
                table: "users".to_string(),
                columns: vec!["id".to_string(), "names".to_string(), "age".to_string()],
                values: vec![
                    Value::Integer(1),
                    Value::Text("Alice".to_string()),
                    Value::Integer(30),
                ],
            })
        );
    }

    #[test]
    fn parses_update_with_where() {
        let statement = parse_sql("UPDATE users SET names = 'Alicia', age = 31 WHERE id = 1")
            .unwrap();
        match statement {
            Statement::Update(update) => {
                assert_eq!(update.table, "users");
                assert_eq!(update.assignments.len(), 2);
                assert_eq!(update.assignments[0].column, "names");
                assert_eq!(
                    update.assignments[0].value,
                    Value::Text("Alicia".to_string())
                );
                assert_eq!(update.filters.len(), 1);
                assert_eq!(update.filters[0].op, FilterOp::Eq);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn parses_delete() {
        let statement = parse_sql("DELETE FROM users WHERE id != 2").unwrap();
        assert_eq!(
            statement,
            Statement::Delete(DeleteStatement {
                table: "users".to_string(),
                filters: vec![Filter {
                    column: "id".to_string(),
                    op: FilterOp::Ne,
                    value: Value::Integer(2),
                }],
            })
        );
    }

    #[test]
    fn parses_ddl_statements() {
        assert_eq!(
            parse_sql("CREATE TABLE users;").unwrap(),
            Statement::CreateTable(CreateTableStatement {
                table: "users".to_string()
            })
        );
        assert_eq!(
            parse_sql("ALTER TABLE users ADD COLUMN age INT, bio").unwrap(),
            Statement::AddColumn(AddColumnStatement {
                table: "users".to_string(),
                columns: vec![
                    ColumnToAdd {
                        name: "age".to_string(),
                        type_name: Some("INT".to_string()),
                    },
                    ColumnToAdd {
                        name: "bio".to_string(),
                        type_name: None,
                    },
                ],
            })
        );
        assert_eq!(parse_sql("SHOW TABLES").unwrap(), Statement::ShowTables);
        assert_eq!(
            parse_sql("DESCRIBE users").unwrap(),
            Statement::DescribeTable(DescribeTableStatement {
                table: "users".to_string()
            })
        );
    }

    #[test]
    fn parses_literals() {
        let statement = parse_sql(
            "INSERT INTO t (a, b, c, d) VALUES (-4, 2.5, TRUE, DATE '2024-05-01')",
        )
        .unwrap();
        match statement {
            Statement::Insert(insert) => {
                assert_eq!(insert.values[0], Value::Integer(-4));
                assert_eq!(insert.values[1], Value::Float(2.5));
                assert_eq!(insert.values[2], Value::Bool(true));
                assert_eq!(
                    insert.values[3],
                    Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
                );
            }
            other => panic!("expected Insert, got {other:?}"),
        }
    }

    #[test]
    fn string_escapes() {
        let statement = parse_sql("INSERT INTO t (a) VALUES ('It\\'s\\n')").unwrap();
        match statement {
            Statement::Insert(insert) => {
                assert_eq!(insert.values[0], Value::Text("It's\n".to_string()));
            }
            other => panic!("expected Insert, got {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_sql("SELEC * FROM users").is_err());
        assert!(parse_sql("SELECT * FROM users garbage").is_err());
        assert!(parse_sql("INSERT INTO t (a) VALUES ('unterminated)").is_err());
        assert!(parse_sql("INSERT INTO t (a) VALUES (DATE '2024-13-01')").is_err());
    }
}
