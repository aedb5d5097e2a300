use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::fs;
use std::process;

use mica::{
    build_plan, parse_sql, Column, ColumnType, Database, Engine, Plan, PlanKind, Row, Value,
    ALL_COLUMNS,
};

#[derive(Parser)]
#[command(name = "mica")]
#[command(about = "mica CLI - an in-memory relational data store")]
#[command(version)]
struct Cli {
    /// Execute SQL command(s) and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Read and execute SQL script from file
    #[arg(short, long)]
    file: Option<String>,

    /// Load the sample `users` table before starting
    #[arg(long)]
    seed: bool,

    /// Output format (table, csv, json)
    #[arg(long, default_value = "table")]
    mode: String,

    /// Quiet mode (output results only)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// Buffers input lines into complete `;`-terminated statements, ignoring
/// semicolons inside single-quoted strings and `--` comments.
#[derive(Default)]
struct SqlChunker {
    buffer: String,
    in_quote: bool,
    escape_next: bool,
}

impl SqlChunker {
    fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.in_quote = false;
        self.escape_next = false;
    }

    fn has_pending(&self) -> bool {
        self.in_quote || !self.buffer.trim().is_empty()
    }

    fn feed_line(&mut self, line: &str) -> Vec<String> {
        let mut statements = Vec::new();
        let mut chars = line.trim_end_matches('\r').chars().peekable();

        while let Some(ch) = chars.next() {
            if !self.in_quote && ch == '-' && matches!(chars.peek(), Some('-')) {
                break; // rest of the line is a comment
            }

            self.buffer.push(ch);

            if self.in_quote {
                if self.escape_next {
                    self.escape_next = false;
                } else if ch == '\\' {
                    self.escape_next = true;
                } else if ch == '\'' {
                    self.in_quote = false;
                }
                continue;
            }

            match ch {
                '\'' => self.in_quote = true,
                ';' => {
                    let statement = self.buffer.trim().to_string();
                    if !statement.is_empty() {
                        statements.push(statement);
                    }
                    self.buffer.clear();
                }
                _ => {}
            }
        }

        if self.has_pending() {
            self.buffer.push('\n');
        }
        statements
    }

    fn feed_text(&mut self, text: &str) -> Vec<String> {
        let mut statements = Vec::new();
        for line in text.split('\n') {
            statements.extend(self.feed_line(line));
        }
        statements
    }

    fn take_pending_statement(&mut self) -> Option<String> {
        if self.in_quote {
            return None;
        }
        let trimmed = self.buffer.trim();
        if trimmed.is_empty() {
            return None;
        }
        let statement = trimmed.to_string();
        self.buffer.clear();
        Some(statement)
    }
}

fn format_value(value: &Value) -> String {
    value.to_string()
}

/// Column order for rendering: the schema's order for `*`, the requested
/// order otherwise, and fixed headers for the listing operations
fn result_columns(engine: &Engine, plan: &Plan) -> Vec<String> {
    match plan.kind {
        PlanKind::ShowTables => vec!["table_name".to_string()],
        PlanKind::DescribeTable => vec!["name".to_string(), "type".to_string()],
        _ => {
            let star = plan.columns.len() == 1 && plan.columns[0] == ALL_COLUMNS;
            if plan.columns.is_empty() || star {
                engine
                    .database()
                    .get_table(&plan.table_name)
                    .map(|t| t.columns().iter().map(|c| c.name.clone()).collect())
                    .unwrap_or_default()
            } else {
                plan.columns.clone()
            }
        }
    }
}

fn format_table_output(columns: &[String], rows: &[Row]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (i, column) in columns.iter().enumerate() {
            if let Some(value) = row.get(column) {
                widths[i] = widths[i].max(format_value(value).len());
            }
        }
    }

    let mut output = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            output.push_str(" | ");
        }
        output.push_str(&format!("{:width$}", column, width = widths[i]));
    }
    output.push('\n');
    for (i, &width) in widths.iter().enumerate() {
        if i > 0 {
            output.push_str("-+-");
        }
        output.push_str(&"-".repeat(width));
    }
    output.push('\n');
    for row in rows {
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                output.push_str(" | ");
            }
            let cell = row.get(column).map(format_value).unwrap_or_default();
            output.push_str(&format!("{:width$}", cell, width = widths[i]));
        }
        output.push('\n');
    }
    output
}

fn format_csv_output(columns: &[String], rows: &[Row]) -> String {
    let mut output = String::new();
    output.push_str(&columns.join(","));
    output.push('\n');
    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .map(|column| {
                let cell = row.get(column).map(format_value).unwrap_or_default();
                escape_csv_field(&cell)
            })
            .collect();
        output.push_str(&line.join(","));
        output.push('\n');
    }
    output
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_json_output(columns: &[String], rows: &[Row]) -> String {
    let objects: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for column in columns {
                let json = match row.get(column) {
                    Some(Value::Integer(i)) => serde_json::json!(i),
                    Some(Value::Float(f)) => serde_json::json!(f),
                    Some(Value::Bool(b)) => serde_json::json!(b),
                    Some(Value::Text(s)) => serde_json::json!(s),
                    Some(Value::Date(d)) => serde_json::json!(d.to_string()),
                    None => serde_json::Value::Null,
                };
                object.insert(column.clone(), json);
            }
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
}

/// The sample data set: a `users` table with a primary key, as a quick way
/// to try the REPL on a schema plans cannot declare (PK flags are storage
/// API only)
fn seed(engine: &mut Engine) -> mica::Result<()> {
    let users = engine.database_mut().create_table("users")?;
    users.add_column(Column::new("id", ColumnType::Int).primary_key())?;
    users.add_column(Column::new("names", ColumnType::Text))?;
    users.add_column(Column::new("age", ColumnType::Int))?;

    engine.execute_sql("INSERT INTO users (id, names, age) VALUES (1, 'Alice', 30)")?;
    engine.execute_sql("INSERT INTO users (id, names, age) VALUES (2, 'Bob', 25)")?;
    Ok(())
}

struct CliState {
    engine: Engine,
    output_format: OutputFormat,
    sql_chunker: SqlChunker,
}

impl CliState {
    fn new() -> Self {
        Self {
            engine: Engine::new(Database::new()),
            output_format: OutputFormat::Table,
            sql_chunker: SqlChunker::new(),
        }
    }

    fn execute_sql(&mut self, sql: &str) -> mica::Result<()> {
        let statement = parse_sql(sql)?;
        let plan = build_plan(statement)?;
        let rows = self.engine.execute_plan(&plan)?;

        match plan.kind {
            PlanKind::Select | PlanKind::ShowTables | PlanKind::DescribeTable => {
                if rows.is_empty() {
                    println!("(no rows)");
                } else {
                    let columns = result_columns(&self.engine, &plan);
                    let rendered = match self.output_format {
                        OutputFormat::Table => format_table_output(&columns, &rows),
                        OutputFormat::Csv => format_csv_output(&columns, &rows),
                        OutputFormat::Json => format_json_output(&columns, &rows),
                    };
                    print!("{rendered}");
                    if self.output_format == OutputFormat::Json {
                        println!();
                    }
                }
            }
            PlanKind::Insert | PlanKind::Update | PlanKind::Delete => {
                println!("{} row(s) affected", rows.len());
            }
            PlanKind::CreateTable | PlanKind::AddColumn => {
                println!("OK");
            }
        }
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut chunker = SqlChunker::new();
        for statement in chunker.feed_text(script) {
            self.execute_sql(&statement)?;
        }
        if chunker.in_quote {
            return Err("incomplete SQL statement: unclosed quote".into());
        }
        if let Some(pending) = chunker.take_pending_statement() {
            self.execute_sql(&pending)?;
        }
        Ok(())
    }

    fn handle_dot_command(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied().unwrap_or("") {
            ".quit" | ".exit" | ".q" => return true,
            ".help" | ".h" => {
                println!("Available dot commands:");
                println!("  .help/.h        - Show this help");
                println!("  .tables/.t      - List all tables");
                println!("  .schema <table> - Show table schema");
                println!("  .mode table|csv|json - Set output format");
                println!("  .quit/.exit/.q  - Exit REPL");
                println!();
                println!("SQL statements can span multiple lines. End with ';' to execute.");
            }
            ".tables" | ".t" => {
                let names = self.engine.database().table_names();
                if names.is_empty() {
                    println!("No tables found");
                } else {
                    for name in names {
                        println!("{name}");
                    }
                }
            }
            ".schema" => match parts.get(1) {
                Some(name) => match self.engine.database().get_table(name) {
                    Some(table) => {
                        println!("Table {}:", table.name());
                        for column in table.columns() {
                            let mut line = format!("  {} {}", column.name, column.column_type);
                            if column.is_primary_key {
                                line.push_str(" PRIMARY KEY");
                            }
                            if column.is_unique {
                                line.push_str(" UNIQUE");
                            }
                            println!("{line}");
                        }
                    }
                    None => println!("Table '{name}' not found"),
                },
                None => println!("Usage: .schema <table_name>"),
            },
            ".mode" => match parts.get(1).copied() {
                Some("table") => self.output_format = OutputFormat::Table,
                Some("csv") => self.output_format = OutputFormat::Csv,
                Some("json") => self.output_format = OutputFormat::Json,
                _ => println!("Usage: .mode table|csv|json"),
            },
            other => {
                eprintln!("Error: Unknown command '{other}'. Type '.help' for available commands.");
            }
        }
        false
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut state = CliState::new();
    match cli.mode.as_str() {
        "table" => state.output_format = OutputFormat::Table,
        "csv" => state.output_format = OutputFormat::Csv,
        "json" => state.output_format = OutputFormat::Json,
        _ => {
            eprintln!(
                "Error: Invalid output mode '{}'. Use table, csv, or json",
                cli.mode
            );
            process::exit(1);
        }
    }

    if cli.seed {
        seed(&mut state.engine)?;
        if !cli.quiet {
            eprintln!("Seeded sample table 'users'");
        }
    }

    if let Some(command) = cli.command {
        if let Err(e) = state.execute_script(&command) {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        return Ok(());
    }

    if let Some(file) = cli.file {
        let content = fs::read_to_string(&file)?;
        if let Err(e) = state.execute_script(&content) {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        return Ok(());
    }

    if !cli.quiet {
        println!("mica v{}", env!("CARGO_PKG_VERSION"));
        println!("Type '.help' for available commands, '.quit' to exit");
        println!("Data lives in memory only; exiting discards everything.");
    }

    let config = Config::default();
    let mut rl = Editor::<(), rustyline::history::DefaultHistory>::with_config(config)?;

    loop {
        let prompt = if state.sql_chunker.has_pending() {
            "   -> "
        } else {
            "mica> "
        };

        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Err(e) = rl.add_history_entry(&line) {
                    eprintln!("Warning: Could not add to history: {e}");
                }

                if trimmed.starts_with('.') && !state.sql_chunker.has_pending() {
                    if state.handle_dot_command(trimmed) {
                        break;
                    }
                    continue;
                }

                for statement in state.sql_chunker.feed_line(&line) {
                    if let Err(e) = state.execute_sql(&statement) {
                        eprintln!("Error: {e}");
                        state.sql_chunker.clear();
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                state.sql_chunker.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_statements_on_single_line() {
        let mut chunker = SqlChunker::new();
        let statements = chunker.feed_line("SELECT 1; SELECT 2;");
        assert_eq!(statements, vec!["SELECT 1;", "SELECT 2;"]);
    }

    #[test]
    fn preserves_multiline_statements() {
        let mut chunker = SqlChunker::new();
        assert!(chunker.feed_line("SELECT names").is_empty());
        let statements = chunker.feed_line("FROM users;");
        assert_eq!(statements, vec!["SELECT names\nFROM users;"]);
    }

    #[test]
    fn ignores_semicolons_inside_quotes() {
        let mut chunker = SqlChunker::new();
        let statements = chunker.feed_line("INSERT INTO t (a) VALUES ('x;y');");
        assert_eq!(statements, vec!["INSERT INTO t (a) VALUES ('x;y');"]);
    }

    #[test]
    fn strips_line_comments() {
        let mut chunker = SqlChunker::new();
        assert!(chunker.feed_line("-- just a comment").is_empty());
        assert!(chunker.feed_line("SELECT 1 -- trailing").is_empty());
        let statements = chunker.feed_line(";");
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("SELECT 1"));
    }

    #[test]
    fn pending_statement_not_available_when_in_quotes() {
        let mut chunker = SqlChunker::new();
        assert!(chunker.feed_line("SELECT 'unterminated").is_empty());
        assert!(chunker.in_quote);
        assert!(chunker.take_pending_statement().is_none());
    }

    #[test]
    fn seeded_engine_serves_queries() {
        let mut engine = Engine::new(Database::new());
        seed(&mut engine).unwrap();
        let rows = engine.execute_sql("SELECT names FROM users").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn table_output_aligns_columns() {
        let columns = vec!["id".to_string(), "names".to_string()];
        let rows = vec![
            Row::from([("id", Value::Integer(1)), ("names", Value::Text("Alice".into()))]),
            Row::from([("id", Value::Integer(2)), ("names", Value::Text("Bo".into()))]),
        ];
        let output = format_table_output(&columns, &rows);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "id | names");
        assert_eq!(lines[2], "1  | Alice");
        assert_eq!(lines[3], "2  | Bo   ");
    }

    #[test]
    fn csv_output_escapes_fields() {
        let columns = vec!["names".to_string()];
        let rows = vec![Row::from([("names", Value::Text("a,b".into()))])];
        let output = format_csv_output(&columns, &rows);
        assert_eq!(output, "names\n\"a,b\"\n");
    }

    #[test]
    fn json_output_is_typed() {
        let columns = vec!["id".to_string(), "active".to_string()];
        let rows = vec![Row::from([
            ("id", Value::Integer(1)),
            ("active", Value::Bool(true)),
        ])];
        let output = format_json_output(&columns, &rows);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["id"], serde_json::json!(1));
        assert_eq!(parsed[0]["active"], serde_json::json!(true));
    }
}
