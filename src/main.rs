use std::collections::BTreeMap;
use std::process::ExitCode;

use dyntable::cli::{Cli, Command, OutputFormat};
use dyntable::engine::{EngineConfig, EngineError, ModelEngine, PhysicalColumn};
use dyntable::storage::row::{Row, Value};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.downcast_ref::<EngineError>()
                .is_some_and(EngineError::is_client_error)
            {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig {
        table_prefix: cli.table_prefix.clone(),
        default_char_length: cli.char_length,
    };
    let engine = ModelEngine::new(&cli.db, config)?;

    match &cli.command {
        Command::CreateTable { fields } => {
            let fields: BTreeMap<String, String> = serde_json::from_str(fields)?;
            let id = engine.create_model(&fields)?;
            println!("{}", serde_json::json!({ "id": id }));
        }
        Command::UpdateTable { id, fields } => {
            let fields: BTreeMap<String, String> = serde_json::from_str(fields)?;
            engine.update_model(*id, &fields)?;
            println!("{}", serde_json::json!({ "id": id }));
        }
        Command::ShowTable { id } => {
            let shape = engine.physical_shape(*id)?;
            print_shape(&shape, cli.format);
        }
        Command::InsertRow { id, values } => {
            let values = parse_row_values(values)?;
            let row_id = engine.insert_row(*id, &values)?;
            println!("{}", serde_json::json!({ "id": row_id }));
        }
        Command::ListRows { id } => {
            let rows = engine.list_rows(*id)?;
            let shape = engine.physical_shape(*id)?;
            print_rows(&shape, &rows, cli.format);
        }
    }

    Ok(())
}

fn parse_row_values(json: &str) -> Result<BTreeMap<String, Value>, Box<dyn std::error::Error>> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut values = BTreeMap::new();
    for (name, scalar) in raw {
        let value = Value::from_json(&scalar)
            .ok_or_else(|| format!("unsupported value for column {}: {}", name, scalar))?;
        values.insert(name, value);
    }
    Ok(values)
}

fn print_shape(shape: &[PhysicalColumn], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let columns: Vec<serde_json::Value> = shape
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "type": c.kind.name(),
                        "sql_type": c.spec.sql_type,
                        "nullable": c.spec.nullable,
                    })
                })
                .collect();
            println!("{}", serde_json::Value::Array(columns));
        }
        OutputFormat::Table => {
            let width = shape.iter().map(|c| c.name.len()).max().unwrap_or(0);
            for column in shape {
                println!(
                    "{:width$}  {} ({})",
                    column.name,
                    column.kind.name(),
                    column.spec.sql_type,
                    width = width
                );
            }
            println!("({} columns)", shape.len());
        }
    }
}

fn print_rows(shape: &[PhysicalColumn], rows: &[Row], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
            println!("{}", serde_json::Value::Array(rows));
        }
        OutputFormat::Table => print_row_table(shape, rows),
    }
}

fn print_row_table(shape: &[PhysicalColumn], rows: &[Row]) {
    if rows.is_empty() {
        println!("(0 rows)");
        return;
    }

    let mut headers = vec!["id".to_string()];
    headers.extend(shape.iter().map(|c| c.name.clone()));

    // Calculate column widths
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let max_value_width = rows
                .iter()
                .map(|row| {
                    if i == 0 {
                        row.id.to_string().len()
                    } else {
                        row.values
                            .get(i - 1)
                            .map(|(_, v)| v.to_string().len())
                            .unwrap_or(0)
                    }
                })
                .max()
                .unwrap_or(0);
            header.len().max(max_value_width)
        })
        .collect();

    let header: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header.join(" | "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("-+-"));

    for row in rows {
        let mut cells = vec![format!("{:width$}", row.id, width = widths[0])];
        cells.extend(
            row.values
                .iter()
                .enumerate()
                .map(|(i, (_, v))| format!("{:width$}", v, width = widths[i + 1])),
        );
        println!("{}", cells.join(" | "));
    }

    println!("({} rows)", rows.len());
}
