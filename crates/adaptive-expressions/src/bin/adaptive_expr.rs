//! Ad hoc formula evaluation CLI: parses one expression, seeds a
//! [`SimpleObjectMemory`] from a JSON document (file or stdin), evaluates,
//! and prints the result (or the error) as JSON.
//!
//! A thin `clap`-driven entry point over the library crate, with
//! `tracing-subscriber` wired to `RUST_LOG`.

use std::io::Read;
use std::path::PathBuf;

use adaptive_expressions::json::{value_from_json, value_to_json};
use adaptive_expressions::{parse, Options, SimpleObjectMemory, Value};
use clap::Parser;

/// Evaluate an adaptive expression against a JSON memory document.
#[derive(Parser)]
#[command(name = "adaptive-expr", version, about)]
struct Cli {
    /// The expression source, e.g. `add(one, two)`.
    expression: String,

    /// Path to a JSON document used as the memory scope. Reads stdin when
    /// omitted.
    #[arg(short, long)]
    memory: Option<PathBuf>,

    /// Print the paths the expression reads (`Expression::references`)
    /// instead of evaluating it.
    #[arg(long)]
    references: bool,
}

fn read_memory_json(path: Option<&PathBuf>) -> anyhow::Result<serde_json::Value> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            if buf.trim().is_empty() {
                "{}".to_string()
            } else {
                buf
            }
        }
    };
    Ok(serde_json::from_str(&text)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let expr = parse(&cli.expression).map_err(|e| anyhow::anyhow!("{e}"))?;

    if cli.references {
        let mut refs: Vec<String> = expr.references().into_iter().collect();
        refs.sort();
        println!("{}", serde_json::to_string_pretty(&refs)?);
        return Ok(());
    }

    let scope_json = read_memory_json(cli.memory.as_ref())?;
    let root: Value = value_from_json(scope_json);
    let mut memory = SimpleObjectMemory::new(root);

    let (value, error) = expr.try_evaluate(&mut memory, &Options::new());
    match error {
        Some(error) => {
            eprintln!("{}: {error}", error.kind);
            std::process::exit(1);
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&value_to_json(&value))?);
            Ok(())
        }
    }
}
