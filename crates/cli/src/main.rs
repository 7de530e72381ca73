//! cellvm CLI
//!
//! Runs a stack program against a fresh context and prints both stacks.
//!
//! ```text
//! $ cellvm 1 2 3 rot
//! data: 2 3 1
//! call:
//! ```

mod program;

use cellvm_core::{Cell, Context, StackConfig};
use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser, Debug)]
#[command(name = "cellvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run stack programs on the cellvm data and call stacks", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Stack capacity configuration (TOML with a [stacks] table)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Data stack capacity in cells, header included (overrides config)
    #[arg(long, value_name = "CELLS")]
    data_size: Option<usize>,

    /// Call stack capacity in cells, header included (overrides config)
    #[arg(long, value_name = "CELLS")]
    call_size: Option<usize>,

    /// Log every executed word (overrides RUST_LOG)
    #[arg(long)]
    trace: bool,

    /// Program words: integers, t, f, or primitive names
    #[arg(required = true, allow_hyphen_values = true)]
    program: Vec<String>,
}

/// Resolve capacities: config file (or environment), then flag overrides
fn load_config(cli: &Cli) -> Result<StackConfig, cellvm_core::ConfigError> {
    let base = match &cli.config {
        Some(path) => StackConfig::from_file(path)?,
        None => StackConfig::from_env(),
    };
    StackConfig::new(
        cli.data_size.unwrap_or(base.data_capacity()),
        cli.call_size.unwrap_or(base.call_capacity()),
    )
}

fn format_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_stacks(ctx: &Context) {
    match (ctx.datastack_cells(), ctx.callstack_cells()) {
        (Ok(data), Ok(call)) => {
            println!("data: {}", format_cells(data));
            println!("call: {}", format_cells(call));
        }
        (Err(e), _) | (_, Err(e)) => eprintln!("Error: cannot read stacks: {}", e),
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.trace {
        EnvFilter::new("cellvm=trace,cellvm_core=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let words = match program::parse(cli.program.iter().map(String::as_str)) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let mut ctx = Context::init_stacks(config);
    let result = program::run(&mut ctx, &words);
    print_stacks(&ctx);
    if let Err(fault) = result {
        eprintln!("Error: {}", fault);
        process::exit(1);
    }
}
