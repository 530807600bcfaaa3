use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use atmc::{util::fmt::tree, Atmc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "atmc")]
#[command(about = "Compiles a configuration file and its imports into JSON")]
struct Args {
    /// The root file.
    path: PathBuf,

    /// Pretty prints the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Prints the resolved tree instead of JSON.
    #[arg(long)]
    tree: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("ATMC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let output = match compile(&args) {
        Ok(output) => output,
        Err(error) => {
            eprintln!("error: {}", error.chain());
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = io::stdout().lock().write_all(&output) {
        eprintln!("error: failed to write the output: {error}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn compile(args: &Args) -> atmc::Result<Vec<u8>> {
    let atmc = Atmc::new();

    if args.tree {
        let scanner = atmc.load(&args.path)?;
        return Ok(tree::print_resolved_string(scanner.resolved()).into_bytes());
    }

    let mut json = if args.pretty {
        let mut map = serde_json::Map::new();
        atmc.load(&args.path)?.scan(&mut map)?;
        serde_json::to_vec_pretty(&map)?
    } else {
        atmc.json(&args.path)?
    };
    json.push(b'\n');
    Ok(json)
}
