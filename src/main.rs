use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand};
use tracing_subscriber::EnvFilter;
use vellum::cli::{self, CliError, RunOptions};
use vellum::native::CollectionConfig;

#[derive(ClapParser)]
#[command(name = "vellum")]
#[command(about = "vellum - Query JSON document collections with joins and pushed-down filters")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a parsed query against a JSON collection
    Run(QueryArgs),

    /// Print the operation tree and the root fetch of a parsed query
    Explain(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// File holding the parser's JSON output for the query
    #[arg(short, long)]
    query: PathBuf,

    /// JSON array of documents (reads from stdin if not provided)
    #[arg(short, long)]
    documents: Option<PathBuf>,

    /// File holding a parsed filter applied after every source
    #[arg(long)]
    global_filter: Option<PathBuf>,

    /// Query parameter as name=<json>, may be repeated
    #[arg(long = "param")]
    params: Vec<String>,

    /// Always fetch whole collections instead of pushing sort and window
    /// down to the store
    #[arg(long)]
    no_pushdown: bool,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Explain(args) => explain(args).await,
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: QueryArgs) -> Result<(), CliError> {
    let pretty = args.pretty;
    let options = run_options(args, true)?;
    let output = cli::execute_run(&options).await?;
    print_json(&output, pretty)
}

async fn explain(args: QueryArgs) -> Result<(), CliError> {
    let pretty = args.pretty;
    let options = run_options(args, false)?;
    let output = cli::execute_explain(&options).await?;
    print_json(&output, pretty)
}

fn run_options(args: QueryArgs, read_stdin: bool) -> Result<RunOptions, CliError> {
    let documents = match args.documents {
        Some(path) => Some(fs::read_to_string(path)?),
        None if read_stdin && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let global_filter = match args.global_filter {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };

    let params = args
        .params
        .iter()
        .map(|raw| cli::parse_param(raw))
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(RunOptions {
        query: fs::read_to_string(&args.query)?,
        documents,
        global_filter,
        params,
        config: CollectionConfig {
            pushdown: !args.no_pushdown,
        },
    })
}

fn print_json(output: &impl serde::Serialize, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(output)
    } else {
        serde_json::to_string(output)
    }?;
    println!("{}", json);
    Ok(())
}
