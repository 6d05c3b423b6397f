//! querybatch CLI — run a file of queries against a corpus-query service.
//!
//! Usage:
//! ```bash
//! # Print the occurrence count of every query
//! querybatch --file queries.txt
//!
//! # Collect matching documents into queries-results.csv
//! querybatch --action csv --data ./data/wiki40b.test --file queries.txt
//!
//! # Single-dash spellings work too
//! querybatch -action csv -file=queries.txt
//! ```

use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use querybatch_core::{results_path, Aggregator, BatchRunner, Mode, RunConfig};
use querybatch_http::{HttpClientConfig, HttpQueryClient, DEFAULT_BASE_URL};

mod logging;

#[derive(Parser, Debug)]
#[command(
    name = "querybatch",
    about = "Run a newline-delimited file of queries against a corpus-query service",
    version
)]
struct Cli {
    /// What to ask for: 'count' or 'csv'
    #[arg(long, env = "QUERYBATCH_ACTION", default_value = "count")]
    action: String,

    /// Dataset the service should search
    #[arg(long, env = "QUERYBATCH_DATA", default_value = "./data/wiki40b.test")]
    data: String,

    /// Path to the file with one query per line
    #[arg(long)]
    file: PathBuf,

    /// Base address of the query service
    #[arg(long, env = "QUERYBATCH_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    /// Per-request timeout in milliseconds (default: wait indefinitely)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

/// Long flags that may also be written with a single dash.
const LONG_FLAGS: [&str; 7] = [
    "action",
    "data",
    "file",
    "url",
    "timeout-ms",
    "log-level",
    "log-json",
];

/// Rewrite `-action csv` / `-file=q.txt` to their `--` forms. Arguments after
/// a bare `--` are left alone.
fn long_flag_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let arg: OsString = arg.into();
            if i == 0 || passthrough {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    passthrough = true;
                    arg
                }
                Some(s) if is_single_dash_long(s) => format!("-{s}").into(),
                _ => arg,
            }
        })
        .collect()
}

fn is_single_dash_long(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split('=').next().unwrap_or(rest);
    LONG_FLAGS.contains(&name)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_from(long_flag_args(std::env::args_os()));
    logging::init_tracing(&cli.log_level, cli.log_json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mode: Mode = cli.action.parse()?;

    let queries = File::open(&cli.file)
        .with_context(|| format!("error opening the following file: {}", cli.file.display()))?;
    let queries = BufReader::new(queries);

    let client = HttpQueryClient::new(HttpClientConfig {
        base_url: cli.url,
        request_timeout: cli.timeout_ms.map(Duration::from_millis),
    })?;

    let config = RunConfig {
        dataset: cli.data,
        mode,
    };
    let mut runner = BatchRunner::new(config, client);
    let mut stdout = std::io::stdout();

    let summary = match mode {
        Mode::Count => {
            runner
                .run(queries, &mut stdout, Aggregator::<File>::count())
                .await?
        }
        Mode::Csv => {
            let aggregator = Aggregator::csv(create_results_file(&cli.file)?)?;
            runner.run(queries, &mut stdout, aggregator).await?
        }
    };

    tracing::debug!(
        queries = summary.queries,
        rows = summary.rows,
        state = %runner.state(),
        "done"
    );
    Ok(())
}

fn create_results_file(input: &Path) -> Result<File> {
    let path = results_path(input);
    tracing::info!(path = %path.display(), "writing results");
    File::create(&path).with_context(|| format!("error creating file: {}", path.display()))
}
