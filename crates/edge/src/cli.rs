// crates/edge/src/cli.rs

use crate::{db::PgEventStore, settings::load_settings, Error};
use adapt::compile::Shape;
use clap::{builder::ValueHint, Args, Parser, Subcommand};
use domain::filter::Filter;
use futures::StreamExt;
use serve::EventBackend;
use std::io::{self, Write};
use std::{path::PathBuf, process::ExitCode};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub type Result<T> = std::result::Result<T, Error>;

/// Entry point for the `eventq` binary.
#[tokio::main(flavor = "multi_thread")]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    // Ctrl-C cancels the in-flight request, including a blocked stream.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let result = match cli.command {
        Commands::Query(cmd) => do_query(cmd, cancel).await,
        Commands::Count(cmd) => do_count(cmd, cancel).await,
        Commands::Explain(cmd) => do_explain(cmd),
    };

    result.map_or_else(
        |e| {
            error!("eventq failed: {}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
        |_| ExitCode::SUCCESS,
    )
}

#[derive(Parser, Debug)]
#[command(name = "eventq", version, about = "Query a relay event store with a filter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print matching events as JSON lines, newest first
    Query(FilterCmd),
    /// Print the number of matching events (capped at the resolved limit)
    Count(FilterCmd),
    /// Print the compiled SQL and its parameters without touching the database
    Explain(ExplainCmd),
}

#[derive(Args, Debug)]
pub struct FilterCmd {
    /// Directory containing settings.toml (or set EVENTQ_DIR)
    #[arg(
        long,
        value_name = "DIR",
        env = "EVENTQ_DIR",
        value_hint = ValueHint::DirPath,
        value_parser = dir_must_exist
    )]
    pub dir: PathBuf,

    /// Filter JSON, e.g. '{"kinds":[1],"#t":["news"],"limit":10}'
    #[arg(value_name = "FILTER", value_parser = parse_filter)]
    pub filter: FilterArg,
}

#[derive(Args, Debug)]
pub struct ExplainCmd {
    #[command(flatten)]
    pub target: FilterCmd,

    /// Compile the count shape instead of the rows shape
    #[arg(long)]
    pub count: bool,
}

/// Parsed filter argument. JSON `null` parses to `None` and is rejected
/// downstream as a structural error.
#[derive(Debug, Clone)]
pub struct FilterArg(pub Option<Filter>);

fn parse_filter(s: &str) -> std::result::Result<FilterArg, String> {
    serde_json::from_str::<Option<Filter>>(s)
        .map(FilterArg)
        .map_err(|e| format!("invalid filter JSON: {e}"))
}

fn dir_must_exist(s: &str) -> std::result::Result<PathBuf, String> {
    let p = PathBuf::from(s);
    if !p.exists() {
        return Err(format!("Not found: {}", p.display()));
    }
    if !p.is_dir() {
        return Err(format!("Not a directory: {}", p.display()));
    }
    Ok(p)
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn connect(cmd: &FilterCmd) -> Result<EventBackend<PgEventStore>> {
    let settings = load_settings(&cmd.dir)?;
    let store = PgEventStore::connect(&settings.database).await?;
    Ok(EventBackend::new(store, settings.limits))
}

#[tracing::instrument(skip_all)]
async fn do_query(cmd: FilterCmd, cancel: CancellationToken) -> Result<()> {
    let backend = connect(&cmd).await?;
    let mut events = backend.query_events(cmd.filter.0.as_ref(), cancel).await?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut n = 0usize;
    while let Some(event) = events.next().await {
        serde_json::to_writer(&mut out, &event?)?;
        writeln!(out)?;
        n += 1;
    }
    out.flush()?;

    info!("{} events written", n);
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn do_count(cmd: FilterCmd, cancel: CancellationToken) -> Result<()> {
    let backend = connect(&cmd).await?;
    let n = backend.count_events(cmd.filter.0.as_ref(), cancel).await?;
    println!("{n}");
    Ok(())
}

#[tracing::instrument(skip_all)]
fn do_explain(cmd: ExplainCmd) -> Result<()> {
    let settings = load_settings(&cmd.target.dir)?;
    let store = PgEventStore::connect_lazy(&settings.database)?;
    let backend = EventBackend::new(store, settings.limits);

    let shape = if cmd.count { Shape::Count } else { Shape::Rows };
    println!("-- filter: {}", serde_json::to_string(&cmd.target.filter.0)?);
    match backend.plan(cmd.target.filter.0.as_ref(), shape)? {
        None => println!("-- filter matches nothing; no query is issued"),
        Some(q) => {
            println!("{}", q.sql);
            for (i, p) in q.params.iter().enumerate() {
                println!("-- ${} = {}", i + 1, p);
            }
        }
    }
    Ok(())
}
