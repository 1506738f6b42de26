//! pg-loadgen — the load generator CLI
//!
//! Opens a pool of PostgreSQL connections and keeps it busy with random
//! queries until killed.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 10 connections, 5 workers, `select 1`
//! pg-loadgen
//!
//! # Mixed workload
//! pg-loadgen --queries 'select 1; select count(*) from pg_class' --conn-count 20 --query-count 12
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::*;
use pg_loadgen::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

#[derive(Parser)]
#[command(name = "pg-loadgen")]
#[command(version)]
#[command(about = "Apply sustained, randomized query load to PostgreSQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    pg-loadgen --queries 'select 1; select 2' --conn-count 2 --query-count 2
    PGHOST=db.internal pg-loadgen --format json
    pg-loadgen --config ./load.toml -v")]
struct Cli {
    /// Semicolon-separated list of queries to randomly select
    #[arg(long, env = "LOADGEN_QUERIES")]
    queries: Option<String>,

    /// Number of connections to establish [default: 10]
    #[arg(long, alias = "connCount", env = "LOADGEN_CONN_COUNT")]
    conn_count: Option<usize>,

    /// Number of active queries to run at a time [default: 5]
    #[arg(long, alias = "queryCount", env = "LOADGEN_QUERY_COUNT")]
    query_count: Option<usize>,

    /// Host to connect to [default: localhost]
    #[arg(long, env = "PGHOST")]
    host: Option<String>,

    /// Port to connect to [default: 5432]
    #[arg(long, env = "PGPORT")]
    port: Option<u16>,

    /// User to connect with [default: current user]
    #[arg(long, env = "PGUSER")]
    user: Option<String>,

    /// Database to connect to [default: same as user]
    #[arg(long, env = "PGDATABASE")]
    database: Option<String>,

    /// Seconds between status lines [default: 10]
    #[arg(long, value_name = "SECS", env = "LOADGEN_INTERVAL")]
    interval: Option<u64>,

    /// Status line format [default: text]
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// TOML config file
    #[arg(long, env = "LOADGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> PartialSettings {
        PartialSettings {
            queries: self.queries.clone(),
            conn_count: self.conn_count,
            query_count: self.query_count,
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            database: self.database.clone(),
            interval_secs: self.interval,
            format: self.format,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Bad values exit 1 like every other startup failure.
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Query failures are part of the tool's output; `RUST_LOG` cannot mute them.
const QUERY_ERRORS: &str = "pg_loadgen::worker=warn";

fn init_tracing(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .compact()
        .init();
}

fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    // Keep driver chatter (sqlx logs every statement) out unless asked for.
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("pg_loadgen={level},warn")));

    match QUERY_ERRORS.parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let file = PartialSettings::discover(cli.config.as_deref())
        .context("failed to load config file")?;
    let settings = cli.overrides().or(file).resolve()?;

    let url = settings.database_url();
    println!("{} {}", "Establishing connections to".dimmed(), url.cyan());

    let pool = Pool::build(settings.conn_count, || connect_postgres(&url))
        .await
        .context("error connecting to db")?;
    info!(
        connections = pool.size(),
        workers = settings.query_count,
        queries = settings.queries.len(),
        "pool ready, starting load"
    );

    let pool = Arc::new(pool);
    let queries = Arc::new(settings.queries.clone());
    let counters = Arc::new(Counters::new());
    let shutdown = Shutdown::never();

    // Detached: workers run until the process is killed.
    let _workers = spawn_workers(settings.query_count, &pool, &queries, &counters, &shutdown);

    Reporter::new(counters, settings.interval, std::io::stdout())
        .format(settings.format)
        .run(shutdown)
        .await?;

    Ok(())
}
