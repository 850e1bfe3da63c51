use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, LogFormat, load_config};
use core_types::{Outcome, Row, Value};
use database::{
    AsyncScopedConnection, FetchRequest, ScopedConnection, SqliteAsyncConnector, SqliteConnector,
    column_mean, fetch_concurrently, seed_users,
};

/// The main entry point for the scopedb command-line tool.
fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only carries optional SCOPEDB__* overrides.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(target) = &cli.target {
        config.database.target = target.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = configuration::init_tracing(&config.logging)?;
    tracing::debug!(target_path = %config.database.target, "Configuration loaded");

    // Execute the appropriate command
    match cli.command {
        Commands::Seed => handle_seed(&config),
        Commands::Query(args) => handle_query(&config, args),
        Commands::Concurrent(args) => handle_concurrent(&config, args),
        Commands::Batches(args) => handle_batches(&config, args),
        Commands::AverageAge(args) => handle_average_age(&config, args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Runs statements against a SQLite store, one scoped session at a time.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The SQLite file to use, overriding `database.target` from the configuration.
    #[arg(long, global = true)]
    target: Option<String>,

    /// Console log layout, overriding `logging.format`.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the `users` table and insert the sample users.
    Seed,
    /// Run one statement in its own session and print the outcome.
    Query(QueryArgs),
    /// Run two reads concurrently, each in its own session, and time them.
    Concurrent(ConcurrentArgs),
    /// Page through users above an age, one session per page.
    Batches(BatchesArgs),
    /// Stream the mean user age without loading every row at once.
    AverageAge(AverageAgeArgs),
}

#[derive(Parser)]
struct QueryArgs {
    /// The SQL statement, with `?` placeholders.
    statement: String,

    /// A placeholder value, bound in order. Quoted text stays text; `null`,
    /// integers and reals are parsed.
    #[arg(long = "param", short = 'p')]
    params: Vec<Value>,

    /// Print rows as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ConcurrentArgs {
    /// Users strictly older than this are fetched by the slow session.
    #[arg(long)]
    min_age: Option<i64>,
}

#[derive(Parser)]
struct BatchesArgs {
    /// Rows per page.
    #[arg(long)]
    size: Option<usize>,

    /// Only users strictly older than this are paged.
    #[arg(long)]
    min_age: Option<i64>,
}

#[derive(Parser)]
struct AverageAgeArgs {
    /// Rows fetched per page while streaming.
    #[arg(long)]
    size: Option<usize>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn connection(config: &Config) -> anyhow::Result<ScopedConnection> {
    let connector = SqliteConnector::new().with_busy_timeout(config.database.busy_timeout());
    Ok(ScopedConnection::with_connector(config.database.target.clone(), connector)?)
}

fn handle_seed(config: &Config) -> anyhow::Result<()> {
    let inserted = seed_users(&connection(config)?)?;
    println!("Inserted {} users into {}", inserted, config.database.target);
    Ok(())
}

fn handle_query(config: &Config, args: QueryArgs) -> anyhow::Result<()> {
    let outcome = connection(config)?.run(&args.statement, &args.params)?;

    match outcome {
        Outcome::Rows(rows) if args.json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Outcome::Rows(rows) => {
            println!("{}", render_rows(&rows));
            println!("{} rows", rows.len());
        }
        Outcome::Affected(affected) if args.json => {
            println!("{}", serde_json::json!({ "affected": affected }));
        }
        Outcome::Affected(affected) => println!("{} rows affected", affected),
    }
    Ok(())
}

/// Fans two reads out over a single-threaded scheduler and reports the wall time.
fn handle_concurrent(config: &Config, args: ConcurrentArgs) -> anyhow::Result<()> {
    let min_age = args.min_age.unwrap_or(config.demo.min_age);
    let connector = SqliteAsyncConnector::new().with_busy_timeout(config.database.busy_timeout());
    let connection = AsyncScopedConnection::with_connector(config.database.target.clone(), connector)?;
    let requests = [
        FetchRequest::new("SELECT * FROM users ORDER BY id").with_latency(config.demo.fast_latency()),
        FetchRequest::new("SELECT * FROM users WHERE age > ? ORDER BY id")
            .with_params(vec![Value::Integer(min_age)])
            .with_latency(config.demo.slow_latency()),
    ];

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let report = runtime.block_on(fetch_concurrently(&connection, &requests))?;

    println!("All users: {}", report.results[0].len());
    println!("Users older than {}: {}", min_age, report.results[1].len());
    println!("Completed in {:.3?}", report.elapsed);
    Ok(())
}

fn handle_batches(config: &Config, args: BatchesArgs) -> anyhow::Result<()> {
    let size = args.size.unwrap_or(config.demo.batch_size);
    let min_age = args.min_age.unwrap_or(config.demo.min_age);
    let connection = connection(config)?;

    let batches = connection.batches(
        "SELECT id, name, email, age FROM users WHERE age > ? ORDER BY id",
        &[Value::Integer(min_age)],
        size,
    )?;
    let mut total = 0;
    for (index, batch) in batches.enumerate() {
        let batch = batch?;
        total += batch.len();
        println!("Batch {}: {} rows", index + 1, batch.len());
        println!("{}", render_rows(&batch));
    }
    println!("{} users older than {} in total", total, min_age);
    Ok(())
}

fn handle_average_age(config: &Config, args: AverageAgeArgs) -> anyhow::Result<()> {
    let size = args.size.unwrap_or(config.demo.batch_size);
    let connection = connection(config)?;

    let rows = connection.paginate("SELECT age FROM users ORDER BY id", &[], size)?;
    match column_mean(rows, 0)? {
        Some(mean) => println!("Average age: {:.2}", mean),
        None => println!("No ages recorded"),
    }
    Ok(())
}

/// Renders rows as a terminal table with positional column headers.
fn render_rows(rows: &[Row]) -> Table {
    let width = rows.iter().map(Row::len).max().unwrap_or(0);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header((0..width).map(|i| format!("#{}", i)));
    for row in rows {
        table.add_row(row.values().iter().map(Value::to_string));
    }
    table
}
