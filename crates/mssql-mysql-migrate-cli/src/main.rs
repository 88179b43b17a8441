//! mssql-mysql-migrate CLI - convert SQL Server scripts to MySQL and run them.

use clap::{Args, Parser, Subcommand};
use mssql_mysql_migrate::{
    Config, ConversionResult, ExecutionReport, MigrateError, Orchestrator, RunMode,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mssql-mysql-migrate")]
#[command(about = "Convert SQL Server scripts to MySQL and execute them")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// MySQL connection settings. Flags win over environment, environment over
/// the config file.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// MySQL host
    #[arg(long, env = "DB_HOST")]
    host: Option<String>,

    /// MySQL port
    #[arg(long, env = "DB_PORT")]
    port: Option<u16>,

    /// MySQL user
    #[arg(long, env = "DB_USER")]
    user: Option<String>,

    /// MySQL password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Target database
    #[arg(long, env = "DB_DATABASE")]
    database: Option<String>,

    /// Connection character set
    #[arg(long, env = "DB_CHARSET")]
    charset: Option<String>,
}

impl ConnectionArgs {
    fn apply(self, config: &mut Config) {
        let target = &mut config.target;
        if let Some(host) = self.host {
            target.host = host;
        }
        if let Some(port) = self.port {
            target.port = port;
        }
        if let Some(user) = self.user {
            target.user = user;
        }
        if let Some(password) = self.password {
            target.password = password;
        }
        if let Some(database) = self.database {
            target.database = database;
        }
        if let Some(charset) = self.charset {
            target.charset = charset;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a SQL Server script to MySQL
    Convert {
        /// SQL Server script to convert
        sql_file: PathBuf,

        /// Output path [default: <parent>/../target-data/<name>_mysql.sql]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Execute a MySQL script statement by statement
    Execute {
        /// MySQL script to execute
        sql_file: PathBuf,

        /// Preview statements without executing them
        #[arg(long)]
        dry_run: bool,

        /// Repair merged INSERTs, malformed INSERTs and unbalanced quotes
        #[arg(long)]
        repair: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Convert a SQL Server script and execute the result
    Migrate {
        /// SQL Server script to migrate
        sql_file: PathBuf,

        /// Only convert, do not execute
        #[arg(long, conflicts_with = "execute_only")]
        convert_only: bool,

        /// Only execute a previously converted script
        #[arg(long)]
        execute_only: bool,

        /// Preview statements without executing them
        #[arg(long)]
        dry_run: bool,

        /// Repair merged INSERTs, malformed INSERTs and unbalanced quotes
        #[arg(long)]
        repair: bool,

        /// Path of the converted script
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    // Environment fallbacks for connection flags come from .env when present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler();

    match cli.command {
        Commands::Convert { sql_file, output } => {
            let orchestrator = Orchestrator::new(config);
            let result = orchestrator.convert(&sql_file, output.as_deref())?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_conversion(&result);
            }
        }

        Commands::Execute {
            sql_file,
            dry_run,
            repair,
            connection,
        } => {
            connection.apply(&mut config);
            if repair {
                config.execution.repair_statements = true;
            }

            let orchestrator = Orchestrator::new(config);
            let report = orchestrator
                .execute(&sql_file, dry_run, &cancel_token)
                .await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_execution(&report);
            }
            check_failures(&report)?;
        }

        Commands::Migrate {
            sql_file,
            convert_only,
            execute_only,
            dry_run,
            repair,
            output,
            connection,
        } => {
            connection.apply(&mut config);
            if repair {
                config.execution.repair_statements = true;
            }
            let mode = if convert_only {
                RunMode::ConvertOnly
            } else if execute_only {
                RunMode::ExecuteOnly
            } else {
                RunMode::Full
            };

            let orchestrator = Orchestrator::new(config);
            let result = orchestrator
                .run(&sql_file, mode, output.as_deref(), dry_run, &cancel_token)
                .await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                if let Some(ref conversion) = result.conversion {
                    print_conversion(conversion);
                }
                if let Some(ref execution) = result.execution {
                    print_execution(execution);
                }
                println!("  Duration: {:.2}s", result.duration_seconds);
            }
            if let Some(ref execution) = result.execution {
                check_failures(execution)?;
            }
        }
    }

    Ok(())
}

fn print_conversion(result: &ConversionResult) {
    println!("\nConversion completed!");
    println!("  Input: {}", result.input.display());
    println!("  Output: {}", result.output.display());
    println!(
        "  Lines: {} -> {}",
        result.original_lines, result.converted_lines
    );
    println!(
        "  Size: {} -> {} bytes",
        result.original_bytes, result.converted_bytes
    );
}

fn print_execution(report: &ExecutionReport) {
    if report.dry_run {
        println!("\nDry run: {} statements", report.total);
        for preview in &report.previews {
            println!("  [{}] {}", preview.statement_index, preview.preview);
        }
        return;
    }

    if report.cancelled {
        println!("\nExecution cancelled!");
    } else {
        println!("\nExecution completed!");
    }
    println!("  File: {}", report.sql_file.display());
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!(
        "  Statements: {} succeeded, {} failed, {} skipped, {} total",
        report.succeeded, report.failed, report.skipped, report.total
    );
    for failure in &report.failures {
        println!(
            "  Failed #{}: {} ({})",
            failure.statement_index, failure.error_message, failure.statement_preview
        );
    }
}

/// Exit status for a finished report: cancellation first, then failures.
fn check_failures(report: &ExecutionReport) -> Result<(), MigrateError> {
    if report.cancelled {
        return Err(MigrateError::Cancelled);
    }
    if report.failed > 0 {
        return Err(MigrateError::StatementsFailed {
            failed: report.failed,
            total: report.total,
        });
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("unknown verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}'", other)),
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Stopping after the current statement...", name);
                    token.cancel();
                }
                Err(e) => warn!("Failed to setup {} handler: {}", name, e),
            }
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nReceived Ctrl-C. Stopping after the current statement...");
                token.cancel();
            }
            Err(e) => warn!("Failed to setup Ctrl-C handler: {}", e),
        }
    });

    cancel_token
}
