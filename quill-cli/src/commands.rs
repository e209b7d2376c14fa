use std::io::{self, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use quill_config::{FormatterKind, LoggerConfig};
use quill_core::writer::read_frame;
use quill_core::{global, Logger, LoggerBuilder, Severity};
use tracing::{info, warn};

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "quill", version, about)]
pub struct Cli {
    /// YAML configuration file. Defaults to config/quill.yaml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Override the minimum severity (trace, debug, info, warn, error, fatal)
    #[arg(short, long, global = true)]
    pub level: Option<String>,
    /// Override the record rendering
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
    /// Override the root directory of the rotating file writer
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write one record per severity through the default logger
    Emit(EmitArgs),
    /// Log from several threads at once and report throughput
    Stress(StressArgs),
    /// Print batches received from a network writer
    Listen(ListenArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for FormatterKind {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => FormatterKind::Text,
            OutputFormat::Json => FormatterKind::Json,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EmitArgs {
    /// Message attached to every record
    #[arg(short, long, default_value = "quill says hello")]
    pub message: String,
}

#[derive(Args, Debug, Clone)]
pub struct StressArgs {
    /// Number of producer threads
    #[arg(short, long, default_value_t = 3)]
    pub threads: usize,
    /// Records per producer thread
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub count: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Address to accept batch connections on
    #[arg(short, long, default_value = "127.0.0.1:9092")]
    pub address: String,
}

fn load_config(cli: &Cli) -> Result<LoggerConfig, quill_config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => LoggerConfig::load_from_path(path)?,
        None => LoggerConfig::load()?,
    };
    if let Some(level) = &cli.level {
        config.level = level.clone();
    }
    if let Some(format) = cli.format {
        config.formatter = format.into();
    }
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    Ok(config)
}

/// Wait until the dispatcher has handled `expected` records, since closing
/// discards whatever is still queued.
fn settle(logger: &Logger, expected: u64) {
    let Some(metrics) = logger.metrics() else {
        return;
    };
    let deadline = Instant::now() + Duration::from_secs(30);
    while metrics.records_written.get() + metrics.write_errors.get() < expected {
        if Instant::now() >= deadline {
            warn!(expected, "gave up waiting for queued records");
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

pub fn run_emit(cli: &Cli, args: &EmitArgs) -> CliResult {
    global::init(&load_config(cli)?)?;
    let logger = global::logger();
    let message = &args.message;

    quill_core::trace!("{message}");
    quill_core::debug!("{message}");
    quill_core::info!("{message}");
    quill_core::warn!("{message}");
    quill_core::error!("{message}");
    quill_core::fatal!("{message}");

    let accepted = Severity::ALL.iter().filter(|s| logger.enabled(**s)).count();
    settle(logger, accepted as u64);
    global::sync();
    global::shutdown();
    println!("emitted {accepted} records at {} and above", logger.level());
    Ok(())
}

pub fn run_stress(cli: &Cli, args: &StressArgs) -> CliResult {
    let config = load_config(cli)?;
    let logger = LoggerBuilder::from_config(&config)?.build()?;
    if !logger.enabled(Severity::Info) {
        warn!(level = %logger.level(), "stress records are Info and will all be gated");
    }

    let started = Instant::now();
    thread::scope(|s| {
        for t in 0..args.threads {
            let logger = logger.clone();
            s.spawn(move || {
                for i in 0..args.count {
                    logger.info(format_args!("stress thread {t} record {i}"));
                }
            });
        }
    });
    let submitted = started.elapsed();

    if logger.enabled(Severity::Info) {
        settle(&logger, (args.threads * args.count) as u64);
    }
    let drained = started.elapsed();
    logger.sync();
    logger.close();

    let total = args.threads * args.count;
    println!(
        "{total} records from {} threads: submitted in {:?}, written in {:?} ({:.0} records/s)",
        args.threads,
        submitted,
        drained,
        total as f64 / drained.as_secs_f64().max(f64::EPSILON)
    );
    if let Some(metrics) = logger.metrics() {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

pub fn run_listen(args: &ListenArgs) -> CliResult {
    let listener = TcpListener::bind(&args.address)?;
    info!(address = %listener.local_addr()?, "listening for batches");

    for conn in listener.incoming() {
        let conn = match conn {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        thread::spawn(move || {
            let peer = conn.peer_addr().map(|a| a.to_string()).unwrap_or_default();
            if let Err(e) = print_batches(conn) {
                warn!(peer = %peer, error = %e, "batch connection failed");
            }
        });
    }
    Ok(())
}

fn print_batches(conn: TcpStream) -> io::Result<()> {
    let mut reader = BufReader::new(conn);
    while let Some(frame) = read_frame(&mut reader)? {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for payload in &frame.payloads {
            write!(out, "[{}] ", frame.topic)?;
            out.write_all(payload)?;
        }
        out.flush()?;
    }
    Ok(())
}
