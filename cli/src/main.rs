use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use tbtrace_kernel::config::parse_properties;
use tbtrace_kernel::verify::verify_trace;
use tbtrace_kernel::{Operation, TraceConfig, TraceEmitter};

/// Treebeard trace transcoder
#[derive(Parser, Debug)]
#[command(name = "tbtrace")]
#[command(about = "Transcode key-value workloads into Treebeard GET/SET traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Read one operation per line and write the trace.
    Transcode {
        /// Properties file with `tbtrace.*` settings
        #[arg(short = 'P', long)]
        properties: Option<PathBuf>,

        /// Setting override, `key=value` (repeatable)
        #[arg(short = 'p', long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,

        /// Operation stream (defaults to stdin)
        #[arg(long)]
        ops: Option<PathBuf>,

        /// Count and skip operations the trace cannot express instead of aborting
        #[arg(long)]
        skip_unsupported: bool,
    },

    /// Check an existing trace against the line grammar.
    Verify {
        /// Trace file to check
        trace: PathBuf,
    },
}

/// JSON summary of a transcode run
#[derive(Debug, Serialize)]
struct RunOutput {
    config: TraceConfig,
    operations: u64,
    lines: u64,
    unsupported: u64,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Transcode {
            properties,
            settings,
            ops,
            skip_unsupported,
        } => transcode(properties, settings, ops, skip_unsupported),
        Cmd::Verify { trace } => verify(trace),
    }
}

/// Initialize tracing with an env-driven filter (default INFO), logging to stderr.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn transcode(
    properties: Option<PathBuf>,
    overrides: Vec<String>,
    ops: Option<PathBuf>,
    skip_unsupported: bool,
) -> Result<()> {
    // ----------------------------
    // Load configuration
    // ----------------------------
    let mut settings = match &properties {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading properties {}", path.display()))?;
            parse_properties(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => BTreeMap::new(),
    };

    for pair in overrides {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("setting override `{pair}` must be KEY=VALUE");
        };
        settings.insert(key.trim().to_string(), value.trim().to_string());
    }

    let config = TraceConfig::from_settings(&settings).context("invalid configuration")?;

    // ----------------------------
    // Open operation stream
    // ----------------------------
    let input: Box<dyn BufRead> = match &ops {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    // ----------------------------
    // Emit
    // ----------------------------
    let path = config.output_path.clone();
    let mut emitter = TraceEmitter::open(config)
        .with_context(|| format!("opening trace {}", path.display()))?;

    let mut operations = 0u64;
    let mut unsupported = 0u64;

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("reading operation stream")?;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let op: Operation = line
            .parse()
            .with_context(|| format!("operation line {}", idx + 1))?;
        operations += 1;

        if emitter.dispatch(&op)?.is_ok() {
            continue;
        }
        if !skip_unsupported {
            bail!(
                "operation line {}: `{}` is not supported by the trace grammar",
                idx + 1,
                op.kind()
            );
        }
        unsupported += 1;
        warn!(line = idx + 1, op = op.kind(), "skipped unsupported operation");
    }

    let lines = emitter.lines_emitted();
    let config = emitter.config().clone();
    emitter.shutdown()?;
    info!(operations, lines, unsupported, "transcode finished");

    // ----------------------------
    // Output
    // ----------------------------
    let output = RunOutput {
        config,
        operations,
        lines,
        unsupported,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn verify(trace: PathBuf) -> Result<()> {
    let file = File::open(&trace).with_context(|| format!("opening {}", trace.display()))?;
    let summary = verify_trace(BufReader::new(file))
        .with_context(|| format!("verifying {}", trace.display()))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
