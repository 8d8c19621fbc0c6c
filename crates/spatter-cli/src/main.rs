//! Spatter CLI
//!
//! Measures gather/scatter memory bandwidth for an index pattern on the
//! serial, parallel or CUDA backend and prints the bandwidth report.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spatter_common::{Backend, SpatterConfig};
use spatter_kernels::{Capabilities, Coordinator, ExecutionContext, RunSpec};
use spatter_pattern::PatternCompiler;
use tracing::{debug, info};

mod exit;

use exit::{EXIT_SUCCESS, exit_code_for};

/// Spatter - gather/scatter memory bandwidth benchmark
#[derive(Parser, Debug)]
#[command(name = "spatter")]
#[command(about = "Gather/scatter memory bandwidth benchmark")]
#[command(long_about = r#"
Spatter measures the memory bandwidth achieved by gather (dense[i] = sparse[p[i]])
and scatter (sparse[p[i]] = dense[i]) for an index pattern p.

Patterns:
  0,4,8,12                explicit index list
  MS1:8:4:32              mostly stride-1: len 8, gap of 32 at position 4
  MS1:8:2,3:20,22         one gap per break location
  UNIFORM:8:4             len 8, stride 4

Examples:
  spatter -k gather -p MS1:8:4:32 -l 1048576 -d 8 -r 10
  spatter -k scatter -p UNIFORM:16:1 -b parallel --threads 8 -v 2
"#)]
#[command(version)]
struct Cli {
    /// Kernel to run (gather or scatter)
    #[arg(short, long, value_name = "KERNEL")]
    kernel: Option<String>,

    /// Pattern specification
    #[arg(short, long, value_name = "SPEC", allow_hyphen_values = true)]
    pattern: Option<String>,

    /// Offset added to each successive pattern repetition
    #[arg(short, long, value_name = "N")]
    delta: Option<usize>,

    /// Number of pattern repetitions [default: 1, or 1024 with --delta]
    #[arg(short = 'l', long, value_name = "N")]
    count: Option<usize>,

    /// Number of timed runs
    #[arg(short = 'r', long = "runs", value_name = "N")]
    nruns: Option<u64>,

    /// Backend (serial, parallel/openmp, cuda)
    #[arg(short, long, value_name = "BACKEND")]
    backend: Option<String>,

    /// Report verbosity (0-3)
    #[arg(short, long, value_name = "LEVEL")]
    verbosity: Option<u8>,

    /// Seed for buffer contents
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Worker threads for the parallel backend (0 = all CPUs)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// CUDA device index
    #[arg(long = "device", value_name = "INDEX")]
    device_index: Option<usize>,

    /// Synchronize MPI ranks before every kernel call
    #[arg(long)]
    distributed: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", env = "SPATTER_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Command-line values take precedence over file and environment.
    fn apply_to(&self, config: &mut SpatterConfig) -> Result<()> {
        if let Some(kernel) = &self.kernel {
            config.kernel = kernel.clone();
        }
        if let Some(pattern) = &self.pattern {
            config.pattern = pattern.clone();
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.parse::<Backend>()?;
        }
        config.delta = self.delta.unwrap_or(config.delta);
        config.count = self.count.or(config.count);
        config.nruns = self.nruns.unwrap_or(config.nruns);
        config.verbosity = self.verbosity.unwrap_or(config.verbosity);
        config.seed = self.seed.unwrap_or(config.seed);
        config.threads = self.threads.unwrap_or(config.threads);
        config.device_index = self.device_index.unwrap_or(config.device_index);
        config.distributed |= self.distributed;
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    match run(&cli) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            let code = exit_code_for(&e);
            tracing::error!("spatter failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(code);
        }
    }
}

/// Load configuration: file (if given) with `SPATTER_*` overrides, then flags.
fn load_configuration(cli: &Cli) -> Result<SpatterConfig> {
    let mut config = match &cli.config {
        Some(path) => SpatterConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let mut config = SpatterConfig::default();
            config.apply_env_overrides()?;
            config
        }
    };
    cli.apply_to(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_configuration(cli)?;
    debug!("capabilities: {}", Capabilities::compiled());
    debug!(?config, "resolved configuration");

    let mut compiler = PatternCompiler::new().with_delta(config.delta);
    if let Some(count) = config.count {
        compiler = compiler.with_count(count);
    }
    let pattern = compiler
        .compile(&config.pattern)
        .with_context(|| format!("invalid pattern '{}'", config.pattern))?;

    let spec = RunSpec::new(config.kernel.as_str(), pattern)
        .with_nruns(config.nruns)
        .with_verbosity(config.verbosity)
        .with_threads(config.threads())
        .with_device_index(config.device_index);
    let coordinator = if config.distributed { Coordinator::mpi()? } else { Coordinator::local() };
    let mut ctx = ExecutionContext::configure(config.backend, spec)?.with_coordinator(coordinator);
    let root = ctx.coordinator().is_root();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if root {
        write!(out, "{ctx}")?;
    }

    ctx.setup(config.seed).context("setup failed")?;
    if root {
        ctx.write_setup(&mut out)?;
    }

    // Warm-up
    ctx.run(false)?;
    for _ in 0..config.nruns {
        ctx.run(true)?;
    }

    if root {
        ctx.report(&mut out)?;
        out.flush()?;
    }

    let result = ctx.teardown()?;
    info!(
        timed_runs = result.timed_runs,
        seconds = result.seconds,
        "benchmark complete"
    );
    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--log-level`, default `warn`.
fn setup_logging(level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.unwrap_or("warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "spatter", "-k", "scatter", "-p", "0,2", "-r", "3", "-b", "openmp", "-v", "2",
            "--threads", "4",
        ]);
        let mut config = SpatterConfig::default();
        cli.apply_to(&mut config).unwrap();
        assert_eq!(config.kernel, "scatter");
        assert_eq!(config.pattern, "0,2");
        assert_eq!(config.nruns, 3);
        assert_eq!(config.backend, Backend::Parallel);
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.threads(), Some(4));
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::parse_from(["spatter"]);
        let mut config =
            SpatterConfig { nruns: 42, delta: 7, count: Some(3), ..SpatterConfig::default() };
        cli.apply_to(&mut config).unwrap();
        assert_eq!(config.nruns, 42);
        assert_eq!(config.delta, 7);
        assert_eq!(config.count, Some(3));
    }

    #[test]
    fn flags_fix_invalid_file_values() {
        let cli = Cli::parse_from(["spatter", "-r", "5"]);
        let mut config = SpatterConfig { nruns: 0, ..SpatterConfig::default() };
        assert!(config.validate().is_err());
        cli.apply_to(&mut config).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_backend_flag_is_rejected() {
        let cli = Cli::parse_from(["spatter", "-b", "fpga"]);
        let err = cli.apply_to(&mut SpatterConfig::default()).unwrap_err();
        assert_eq!(exit_code_for(&err), exit::EXIT_CONFIGURATION);
    }
}
