use clap::{Args as ClapArgs, Parser, Subcommand};
use fsperf::bench::{setup_cache, BenchmarkSuite};
use fsperf::config::persistence::{load_reports_in_dir, ReportStorage};
use fsperf::config::BenchmarkConfig;
use fsperf::error::user_friendly_message;
use fsperf::report;
use fsperf::util::units::{parse_bytes, parse_duration};
use fsperf::{FsPerfError, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// fsperf: file-system I/O benchmark (sequential, random, metadata and package installs)
#[derive(Parser, Debug)]
#[command(author, version, about, args_conflicts_with_subcommands = true)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the benchmark suite (the default)
    Run(RunArgs),
    /// Download npm/pip packages into the offline caches (needs network)
    SetupCache {
        /// Config file to read package lists from
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Cache root directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Compare every *.json report in a folder
    Compare {
        /// Folder holding saved reports
        dir: PathBuf,
    },
    /// Write the default config file to the user config directory
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ClapArgs, Debug, Default, Clone)]
struct RunArgs {
    /// Config file (TOML); defaults to the user config file if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory on the filesystem under test; fsperf works in its own
    /// `fsperf_scratch` subdirectory there
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Total data per sequential test, e.g. 512MiB or 2GB
    #[arg(short = 's', long, value_parser = parse_bytes)]
    data_size: Option<u64>,

    /// Number of suite runs
    #[arg(short = 'n', long)]
    runs: Option<usize>,

    /// Sequential I/O block size, e.g. 64KiB
    #[arg(short, long, value_parser = parse_bytes)]
    block_size: Option<u64>,

    /// Results file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the npm/pip install workloads
    #[arg(long)]
    skip_real_world: bool,

    /// Per-install timeout, e.g. 5m
    #[arg(long, value_parser = parse_duration)]
    install_timeout: Option<Duration>,

    /// Small sizes for a quick smoke run
    #[arg(short, long)]
    quick: bool,

    /// Leave test files in the scratch directory
    #[arg(long)]
    keep_temp_files: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "fsperf=debug" } else { "fsperf=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file (explicit, else user default, else built-in), then the quick
/// preset, then individual flags
fn resolve_config(args: &RunArgs) -> Result<BenchmarkConfig> {
    let mut config = match &args.config {
        Some(path) => BenchmarkConfig::load_from(path)?,
        None => BenchmarkConfig::load()?,
    };

    if args.quick {
        let quick = BenchmarkConfig::quick();
        config.data_size = quick.data_size;
        config.num_runs = quick.num_runs;
        config.file_sizes = quick.file_sizes;
        config.random = quick.random;
        config.metadata = quick.metadata;
    }

    if let Some(dir) = &args.dir {
        config = config.with_test_dir(dir.clone());
    }
    if let Some(size) = args.data_size {
        config = config.with_data_size(size);
    }
    if let Some(runs) = args.runs {
        config = config.with_num_runs(runs);
    }
    if let Some(size) = args.block_size {
        config = config.with_block_size(size);
    }
    if let Some(output) = &args.output {
        config = config.with_output(output.clone());
    }
    if args.skip_real_world {
        config = config.with_real_world(false);
    }
    if let Some(timeout) = args.install_timeout {
        config.real_world.install_timeout_secs = timeout.as_secs().max(1);
    }
    if args.keep_temp_files {
        config = config.with_keep_temp_files(true);
    }

    config.validate()?;
    Ok(config)
}

async fn run_benchmark(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let test_dir = std::path::absolute(&config.test_dir).unwrap_or_else(|_| config.test_dir.clone());

    println!("{}", report::rule('='));
    println!("FILE I/O PERFORMANCE BENCHMARK");
    println!("{}", report::rule('='));
    println!("Test Directory: {}", test_dir.display());
    println!("\n{}", report::rule('='));
    println!("RUNNING {} BENCHMARK ITERATIONS", config.num_runs);
    println!("{}", report::rule('='));

    info!(runs = config.num_runs, data_size = config.data_size, "Starting benchmark");
    let suite = BenchmarkSuite::new(config)?;
    let report = suite.run_report().await?;

    report::print_aggregated(&report.aggregated_statistics, report.num_runs);

    let storage = ReportStorage::new(&suite.config().output);
    storage.save(&report)?;
    println!(
        "\n\nDetailed results from all runs saved to: {}",
        storage.path().display()
    );
    println!("\n{}", report::rule('='));
    println!("All benchmarks complete!");
    println!("{}", report::rule('='));
    Ok(())
}

async fn run_setup_cache(config: Option<PathBuf>, cache_dir: Option<PathBuf>) -> Result<()> {
    let mut config = match config {
        Some(path) => BenchmarkConfig::load_from(&path)?,
        None => BenchmarkConfig::load()?,
    };
    if let Some(dir) = cache_dir {
        config.real_world.cache_dir = dir;
    }

    println!("{}", report::rule('='));
    println!("BENCHMARK CACHE SETUP");
    println!("{}", report::rule('='));
    println!(
        "Downloading packages into {} (needs network access, run once)",
        config.real_world.cache_dir.display()
    );

    let summary = setup_cache(&config.real_world).await?;

    let status = |ok: bool, tool: &str| {
        if ok {
            "Ready".to_string()
        } else {
            format!("Failed or {} not available", tool)
        }
    };
    println!("\n{}", report::rule('='));
    println!("SETUP SUMMARY");
    println!("{}", report::rule('='));
    println!("npm cache: {}", status(summary.npm, "npm"));
    println!("pip cache: {}", status(summary.pip, "pip"));

    if summary.npm || summary.pip {
        println!("\nSetup complete. Benchmarks can now run offline.");
        Ok(())
    } else {
        Err(FsPerfError::CommandError(
            "No caches were created; install npm and/or pip".to_string(),
        ))
    }
}

fn run_compare(dir: &std::path::Path) -> Result<()> {
    let reports = load_reports_in_dir(dir)?;
    for (label, report) in &reports {
        println!(
            "Loaded: {} ({} run(s), {})",
            label,
            report.num_runs,
            report.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("\n{}", report::comparison_table(&reports));
    Ok(())
}

fn run_init_config(force: bool) -> Result<()> {
    let path = BenchmarkConfig::config_file_path()?;
    if path.exists() && !force {
        return Err(FsPerfError::ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let path = BenchmarkConfig::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        None => run_benchmark(&args.run).await,
        Some(Commands::Run(run)) => run_benchmark(&run).await,
        Some(Commands::SetupCache { config, cache_dir }) => run_setup_cache(config, cache_dir).await,
        Some(Commands::Compare { dir }) => run_compare(&dir),
        Some(Commands::InitConfig { force }) => run_init_config(force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", user_friendly_message(&e));
            ExitCode::FAILURE
        }
    }
}
