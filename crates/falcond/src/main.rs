//! falcond - host health monitor daemon.
//!
//! Samples temperatures, utilisation, network performance and the status of
//! configured services and devices at a fixed interval, appending one row per
//! cycle to a SQLite database.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use falcon_core::collector::{RealFs, SystemRunner};
use falcon_core::fmt::format_interval;
use falcon_core::{Collector, MetricStore, Scheduler, Settings};

/// Host health monitor daemon.
#[derive(Parser)]
#[command(name = "falcond", about = "Host health monitor daemon", version)]
struct Args {
    /// JSON file listing the services and devices to check. Re-read every cycle.
    #[arg(short, long, default_value = "ips.json")]
    config: PathBuf,

    /// SQLite database file.
    #[arg(short, long, default_value = "health_monitor.db")]
    database: PathBuf,

    /// Table receiving the samples.
    #[arg(long, default_value = "metrics")]
    table: String,

    /// Pause between cycles in seconds.
    #[arg(short, long, default_value = "120")]
    interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: PathBuf,

    /// Path to the thermal zone directory.
    #[arg(long, default_value = "/sys/class/thermal")]
    thermal_path: PathBuf,

    /// GPU load file. May be repeated; the first existing one is used.
    /// Defaults to the Jetson locations.
    #[arg(long = "gpu-load-path", value_name = "PATH")]
    gpu_load_paths: Vec<PathBuf>,

    /// Mount point reported as disk usage.
    #[arg(long, default_value = "/")]
    root_mount: PathBuf,

    /// CPU usage sampling window in milliseconds.
    #[arg(long, default_value = "1000")]
    cpu_window_ms: u64,

    /// Echo wait per device ping, in seconds.
    #[arg(long, default_value = "2")]
    ping_timeout: u64,

    /// Bound on each service query, in seconds.
    #[arg(long, default_value = "5")]
    service_timeout: u64,

    /// Speed test executable.
    #[arg(long, default_value = "speedtest-cli")]
    speedtest_command: String,

    /// Bound on the speed test, in seconds.
    #[arg(long, default_value = "120")]
    speedtest_timeout: u64,

    /// Skip the network performance test.
    #[arg(long)]
    no_speedtest: bool,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let gpu_load_paths = if self.gpu_load_paths.is_empty() {
            defaults.gpu_load_paths
        } else {
            self.gpu_load_paths.clone()
        };

        Settings {
            config_path: self.config.clone(),
            database_path: self.database.clone(),
            table: self.table.clone(),
            interval: Duration::from_secs(self.interval),
            proc_path: self.proc_path.clone(),
            thermal_path: self.thermal_path.clone(),
            gpu_load_paths,
            root_mount: self.root_mount.clone(),
            cpu_window: Duration::from_millis(self.cpu_window_ms),
            ping_timeout: Duration::from_secs(self.ping_timeout),
            service_timeout: Duration::from_secs(self.service_timeout),
            speedtest_command: (!self.no_speedtest).then(|| self.speedtest_command.clone()),
            speedtest_timeout: Duration::from_secs(self.speedtest_timeout),
            once: self.once,
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["falcond", "falcon_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_settings(settings: &Settings) {
    info!(
        "Config: interval={}, config={}, database={} (table {})",
        format_interval(settings.interval.as_secs()),
        settings.config_path.display(),
        settings.database_path.display(),
        settings.table
    );
    info!(
        "Sources: proc={}, thermal={}, root={}, cpu window={}ms",
        settings.proc_path.display(),
        settings.thermal_path.display(),
        settings.root_mount.display(),
        settings.cpu_window.as_millis()
    );
    match &settings.speedtest_command {
        Some(command) => info!(
            "Network test: {} (timeout {}s)",
            command,
            settings.speedtest_timeout.as_secs()
        ),
        None => info!("Network test: disabled"),
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let settings = args.settings();
    if let Err(e) = settings.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(2);
    }

    info!("Falcon Health Monitor {} starting", env!("CARGO_PKG_VERSION"));
    log_settings(&settings);

    let store = match MetricStore::new(&settings.database_path, &settings.table) {
        Ok(store) => store,
        Err(e) => {
            error!("Invalid storage configuration: {}", e);
            process::exit(2);
        }
    };

    let settings = Arc::new(settings);
    let collector = Collector::new(RealFs::new(), SystemRunner::new(), &settings);
    let scheduler = Scheduler::new(Arc::clone(&settings), collector, store);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal, finishing current cycle");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build tokio runtime: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(scheduler.run(&running)) {
        Ok(stats) => info!("Shutdown complete after {} cycles", stats.cycles),
        Err(e) => {
            error!("Could not prepare database: {}", e);
            process::exit(1);
        }
    }
}
