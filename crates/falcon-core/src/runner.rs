//! The collection loop.
//!
//! `Scheduler::run` ensures the schema once, then repeats
//! reload config → collect → append → sleep until the running flag is
//! cleared. The flag is only checked between cycles, so a cycle that has
//! started always finishes and writes its row.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::collector::{Collector, CommandRunner, FileSystem};
use crate::config::{MonitorConfig, Settings};
use crate::fmt::format_interval;
use crate::storage::{MetricStore, StoreError};

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sample was written.
    Stored,
    /// The sample was collected but the write failed.
    Dropped,
    /// The cycle panicked before finishing.
    Faulted,
}

/// Counters over the lifetime of a `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub cycles: u64,
    pub stored: u64,
    pub dropped: u64,
    pub faulted: u64,
}

impl RunStats {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Stored => self.stored += 1,
            CycleOutcome::Dropped => self.dropped += 1,
            CycleOutcome::Faulted => self.faulted += 1,
        }
    }
}

/// Drives collection cycles at a fixed interval.
pub struct Scheduler<F, R>
where
    F: FileSystem + Clone + 'static,
    R: CommandRunner + Clone + 'static,
{
    settings: Arc<Settings>,
    collector: Arc<Collector<F, R>>,
    store: Arc<MetricStore>,
}

impl<F, R> Scheduler<F, R>
where
    F: FileSystem + Clone + 'static,
    R: CommandRunner + Clone + 'static,
{
    pub fn new(settings: Arc<Settings>, collector: Collector<F, R>, store: MetricStore) -> Self {
        Self {
            settings,
            collector: Arc::new(collector),
            store: Arc::new(store),
        }
    }

    /// Runs cycles while `running` is set (or exactly one with `once`).
    ///
    /// Fails only if the schema cannot be created at startup.
    pub async fn run(&self, running: &AtomicBool) -> Result<RunStats, StoreError> {
        self.store.ensure_schema().await?;
        info!(
            "storage ready at {} (table {})",
            self.store.path().display(),
            self.store.table()
        );

        let interval = self.settings.interval;
        let mut stats = RunStats::default();

        info!("starting collection loop");

        while running.load(Ordering::SeqCst) {
            let start = Instant::now();
            let outcome = self.run_cycle().await;
            stats.record(outcome);

            let elapsed = start.elapsed();
            if elapsed > interval {
                warn!(
                    duration_ms = elapsed.as_millis() as u64,
                    interval_ms = interval.as_millis() as u64,
                    "cycle took longer than the interval"
                );
            }

            if self.settings.once {
                break;
            }

            if outcome == CycleOutcome::Stored {
                info!(
                    "cycle #{}: logged stats, next check in {}",
                    stats.cycles,
                    format_interval(interval.as_secs())
                );
            }

            sleep_while_running(interval, running).await;
        }

        info!(
            cycles = stats.cycles,
            stored = stats.stored,
            dropped = stats.dropped,
            faulted = stats.faulted,
            "monitor stopped"
        );
        Ok(stats)
    }

    /// Runs one cycle on its own task so a panic anywhere inside it is
    /// contained here.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let collector = Arc::clone(&self.collector);
        let store = Arc::clone(&self.store);
        let config_path = self.settings.config_path.clone();

        let task = tokio::spawn(async move {
            let config = MonitorConfig::load(&config_path);
            let sample = collector.collect(&config).await;
            debug!(
                sample = %serde_json::to_string(&sample).unwrap_or_default(),
                "collected"
            );
            store.append(&sample).await
        });

        match task.await {
            Ok(true) => CycleOutcome::Stored,
            Ok(false) => CycleOutcome::Dropped,
            Err(e) => {
                error!("cycle aborted: {}", e);
                CycleOutcome::Faulted
            }
        }
    }
}

/// Sleeps for `interval` in short slices, returning early once `running` is cleared.
async fn sleep_while_running(interval: Duration, running: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut remaining = interval;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let step = remaining.min(slice);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::DiskSpace;
    use crate::collector::mock::{MockFs, MockResponse, MockRunner};
    use std::io;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        Settings {
            config_path: dir.path().join("ips.json"),
            database_path: dir.path().join("health_monitor.db"),
            interval: Duration::from_millis(10),
            cpu_window: Duration::ZERO,
            ..Settings::default()
        }
    }

    fn scheduler<F: FileSystem + Clone + 'static>(
        settings: Settings,
        fs: F,
        runner: MockRunner,
    ) -> Scheduler<F, MockRunner> {
        let store = MetricStore::new(&settings.database_path, &settings.table).unwrap();
        let collector = Collector::new(fs, runner, &settings);
        Scheduler::new(Arc::new(settings), collector, store)
    }

    /// Host whose thermal interface crashes the reader.
    #[derive(Clone)]
    struct PanickingFs;

    impl FileSystem for PanickingFs {
        fn read_to_string(&self, _path: &Path) -> io::Result<String> {
            panic!("sysfs exploded")
        }

        fn exists(&self, _path: &Path) -> bool {
            panic!("sysfs exploded")
        }

        fn read_dir(&self, _path: &Path) -> io::Result<Vec<PathBuf>> {
            panic!("sysfs exploded")
        }

        fn disk_usage(&self, _mount_point: &Path) -> io::Result<DiskSpace> {
            panic!("sysfs exploded")
        }
    }

    #[tokio::test]
    async fn test_run_once_stores_one_row() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            once: true,
            ..settings_in(&dir)
        };
        std::fs::write(&settings.config_path, r#"{"services": ["sshd"]}"#).unwrap();

        let runner = MockRunner::new();
        runner.respond("systemctl is-active --quiet sshd", MockResponse::ok(""));
        let scheduler = scheduler(settings, MockFs::new(), runner);

        let stats = scheduler.run(&AtomicBool::new(true)).await.unwrap();
        assert_eq!(
            stats,
            RunStats {
                cycles: 1,
                stored: 1,
                ..Default::default()
            }
        );

        let row = scheduler.store.latest().await.unwrap().unwrap();
        assert_eq!(row["service_statuses"], "sshd: active");
        assert_eq!(row["device_statuses"], "");
        assert_eq!(row["cpu_temp_c"], "N/A");
    }

    #[tokio::test]
    async fn test_cleared_flag_runs_no_cycle() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(settings_in(&dir), MockFs::new(), MockRunner::new());

        let stats = scheduler.run(&AtomicBool::new(false)).await.unwrap();
        assert_eq!(stats.cycles, 0);
        // Schema is still created on start.
        assert_eq!(scheduler.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loop_stops_between_cycles() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(settings_in(&dir), MockFs::new(), MockRunner::new());

        let running = Arc::new(AtomicBool::new(true));
        let stopper = Arc::clone(&running);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            stopper.store(false, Ordering::SeqCst);
        });

        let stats = scheduler.run(&running).await.unwrap();
        assert!(stats.cycles >= 2, "only {} cycles", stats.cycles);
        assert_eq!(stats.stored, stats.cycles);
        assert_eq!(
            scheduler.store.count().await.unwrap(),
            stats.cycles as i64
        );
    }

    #[tokio::test]
    async fn test_panicking_cycle_is_contained() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(settings_in(&dir), PanickingFs, MockRunner::new());
        scheduler.store.ensure_schema().await.unwrap();

        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Faulted);
        // The scheduler is still usable and the next cycle runs.
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Faulted);
        // No partial row was written.
        assert_eq!(scheduler.store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_next_cycle() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            database_path: dir.path().join("missing/dir/health_monitor.db"),
            ..settings_in(&dir)
        };
        let scheduler = scheduler(settings, MockFs::new(), MockRunner::new());

        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Dropped);
        assert_eq!(scheduler.run_cycle().await, CycleOutcome::Dropped);
    }

    #[tokio::test]
    async fn test_run_fails_without_schema() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            database_path: dir.path().join("missing/dir/health_monitor.db"),
            ..settings_in(&dir)
        };
        let scheduler = scheduler(settings, MockFs::new(), MockRunner::new());

        assert!(scheduler.run(&AtomicBool::new(true)).await.is_err());
    }

    #[tokio::test]
    async fn test_sleep_returns_early_when_stopped() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        sleep_while_running(Duration::from_secs(60), &running).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
