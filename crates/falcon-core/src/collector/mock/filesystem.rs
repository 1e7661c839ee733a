//! In-memory mock filesystem for testing probes without real sysfs/procfs.

use crate::collector::traits::{DiskSpace, FileSystem};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files, directories and mount capacities in memory, allowing tests
/// to simulate hosts with and without thermal zones, GPU load interfaces, etc.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Capacity per mount point.
    mounts: HashMap<PathBuf, DiskSpace>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Registers a mounted filesystem with the given capacity.
    pub fn add_mount(
        &mut self,
        mount_point: impl AsRef<Path>,
        total: u64,
        free: u64,
        available: u64,
    ) {
        self.mounts.insert(
            mount_point.as_ref().to_path_buf(),
            DiskSpace {
                total,
                free,
                available,
            },
        );
    }

    /// Adds `/sys/class/thermal/thermal_zone<index>` with its `type` and `temp` files.
    pub fn add_thermal_zone(&mut self, index: u32, zone_type: &str, millidegrees: &str) {
        let base = PathBuf::from(format!("/sys/class/thermal/thermal_zone{}", index));
        self.add_dir(&base);
        self.add_file(base.join("type"), format!("{}\n", zone_type));
        self.add_file(base.join("temp"), format!("{}\n", millidegrees));
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }

    fn disk_usage(&self, mount_point: &Path) -> io::Result<DiskSpace> {
        self.mounts.get(mount_point).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {:?}", mount_point),
            )
        })
    }
}
