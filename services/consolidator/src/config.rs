//! Run configuration. Built from CLI flags by the binary, or directly in tests.

use std::path::PathBuf;

use crate::header::HeaderPolicy;

pub const DEFAULT_DATA_DIR: &str = "data/raw";
pub const DEFAULT_OUTPUT: &str = "data/clean/consolidated_ai_inventory.csv";
pub const DEFAULT_LOG_FILE: &str = "data/build/consolidation_log.txt";

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON manifest. `None` means discover agency folders.
    pub manifest: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub log_file: PathBuf,
    pub header: HeaderPolicy,
    /// Run everything but write neither the artifact nor the log.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            header: HeaderPolicy::default(),
            dry_run: false,
        }
    }
}

impl Config {
    /// Config rooted at `dir`: data in `dir/raw`, outputs next to it.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            manifest: None,
            data_dir: dir.join("raw"),
            output: dir.join("clean").join("consolidated_ai_inventory.csv"),
            log_file: dir.join("build").join("consolidation_log.txt"),
            header: HeaderPolicy::default(),
            dry_run: false,
        }
    }
}
