//! Error kinds for the per-file pipeline.
//!
//! Read and header errors abort a single file. Incomplete mappings and
//! normalization warnings are not errors: they travel as data and show up in
//! the run log.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{}: not valid UTF-8 and not decodable as {legacy}", .path.display())]
    EncodingUnrecoverable { path: PathBuf, legacy: &'static str },

    #[error("sheet '{sheet}' not found in {} (available: {})", .path.display(), .available.join(", "))]
    SheetNotFound {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("no table found in {}", .0.display())]
    NoTableFound(PathBuf),

    #[error("unsupported source type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {}: {source}", .path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no header row with at least {min_matches} keyword matches in the first {scanned} rows")]
pub struct HeaderNotFound {
    pub scanned: usize,
    pub min_matches: usize,
}

/// Pipeline step a file failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Read,
    Header,
    Map,
    Normalize,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStage::Read => "read",
            PipelineStage::Header => "header",
            PipelineStage::Map => "map",
            PipelineStage::Normalize => "normalize",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Header(#[from] HeaderNotFound),

    #[error("no column maps to a canonical field (header: {header})")]
    NothingMapped { header: String },

    #[error("no data rows below the header")]
    NoDataRows,

    #[error("{rows} data rows but none has a use case ID or name")]
    NoQualifyingRows { rows: usize },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Read(_) => PipelineStage::Read,
            PipelineError::Header(_) => PipelineStage::Header,
            PipelineError::NothingMapped { .. } => PipelineStage::Map,
            PipelineError::NoDataRows | PipelineError::NoQualifyingRows { .. } => {
                PipelineStage::Normalize
            }
        }
    }
}
