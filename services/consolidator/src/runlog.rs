//! Run Log
//!
//! One entry per processed source (file or sheet), rendered as a plain-text
//! block and appended to the consolidation log. Earlier runs are never
//! rewritten.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use uuid::Uuid;

use crate::consolidate::ConsolidatedInventory;
use crate::error::PipelineStage;
use crate::schema::{CanonicalField, SCHEMA_VERSION};

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";
const WARNINGS_PER_ENTRY: usize = 20;
const NAMES_PER_AGENCY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    /// Processed, but some required fields had no column.
    Partial,
    Failed,
    /// Optional source that was not there.
    Skipped,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileStatus::Ok => "ok",
            FileStatus::Partial => "partial",
            FileStatus::Failed => "failed",
            FileStatus::Skipped => "skipped",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    pub agency: String,
    /// Relative to the data directory where possible. Sheets appear as
    /// `file#sheet`.
    pub source_file: String,
    pub status: FileStatus,
    pub rows: usize,
    pub stage: Option<PipelineStage>,
    pub detail: Option<String>,
    pub missing: Vec<CanonicalField>,
    /// Fields bound from cell values because no header named them.
    pub probed: Vec<CanonicalField>,
    pub warnings: Vec<String>,
    pub sha256: Option<String>,
}

impl RunEntry {
    pub fn new(agency: &str, source_file: &str, status: FileStatus) -> Self {
        Self {
            agency: agency.to_string(),
            source_file: source_file.to_string(),
            status,
            rows: 0,
            stage: None,
            detail: None,
            missing: Vec::new(),
            probed: Vec::new(),
            warnings: Vec::new(),
            sha256: None,
        }
    }

    pub fn failed(agency: &str, source_file: &str, stage: PipelineStage, detail: String) -> Self {
        Self {
            stage: Some(stage),
            detail: Some(detail),
            ..Self::new(agency, source_file, FileStatus::Failed)
        }
    }

    pub fn skipped(agency: &str, source_file: &str, detail: &str) -> Self {
        Self {
            detail: Some(detail.to_string()),
            ..Self::new(agency, source_file, FileStatus::Skipped)
        }
    }

    fn summary_line(&self) -> String {
        let mut line = format!("[{}] {} / {}", self.status, self.agency, self.source_file);
        match self.status {
            FileStatus::Ok | FileStatus::Partial => {
                let _ = write!(line, ": {} row(s)", self.rows);
                if !self.warnings.is_empty() {
                    let _ = write!(line, ", {} warning(s)", self.warnings.len());
                }
            }
            FileStatus::Failed => {
                if let Some(stage) = self.stage {
                    let _ = write!(line, ": failed at {}", stage);
                }
            }
            FileStatus::Skipped => {}
        }
        if let Some(hash) = &self.sha256 {
            let _ = write!(line, " (sha256 {})", &hash[..hash.len().min(12)]);
        }
        line
    }

    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let prefix = format!("{} / {}", self.agency, self.source_file);
        match self.status {
            FileStatus::Failed => issues.push(format!(
                "{}: {} stage failed: {}",
                prefix,
                self.stage.map(|s| s.to_string()).unwrap_or_else(|| "read".to_string()),
                self.detail.as_deref().unwrap_or("unknown error")
            )),
            FileStatus::Skipped => issues.push(format!(
                "{}: skipped: {}",
                prefix,
                self.detail.as_deref().unwrap_or("no source")
            )),
            FileStatus::Partial => {
                let missing: Vec<&str> = self.missing.iter().map(|f| f.title()).collect();
                issues.push(format!(
                    "{}: required fields not found: {}",
                    prefix,
                    missing.join(", ")
                ));
            }
            FileStatus::Ok => {}
        }
        if !self.probed.is_empty() {
            let probed: Vec<&str> = self.probed.iter().map(|f| f.title()).collect();
            issues.push(format!(
                "{}: columns bound by cell values, not header: {}",
                prefix,
                probed.join(", ")
            ));
        }
        for warning in self.warnings.iter().take(WARNINGS_PER_ENTRY) {
            issues.push(format!("{}: {}", prefix, warning));
        }
        if self.warnings.len() > WARNINGS_PER_ENTRY {
            issues.push(format!(
                "{}: ... and {} more warning(s)",
                prefix,
                self.warnings.len() - WARNINGS_PER_ENTRY
            ));
        }
        issues
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ok: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.ok + self.partial + self.failed + self.skipped
    }
}

#[derive(Debug, Clone)]
pub struct RunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    entries: Vec<RunEntry>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: RunEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RunEntry] {
        &self.entries
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in &self.entries {
            match entry.status {
                FileStatus::Ok => counts.ok += 1,
                FileStatus::Partial => counts.partial += 1,
                FileStatus::Failed => counts.failed += 1,
                FileStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Every issue line, in processing order.
    pub fn issues(&self) -> Vec<String> {
        self.entries.iter().flat_map(|e| e.issues()).collect()
    }

    /// Text block for one run.
    pub fn render(&self, inventory: &ConsolidatedInventory) -> String {
        let counts = self.counts();
        let issues = self.issues();
        let mut out = String::new();

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "AI INVENTORY CONSOLIDATION LOG");
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Run ID: {}", self.run_id);
        let _ = writeln!(out, "Started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Schema version: {}", SCHEMA_VERSION);
        let _ = writeln!(out);

        let _ = writeln!(out, "SUMMARY");
        let _ = writeln!(out, "Total use cases extracted: {}", inventory.len());
        let _ = writeln!(out, "Sources processed: {}", counts.total());
        let _ = writeln!(
            out,
            "Sources: {} ok, {} partial, {} failed, {} skipped",
            counts.ok, counts.partial, counts.failed, counts.skipped
        );
        let _ = writeln!(out, "Issues/Warnings found: {}", issues.len());
        let _ = writeln!(out);

        let _ = writeln!(out, "STAGE OF DEVELOPMENT");
        for (stage, count) in inventory.stage_breakdown() {
            let _ = writeln!(out, "  {}: {}", stage, count);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "USE CASES BY AGENCY");
        let _ = writeln!(out, "{}", THIN_RULE);
        for (agency, records) in inventory.by_agency() {
            let _ = writeln!(out, "\n{}: {} use case(s)", agency, records.len());
            for record in records.iter().take(NAMES_PER_AGENCY) {
                let name: String = record
                    .get(CanonicalField::UseCaseName)
                    .chars()
                    .take(60)
                    .collect();
                let _ = writeln!(out, "  • {}", name);
            }
            if records.len() > NAMES_PER_AGENCY {
                let _ = writeln!(out, "  ... and {} more", records.len() - NAMES_PER_AGENCY);
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "SOURCES");
        let _ = writeln!(out, "{}", THIN_RULE);
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.summary_line());
        }

        if !issues.is_empty() {
            let _ = writeln!(out, "\n\n{}", RULE);
            let _ = writeln!(out, "ISSUES AND WARNINGS - PLEASE DOUBLE CHECK");
            let _ = writeln!(out, "{}\n", RULE);
            for issue in &issues {
                let _ = writeln!(out, "⚠ {}\n", issue);
            }
        }
        let _ = writeln!(out);
        out
    }

    /// Append this run's block to `path`, creating the file and its parent
    /// directories if needed.
    pub fn append_to(&self, path: &Path, inventory: &ConsolidatedInventory) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        file.write_all(self.render(inventory).as_bytes())
            .with_context(|| format!("Failed to write log file {}", path.display()))?;
        Ok(())
    }
}
