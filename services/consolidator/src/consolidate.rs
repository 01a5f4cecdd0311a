//! Consolidator
//!
//! Responsibilities:
//! - Walk the manifest in order and resolve each agency's source files
//! - Run every table through header location, field mapping and normalization
//! - Record one RunLog entry per table (or per missing/skipped source)
//! - Collect all records into a single inventory, grouped by agency
//! - Write the inventory atomically as CSV
//!
//! A failing file is logged and the run moves on. Only the final write can
//! fail the run.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::adapters::{AdapterConfig, AdapterRegistry};
use crate::config::Config;
use crate::error::{PipelineError, PipelineStage, ReadError};
use crate::header::{locate_header, HeaderPolicy};
use crate::manifest::{discover_sources, AgencyEntry, Discovery, Manifest, SourceFile};
use crate::mapper::map_fields;
use crate::normalize::{
    normalize_row, NormalizationWarning, NormalizeOptions, NormalizedRecord, Provenance, Stage,
};
use crate::runlog::{FileStatus, RunEntry, RunLog};
use crate::schema::{AliasTable, CanonicalField};
use crate::source::{read_source, RawTable, SourceKind};

// =============================================================================
// INVENTORY
// =============================================================================

/// Every normalized record of a run, agencies contiguous and in manifest
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidatedInventory {
    records: Vec<NormalizedRecord>,
}

impl ConsolidatedInventory {
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Agency name with its records, in output order.
    pub fn by_agency(&self) -> Vec<(&str, &[NormalizedRecord])> {
        let mut groups = Vec::new();
        let mut start = 0;
        for idx in 1..=self.records.len() {
            let boundary = idx == self.records.len()
                || self.records[idx].provenance.agency_id != self.records[start].provenance.agency_id;
            if boundary {
                groups.push((
                    self.records[start].provenance.agency.as_str(),
                    &self.records[start..idx],
                ));
                start = idx;
            }
        }
        groups
    }

    /// Record count per canonical stage, all stages listed.
    pub fn stage_breakdown(&self) -> Vec<(Stage, usize)> {
        Stage::ALL
            .iter()
            .map(|stage| {
                let count = self.records.iter().filter(|r| r.stage() == *stage).count();
                (*stage, count)
            })
            .collect()
    }

    /// Write the CSV to a temp file beside `path`, then rename it into place.
    /// A header-only file is written when there are no records.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(&mut tmp);
            writer.write_record(CanonicalField::header_row())?;
            for record in &self.records {
                writer.write_record(record.values())?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move inventory into {}", path.display()))?;
        Ok(())
    }
}

// =============================================================================
// TABLE PIPELINE
// =============================================================================

/// Per-table inputs that stay fixed for one agency.
#[derive(Debug, Clone, Copy)]
pub struct TableContext<'a> {
    pub entry: &'a AgencyEntry,
    pub agency: &'a str,
    pub aliases: &'a AliasTable,
    pub adapter: &'a AdapterConfig,
    pub policy: HeaderPolicy,
}

#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub records: Vec<NormalizedRecord>,
    pub header_row: usize,
    pub missing: Vec<CanonicalField>,
    pub probed: Vec<CanonicalField>,
    pub warnings: Vec<NormalizationWarning>,
    /// Records removed by the adapter.
    pub dropped: usize,
}

impl TableOutcome {
    pub fn status(&self) -> FileStatus {
        if self.missing.is_empty() {
            FileStatus::Ok
        } else {
            FileStatus::Partial
        }
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Header, map and normalize one raw table.
pub fn process_table(
    table: &RawTable,
    source_label: &str,
    ctx: &TableContext<'_>,
) -> Result<TableOutcome, PipelineError> {
    let header_idx = locate_header(table, ctx.aliases, ctx.policy)?;
    let header = &table.rows()[header_idx];
    let data = &table.rows()[header_idx + 1..];
    let first_data = data.iter().find(|r| !is_blank(r));

    let mut mapping = map_fields(header, first_data.map(Vec::as_slice), ctx.aliases);
    if mapping.is_empty() {
        let cells: Vec<&str> = header
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        return Err(PipelineError::NothingMapped {
            header: cells.join(" | "),
        });
    }

    let options = NormalizeOptions {
        composite_id: ctx.adapter.composite_rule(),
    };
    if options.composite_id.is_some() && mapping.is_mapped(CanonicalField::UseCaseName) {
        mapping.mark_supplied(CanonicalField::UseCaseId);
    }

    if first_data.is_none() {
        return Err(PipelineError::NoDataRows);
    }

    let mut warnings = Vec::new();
    let mut records = Vec::new();
    for (offset, row) in data.iter().enumerate() {
        let provenance = Provenance {
            agency_id: ctx.entry.id.clone(),
            agency: ctx.agency.to_string(),
            source_file: source_label.to_string(),
            row: header_idx + offset + 2,
        };
        if let Some(record) = normalize_row(row, &mapping, provenance, &options, &mut warnings) {
            records.push(record);
        }
    }
    let dropped = ctx.adapter.post_process(&mut records);

    if records.is_empty() {
        return Err(PipelineError::NoQualifyingRows {
            rows: data.iter().filter(|r| !is_blank(r)).count(),
        });
    }

    Ok(TableOutcome {
        records,
        header_row: header_idx,
        missing: mapping.missing().iter().copied().collect(),
        probed: mapping.probed().iter().copied().collect(),
        warnings,
        dropped,
    })
}

// =============================================================================
// RUN
// =============================================================================

pub struct ConsolidationRun {
    pub inventory: ConsolidatedInventory,
    pub log: RunLog,
}

pub struct Consolidator {
    config: Config,
    registry: AdapterRegistry,
}

impl Consolidator {
    pub fn new(config: Config, registry: AdapterRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every enabled agency in manifest order.
    pub fn run(&self, manifest: &Manifest) -> ConsolidationRun {
        let mut log = RunLog::new();
        let mut records = Vec::new();

        for entry in manifest.enabled() {
            let agency_records = self.process_agency(entry, &mut log);
            info!(agency = %entry.id, records = agency_records.len(), "agency done");
            records.extend(agency_records);
        }

        ConsolidationRun {
            inventory: ConsolidatedInventory::new(records),
            log,
        }
    }

    fn process_agency(&self, entry: &AgencyEntry, log: &mut RunLog) -> Vec<NormalizedRecord> {
        let agency = entry.display_name();
        let adapter = self.registry.resolve(entry);
        let aliases = AliasTable::standard().with_additions(&entry.aliases);

        let sources = match (&adapter.html_source, &entry.path) {
            (Some(page), None) => {
                let path = entry.agency_dir(&self.config.data_dir).join(page);
                if !path.is_file() {
                    info!(agency = %entry.id, file = %path.display(), "optional page not present");
                    log.push(RunEntry::skipped(&agency, &self.label(&path), "missing source"));
                    return Vec::new();
                }
                vec![SourceFile {
                    path,
                    kind: SourceKind::Html,
                }]
            }
            _ => match discover_sources(entry, &self.config.data_dir) {
                Ok(Discovery::Sources(files)) => files,
                Ok(Discovery::PdfOnly(pdfs)) => {
                    for pdf in pdfs {
                        warn!(agency = %entry.id, file = %pdf.display(), "PDF only, skipped");
                        log.push(RunEntry::skipped(
                            &agency,
                            &self.label(&pdf),
                            "PDF only, manual review needed",
                        ));
                    }
                    return Vec::new();
                }
                Ok(Discovery::Missing(path)) => {
                    let err = ReadError::FileNotFound(path.clone());
                    warn!(agency = %entry.id, error = %err, "no source files");
                    log.push(RunEntry::failed(
                        &agency,
                        &self.label(&path),
                        PipelineStage::Read,
                        err.to_string(),
                    ));
                    return Vec::new();
                }
                Err(err) => {
                    let dir = entry.agency_dir(&self.config.data_dir);
                    warn!(agency = %entry.id, error = %err, "failed to list sources");
                    log.push(RunEntry::failed(
                        &agency,
                        &self.label(&dir),
                        PipelineStage::Read,
                        err.to_string(),
                    ));
                    return Vec::new();
                }
            },
        };

        let ctx = TableContext {
            entry,
            agency: &agency,
            aliases: &aliases,
            adapter: &adapter,
            policy: self.config.header,
        };
        let mut records = Vec::new();
        for file in &sources {
            records.extend(self.process_file(file, &ctx, log));
        }
        records
    }

    fn process_file(
        &self,
        file: &SourceFile,
        ctx: &TableContext<'_>,
        log: &mut RunLog,
    ) -> Vec<NormalizedRecord> {
        let file_label = self.label(&file.path);
        let sha256 = file_sha256(&file.path);

        let tables = match read_source(&file.path, file.kind, &ctx.adapter.sheet_selector()) {
            Ok(tables) => tables,
            Err(err) => {
                warn!(agency = %ctx.entry.id, file = %file_label, error = %err, "read failed");
                let mut entry =
                    RunEntry::failed(ctx.agency, &file_label, PipelineStage::Read, err.to_string());
                entry.sha256 = sha256;
                log.push(entry);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for table in &tables {
            let label = table_label(&file_label, table.name());
            match process_table(table, &label, ctx) {
                Ok(outcome) => {
                    let mut entry = RunEntry::new(ctx.agency, &label, outcome.status());
                    entry.rows = outcome.records.len();
                    entry.missing = outcome.missing.clone();
                    entry.probed = outcome.probed.clone();
                    entry.warnings = outcome.warnings.iter().map(|w| w.to_string()).collect();
                    if outcome.dropped > 0 {
                        entry.detail = Some(format!("{} placeholder record(s) dropped", outcome.dropped));
                    }
                    entry.sha256 = sha256.clone();
                    info!(
                        agency = %ctx.entry.id,
                        file = %label,
                        rows = entry.rows,
                        header_row = outcome.header_row,
                        status = %entry.status,
                        "table processed"
                    );
                    log.push(entry);
                    records.extend(outcome.records);
                }
                Err(err) => {
                    warn!(
                        agency = %ctx.entry.id,
                        file = %label,
                        stage = %err.stage(),
                        error = %err,
                        "table failed"
                    );
                    let mut entry = RunEntry::failed(ctx.agency, &label, err.stage(), err.to_string());
                    entry.sha256 = sha256.clone();
                    log.push(entry);
                }
            }
        }
        records
    }

    /// Path relative to the data directory when it lives there.
    fn label(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.data_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Full run: load or discover the manifest, consolidate, then write the
/// artifact and append the log unless `dry_run` is set.
///
/// Errors only for an unreadable manifest or a failed artifact write. A log
/// that cannot be appended is reported and ignored.
pub fn run(config: Config) -> Result<ConsolidationRun> {
    let manifest = match &config.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::discover(&config.data_dir)?,
    };
    info!(
        agencies = manifest.agencies.len(),
        version = %manifest.version,
        "manifest loaded"
    );

    let registry = AdapterRegistry::builtin().with_overrides(&manifest.adapters);
    let consolidator = Consolidator::new(config, registry);
    let result = consolidator.run(&manifest);
    let config = consolidator.config();

    if config.dry_run {
        info!("dry run, nothing written");
        return Ok(result);
    }

    result
        .inventory
        .write_csv(&config.output)
        .with_context(|| format!("Failed to write inventory {}", config.output.display()))?;
    info!(file = %config.output.display(), records = result.inventory.len(), "inventory written");

    if let Err(err) = result.log.append_to(&config.log_file, &result.inventory) {
        warn!(file = %config.log_file.display(), error = %format!("{:#}", err), "run log not written");
    }
    Ok(result)
}

/// `dept/inventory.xlsx` + `inventory.xlsx#AI` -> `dept/inventory.xlsx#AI`.
fn table_label(file_label: &str, table_name: &str) -> String {
    match table_name.split_once('#') {
        Some((_, sheet)) => format!("{}#{}", file_label, sheet),
        None => file_label.to_string(),
    }
}

fn file_sha256(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}
