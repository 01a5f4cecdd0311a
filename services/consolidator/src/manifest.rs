//! Agency manifest
//!
//! Ordered list of agencies to consolidate. It is maintained by the download
//! tooling and only read here. Example `config/agencies.json`:
//!
//! ```json
//! {
//!   "version": "2025",
//!   "agencies": [
//!     { "id": "department-of-justice", "name": "Department Of Justice",
//!       "url": "https://www.justice.gov/...", "kind": "spreadsheet",
//!       "sheet": "Reportable AI Use Cases" },
//!     { "id": "department-of-energy", "name": "Department Of Energy",
//!       "aliases": { "use_case_name": ["AI Project"] } }
//!   ]
//! }
//! ```
//!
//! Without a manifest the agency list is the sorted set of folders under the
//! data directory.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::AdapterConfig;
use crate::error::ReadError;
use crate::schema::CanonicalField;
use crate::source::SourceKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    pub agencies: Vec<AgencyEntry>,
    /// Adapters declared next to the agencies, keyed by adapter name.
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyEntry {
    /// Slug, also the folder name under the data directory.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Where the downloader got the file. Informational only.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: Option<SourceKind>,
    /// File path relative to the data directory. Overrides folder discovery.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Sheet name, or `*` for every sheet.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Adapter registry key. Defaults to `id`.
    #[serde(default)]
    pub adapter: Option<String>,
    /// Extra header aliases for this agency only.
    #[serde(default)]
    pub aliases: BTreeMap<CanonicalField, Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl AgencyEntry {
    pub fn from_slug(slug: &str) -> Self {
        Self {
            id: slug.to_string(),
            name: title_case_slug(slug),
            url: None,
            kind: None,
            path: None,
            sheet: None,
            adapter: None,
            aliases: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            title_case_slug(&self.id)
        } else {
            self.name.trim().to_string()
        }
    }

    pub fn adapter_key(&self) -> &str {
        self.adapter.as_deref().unwrap_or(&self.id)
    }

    pub fn agency_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.id)
    }
}

impl Manifest {
    /// Load and validate a JSON manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// One entry per agency folder under `data_dir`, in name order. Hidden
    /// folders and folders starting with a digit (archived years) are skipped.
    pub fn discover(data_dir: &Path) -> Result<Self> {
        let mut slugs = Vec::new();
        let entries = fs::read_dir(data_dir)
            .with_context(|| format!("Failed to list data directory {}", data_dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || name.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            slugs.push(name);
        }
        slugs.sort();

        Ok(Manifest {
            agencies: slugs.iter().map(|s| AgencyEntry::from_slug(s)).collect(),
            ..Manifest::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.agencies {
            if entry.id.trim().is_empty() {
                bail!("Manifest entry with empty id (name: '{}')", entry.name);
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("Duplicate agency id in manifest: {}", entry.id);
            }
        }
        Ok(())
    }

    /// Enabled agencies in manifest order.
    pub fn enabled(&self) -> impl Iterator<Item = &AgencyEntry> {
        self.agencies.iter().filter(|a| a.enabled)
    }
}

/// `"department-of-agriculture"` -> `"Department Of Agriculture"`.
pub fn title_case_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// =============================================================================
// SOURCE DISCOVERY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Tabular files to process, in name order.
    Sources(Vec<SourceFile>),
    /// Only PDFs were found; they need manual review.
    PdfOnly(Vec<PathBuf>),
    /// Nothing on disk where the agency's data should be.
    Missing(PathBuf),
}

/// Resolve which files to process for an agency.
pub fn discover_sources(entry: &AgencyEntry, data_dir: &Path) -> Result<Discovery, ReadError> {
    if let Some(path) = &entry.path {
        let full = data_dir.join(path);
        if !full.is_file() {
            return Ok(Discovery::Missing(full));
        }
        let kind = entry
            .kind
            .or_else(|| SourceKind::from_path(&full))
            .unwrap_or(SourceKind::Csv);
        return Ok(Discovery::Sources(vec![SourceFile { path: full, kind }]));
    }

    let dir = entry.agency_dir(data_dir);
    if !dir.is_dir() {
        return Ok(Discovery::Missing(dir));
    }
    let listing = fs::read_dir(&dir).map_err(|source| ReadError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut files: Vec<PathBuf> = listing
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            !p.file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
        })
        .collect();
    files.sort();

    let mut sources = Vec::new();
    let mut pdfs = Vec::new();
    for path in files {
        match SourceKind::from_path(&path) {
            Some(SourceKind::Pdf) => pdfs.push(path),
            Some(SourceKind::Html) if entry.kind != Some(SourceKind::Html) => {}
            Some(kind) if entry.kind.map_or(true, |k| k == kind) => {
                sources.push(SourceFile { path, kind })
            }
            _ => {}
        }
    }

    Ok(if !sources.is_empty() {
        Discovery::Sources(sources)
    } else if !pdfs.is_empty() {
        Discovery::PdfOnly(pdfs)
    } else {
        Discovery::Missing(dir)
    })
}
