//! Record Normalizer
//!
//! Turns one raw data row plus a column mapping into a `NormalizedRecord`:
//! - cleans cell text and replaces blanks/null literals with the empty marker
//! - reduces free-text stage of development to the three canonical stages
//! - splits composite `ID: Name` cells when an agency needs it
//!
//! Nothing in here fails. Problems are reported as `NormalizationWarning`s and
//! the affected field is left empty.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::mapper::FieldMapping;
use crate::schema::{looks_like_identifier, CanonicalField, EMPTY};

// =============================================================================
// STAGE VOCABULARY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    InDevelopment,
    InOperation,
    Retired,
    Unknown,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::InDevelopment,
        Stage::InOperation,
        Stage::Retired,
        Stage::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::InDevelopment => "In Development",
            Stage::InOperation => "In Operation",
            Stage::Retired => "Retired",
            Stage::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Keyword rule. A rule fires when the lowercased stage text contains any of
/// its keywords.
#[derive(Debug, Clone, Copy)]
pub struct StageRule {
    pub stage: Stage,
    pub keywords: &'static [&'static str],
}

/// Evaluated in order, first hit wins. Retired comes first because retired
/// entries often still mention their former production stage.
pub const STAGE_RULES: &[StageRule] = &[
    StageRule {
        stage: Stage::Retired,
        keywords: &["retired", "stage 5", "decommissioned", "discontinued"],
    },
    StageRule {
        stage: Stage::InOperation,
        keywords: &[
            "deployed",
            "stage 4",
            "operation and maintenance",
            "in mission",
            "production",
        ],
    },
    StageRule {
        stage: Stage::InDevelopment,
        keywords: &[
            "stage 1",
            "initiation",
            "initiated",
            "stage 2",
            "development",
            "acquisition",
            "sandbox",
            "pre-deployment",
            "pre deployment",
            "stage 3",
            "pilot",
            "implementation",
            "planned",
            "planning",
        ],
    },
];

static OPTION_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-e]\)\s*|[a-e]\s+)").expect("option marker pattern is valid"));

/// Stage cells are short labels, not sentences.
const MAX_STAGE_CELL_CHARS: usize = 40;
const MAX_STAGE_CELL_WORDS: usize = 6;

/// True when a cell reads like a stage label (e.g. `Operation and
/// Maintenance`) rather than prose that happens to mention a stage keyword.
pub fn looks_like_stage(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    let text = OPTION_MARKER_RE.replace(&lowered, "");
    if text.is_empty()
        || text.chars().count() > MAX_STAGE_CELL_CHARS
        || text.split_whitespace().count() > MAX_STAGE_CELL_WORDS
    {
        return false;
    }
    normalize_stage(&text) != Stage::Unknown
}

/// Map raw stage text to its canonical stage. Pure function of the text,
/// case and surrounding whitespace are ignored.
pub fn normalize_stage(raw: &str) -> Stage {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return Stage::Unknown;
    }
    let text = OPTION_MARKER_RE.replace(&lowered, "");

    STAGE_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
        .map(|rule| rule.stage)
        .unwrap_or(Stage::Unknown)
}

// =============================================================================
// CELL CLEANUP
// =============================================================================

const SPREADSHEET_ERRORS: &[&str] = &[
    "#N/A", "#REF!", "#VALUE!", "#DIV/0!", "#NAME?", "#NULL!", "#NUM!",
];

const NULL_LITERALS: &[&str] = &["nan", "none", "null"];

/// Trim, unify line endings and drop non-breaking spaces.
pub fn clean_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

/// Clean one cell. Error and null literals become the empty marker and
/// return the reason alongside.
pub fn clean_cell(raw: &str) -> (String, Option<String>) {
    let text = clean_text(raw);
    if text.is_empty() {
        return (EMPTY.to_string(), None);
    }
    if SPREADSHEET_ERRORS.contains(&text.as_str()) {
        return (EMPTY.to_string(), Some(format!("spreadsheet error value '{}'", text)));
    }
    if NULL_LITERALS.contains(&text.to_lowercase().as_str()) {
        return (EMPTY.to_string(), Some(format!("null literal '{}'", text)));
    }
    (text, None)
}

// =============================================================================
// COMPOSITE ID SPLITTING
// =============================================================================

/// `"USDA-001: Soil Sensor AI"` style cells carrying both ID and name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeIdRule {
    /// Only split when the ID starts with this prefix.
    pub prefix: Option<String>,
}

impl CompositeIdRule {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
        }
    }

    /// Returns `(id, name)` when the text has the composite shape.
    pub fn split(&self, text: &str) -> Option<(String, String)> {
        let (id, name) = text.split_once(':')?;
        let (id, name) = (id.trim(), name.trim());
        if name.is_empty() || !looks_like_identifier(id) {
            return None;
        }
        if let Some(prefix) = &self.prefix {
            if !id.starts_with(prefix.as_str()) {
                return None;
            }
        }
        Some((id.to_string(), name.to_string()))
    }
}

// =============================================================================
// NORMALIZED RECORDS
// =============================================================================

/// Where a record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub agency_id: String,
    pub agency: String,
    pub source_file: String,
    /// 1-based row number inside the source table.
    pub row: usize,
}

/// One use case. Holds a value for every canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub provenance: Provenance,
    values: [String; CanonicalField::COUNT],
}

impl NormalizedRecord {
    pub fn new(provenance: Provenance) -> Self {
        let mut record = Self {
            values: std::array::from_fn(|_| EMPTY.to_string()),
            provenance,
        };
        record.set(CanonicalField::Agency, record.provenance.agency.clone());
        record.set(
            CanonicalField::StageOfDevelopmentNormalized,
            Stage::Unknown.label().to_string(),
        );
        record
    }

    pub fn get(&self, field: CanonicalField) -> &str {
        &self.values[field.index()]
    }

    pub fn set(&mut self, field: CanonicalField, value: String) {
        self.values[field.index()] = value;
    }

    /// Values in canonical declaration order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn stage(&self) -> Stage {
        Stage::from_label(self.get(CanonicalField::StageOfDevelopmentNormalized))
            .unwrap_or(Stage::Unknown)
    }

    fn is_identified(&self) -> bool {
        !self.get(CanonicalField::UseCaseId).is_empty()
            || !self.get(CanonicalField::UseCaseName).is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
    pub field: CanonicalField,
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}: {}", self.row, self.field, self.reason)
    }
}

/// Per-agency switches for the normalizer.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub composite_id: Option<CompositeIdRule>,
}

/// Normalize one data row. Returns `None` for rows that do not describe a use
/// case (blank rows, or rows with neither ID nor name).
pub fn normalize_row(
    row: &[String],
    mapping: &FieldMapping,
    provenance: Provenance,
    options: &NormalizeOptions,
    warnings: &mut Vec<NormalizationWarning>,
) -> Option<NormalizedRecord> {
    if row.iter().all(|c| c.trim().is_empty()) {
        return None;
    }
    let row_num = provenance.row;
    let mut record = NormalizedRecord::new(provenance);

    for (&col, &field) in mapping.columns() {
        let raw = row.get(col).map(String::as_str).unwrap_or(EMPTY);
        let (value, issue) = clean_cell(raw);
        if let Some(reason) = issue {
            warnings.push(NormalizationWarning {
                field,
                row: row_num,
                reason,
            });
        }
        record.set(field, value);
    }

    if let Some(rule) = &options.composite_id {
        if record.get(CanonicalField::UseCaseId).is_empty() {
            if let Some((id, name)) = rule.split(record.get(CanonicalField::UseCaseName)) {
                record.set(CanonicalField::UseCaseId, id);
                record.set(CanonicalField::UseCaseName, name);
            }
        }
    }

    let raw_stage = record.get(CanonicalField::StageOfDevelopmentRaw).to_string();
    let stage = normalize_stage(&raw_stage);
    if stage == Stage::Unknown && !raw_stage.is_empty() {
        warnings.push(NormalizationWarning {
            field: CanonicalField::StageOfDevelopmentNormalized,
            row: row_num,
            reason: format!("unrecognized stage '{}'", raw_stage),
        });
    }
    record.set(CanonicalField::StageOfDevelopmentNormalized, stage.label().to_string());

    record.is_identified().then_some(record)
}
