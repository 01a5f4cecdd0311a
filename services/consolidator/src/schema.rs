//! Canonical inventory schema
//!
//! The closed set of output fields, the alias table used to recognise them in
//! agency headers, and the value-shape hints used when header text is not
//! enough. Everything here is static data built once per process.
//!
//! Adding a field means extending `CanonicalField::ALL` and `STANDARD_ALIASES`
//! and bumping `SCHEMA_VERSION`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::normalize::looks_like_stage;

/// Version of the canonical field set. Recorded in every run log block.
pub const SCHEMA_VERSION: &str = "2025.1";

/// Empty marker for fields with no value.
pub const EMPTY: &str = "";

// =============================================================================
// CANONICAL FIELDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Agency,
    UseCaseId,
    UseCaseName,
    BureauComponent,
    StageOfDevelopmentRaw,
    StageOfDevelopmentNormalized,
    HighImpact,
    Justification,
    TopicArea,
    AiClassification,
    ProblemSolved,
    ExpectedBenefits,
    SystemOutputs,
    OperationalDate,
    VendorPurchased,
    VendorName,
    AuthorizationToOperate,
    SystemName,
    TrainingData,
    TrainingDataCatalog,
    Pii,
    PrivacyImpactAssessment,
    DemographicVariables,
    CustomCode,
    CodeLink,
    PreDeploymentTesting,
    ImpactAssessment,
    ImpactAssessmentDetails,
    IndependentReview,
    OngoingMonitoring,
    OperatorTraining,
    FailSafe,
    AppealProcess,
    PublicFeedback,
}

impl CanonicalField {
    pub const COUNT: usize = 34;

    /// Declaration order. This is the output column order and the tie-break
    /// order for alias matching.
    pub const ALL: [CanonicalField; Self::COUNT] = [
        Self::Agency,
        Self::UseCaseId,
        Self::UseCaseName,
        Self::BureauComponent,
        Self::StageOfDevelopmentRaw,
        Self::StageOfDevelopmentNormalized,
        Self::HighImpact,
        Self::Justification,
        Self::TopicArea,
        Self::AiClassification,
        Self::ProblemSolved,
        Self::ExpectedBenefits,
        Self::SystemOutputs,
        Self::OperationalDate,
        Self::VendorPurchased,
        Self::VendorName,
        Self::AuthorizationToOperate,
        Self::SystemName,
        Self::TrainingData,
        Self::TrainingDataCatalog,
        Self::Pii,
        Self::PrivacyImpactAssessment,
        Self::DemographicVariables,
        Self::CustomCode,
        Self::CodeLink,
        Self::PreDeploymentTesting,
        Self::ImpactAssessment,
        Self::ImpactAssessmentDetails,
        Self::IndependentReview,
        Self::OngoingMonitoring,
        Self::OperatorTraining,
        Self::FailSafe,
        Self::AppealProcess,
        Self::PublicFeedback,
    ];

    /// Fields whose absence downgrades a file to partial.
    pub const REQUIRED: [CanonicalField; 3] = [
        Self::UseCaseId,
        Self::UseCaseName,
        Self::StageOfDevelopmentRaw,
    ];

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Derived fields are filled by the pipeline, never mapped from a column.
    pub fn is_derived(self) -> bool {
        matches!(self, Self::Agency | Self::StageOfDevelopmentNormalized)
    }

    /// snake_case key, as used in the manifest.
    pub fn key(self) -> &'static str {
        match self {
            Self::Agency => "agency",
            Self::UseCaseId => "use_case_id",
            Self::UseCaseName => "use_case_name",
            Self::BureauComponent => "bureau_component",
            Self::StageOfDevelopmentRaw => "stage_of_development_raw",
            Self::StageOfDevelopmentNormalized => "stage_of_development_normalized",
            Self::HighImpact => "high_impact",
            Self::Justification => "justification",
            Self::TopicArea => "topic_area",
            Self::AiClassification => "ai_classification",
            Self::ProblemSolved => "problem_solved",
            Self::ExpectedBenefits => "expected_benefits",
            Self::SystemOutputs => "system_outputs",
            Self::OperationalDate => "operational_date",
            Self::VendorPurchased => "vendor_purchased",
            Self::VendorName => "vendor_name",
            Self::AuthorizationToOperate => "authorization_to_operate",
            Self::SystemName => "system_name",
            Self::TrainingData => "training_data",
            Self::TrainingDataCatalog => "training_data_catalog",
            Self::Pii => "pii",
            Self::PrivacyImpactAssessment => "privacy_impact_assessment",
            Self::DemographicVariables => "demographic_variables",
            Self::CustomCode => "custom_code",
            Self::CodeLink => "code_link",
            Self::PreDeploymentTesting => "pre_deployment_testing",
            Self::ImpactAssessment => "impact_assessment",
            Self::ImpactAssessmentDetails => "impact_assessment_details",
            Self::IndependentReview => "independent_review",
            Self::OngoingMonitoring => "ongoing_monitoring",
            Self::OperatorTraining => "operator_training",
            Self::FailSafe => "fail_safe",
            Self::AppealProcess => "appeal_process",
            Self::PublicFeedback => "public_feedback",
        }
    }

    /// Column title in the consolidated artifact.
    pub fn title(self) -> &'static str {
        match self {
            Self::Agency => "Agency",
            Self::UseCaseId => "Use Case ID",
            Self::UseCaseName => "Use Case Name",
            Self::BureauComponent => "Bureau/Component",
            Self::StageOfDevelopmentRaw => "Stage of Development (Raw)",
            Self::StageOfDevelopmentNormalized => "Stage of Development",
            Self::HighImpact => "Is the AI use case high-impact?",
            Self::Justification => "Justification",
            Self::TopicArea => "Use Case Topic Area",
            Self::AiClassification => "AI Classification",
            Self::ProblemSolved => "What problem is the AI intended to solve?",
            Self::ExpectedBenefits => "What are the expected benefits and positive outcomes from the AI for an agency's mission and/or the general public?",
            Self::SystemOutputs => "Describe the AI system's outputs.",
            Self::OperationalDate => "Date when AI use case became operational or the pilot's start date",
            Self::VendorPurchased => "Was the system involved in this use case purchased from a vendor or developed under contract(s) or in-house?",
            Self::VendorName => "Vendor(s) Name",
            Self::AuthorizationToOperate => "Does this AI use case have an associated Authorization to Operate (ATO)?",
            Self::SystemName => "System(s) Name",
            Self::TrainingData => "Describe any data used to train, fine-tune, and/or evaluate performance of the model(s) used in this use case.",
            Self::TrainingDataCatalog => "If the data is required to be publicly disclosed as an open government data asset, provide a link to the entry on the Federal Data Catalog.",
            Self::Pii => "Does this AI use case involve personally identifiable information (PII) that is maintained by the agency?",
            Self::PrivacyImpactAssessment => "If publicly available, provide the link to the AI use case's associated Privacy Impact Assessment (PIA).",
            Self::DemographicVariables => "Which, if any, demographic variables does the AI use case explicitly use as model features?",
            Self::CustomCode => "Does this project include custom-developed code?",
            Self::CodeLink => "If the code is open source, provide the link for the publicly available source code.",
            Self::PreDeploymentTesting => "Has pre-deployment testing been conducted for this AI use case?",
            Self::ImpactAssessment => "Has an AI impact assessment been completed for this AI use case?",
            Self::ImpactAssessmentDetails => "What are the potential impacts of using the AI for this particular use case and how were they identified?",
            Self::IndependentReview => "Has an independent review of the AI use case been conducted?",
            Self::OngoingMonitoring => "Is there a process to conduct ongoing monitoring to identify any adverse impacts to the performance and security of the AI functionality, as well as to privacy, civil rights, and civil liberties?",
            Self::OperatorTraining => "Has the agency established sufficient and periodic training for operators of the AI to interpret and act on the its output and managed associated risks?",
            Self::FailSafe => "Does this AI use case have an appropriate fail-safe that minimizes the risk of significant harm?",
            Self::AppealProcess => "Is there an established appeal process in the event that an impacted individual would like to appeal or contest the AI system's outcome?",
            Self::PublicFeedback => "What steps has the agency taken to consult and incorporate feedback from end users of this AI use case and the public?",
        }
    }

    /// Artifact header row, in declaration order.
    pub fn header_row() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.title()).collect()
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// HEADER TEXT NORMALIZATION
// =============================================================================

/// Lowercase, turn punctuation into spaces and collapse whitespace.
///
/// `"Bureau/Component"` and `" bureau  component "` both become
/// `"bureau component"`.
pub fn normalize_header(text: &str) -> String {
    let spaced: String = text
        .chars()
        .flat_map(|c| {
            let keep = if c.is_alphanumeric() { c } else { ' ' };
            keep.to_lowercase()
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// ALIAS TABLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Normalized header equals the alias.
    Exact,
    /// Normalized header contains the alias as a whole-word sequence.
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Stored already normalized.
    pub text: String,
    pub mode: MatchMode,
}

impl Alias {
    pub fn new(text: &str, mode: MatchMode) -> Self {
        Self {
            text: normalize_header(text),
            mode,
        }
    }

    pub fn matches(&self, normalized_header: &str) -> bool {
        if self.text.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::Exact => normalized_header == self.text,
            MatchMode::Contains => {
                format!(" {} ", normalized_header).contains(&format!(" {} ", self.text))
            }
        }
    }
}

/// Hint about what a column's values look like, used when header text fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Short agency-prefixed token with a number, e.g. `USDA-001`.
    Identifier,
    /// Short stage label that resolves to a known development stage.
    StageKeyword,
}

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9&]{1,14}[-_][A-Za-z0-9]+(?:[-_.][A-Za-z0-9]+)*$")
        .expect("identifier pattern is valid")
});

/// True for identifier-like tokens such as `USDA-001` or `DOJ-2024-0012`.
pub fn looks_like_identifier(value: &str) -> bool {
    let value = value.trim();
    IDENTIFIER_RE.is_match(value) && value.chars().any(|c| c.is_ascii_digit())
}

impl ValueShape {
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        match self {
            Self::Identifier => looks_like_identifier(value),
            Self::StageKeyword => looks_like_stage(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub field: CanonicalField,
    pub aliases: Vec<Alias>,
    pub shape: Option<ValueShape>,
}

/// (field, exact aliases, contains aliases, value shape)
type AliasRow = (CanonicalField, &'static [&'static str], &'static [&'static str], Option<ValueShape>);

const STANDARD_ALIASES: &[AliasRow] = &[
    (
        CanonicalField::UseCaseId,
        &["id", "use case id", "usecase id", "use case number", "uid"],
        &["use case id", "use case identifier", "use case unique id"],
        Some(ValueShape::Identifier),
    ),
    (
        CanonicalField::UseCaseName,
        &["name", "use case name", "use case title", "title", "use case"],
        &["use case name", "use case title"],
        None,
    ),
    (
        CanonicalField::BureauComponent,
        &["bureau", "component", "department", "office", "bureau component", "operating division", "sub agency"],
        &["bureau component", "bureau", "sub agency", "operating division"],
        None,
    ),
    (
        CanonicalField::StageOfDevelopmentRaw,
        &["stage", "status", "stage of development", "development stage", "lifecycle stage"],
        &["stage of development", "stage of system development", "deployment phase", "development stage", "life cycle stage", "stage"],
        Some(ValueShape::StageKeyword),
    ),
    (CanonicalField::HighImpact, &["high impact"], &["high impact", "rights impacting", "safety impacting"], None),
    (CanonicalField::Justification, &["justification"], &["justification"], None),
    (CanonicalField::TopicArea, &["topic area", "topic"], &["topic area"], None),
    (
        CanonicalField::AiClassification,
        &["classification", "ai classification"],
        &["ai classification", "type of ai", "ai technique"],
        None,
    ),
    (
        CanonicalField::ProblemSolved,
        &["problem", "purpose"],
        &["what problem", "problem is the ai intended to solve", "problem to be solved"],
        None,
    ),
    (
        CanonicalField::ExpectedBenefits,
        &["benefits", "outcomes", "expected benefits"],
        &["expected benefits", "benefits and positive outcomes"],
        None,
    ),
    (
        CanonicalField::SystemOutputs,
        &["output", "outputs", "ai system outputs"],
        &["ai system s outputs", "system outputs", "describe the ai system"],
        None,
    ),
    (
        CanonicalField::OperationalDate,
        &["date", "operational date", "start date"],
        &["became operational", "operational or pilot start date", "pilot s start date", "date initiated"],
        None,
    ),
    (
        CanonicalField::VendorPurchased,
        &["purchased", "vendor or in house"],
        &["purchased from a vendor", "developed under contract", "vendor or developed", "was the system involved"],
        None,
    ),
    (
        CanonicalField::VendorName,
        &["vendor", "vendors", "vendor name", "vendor s name", "vendors name"],
        &["vendor s name", "vendors name", "vendor name"],
        None,
    ),
    (
        CanonicalField::AuthorizationToOperate,
        &["ato", "authorization to operate"],
        &["authorization to operate", "associated ato"],
        None,
    ),
    (
        CanonicalField::SystemName,
        &["system", "system name", "system s name", "systems name"],
        &["system s name", "systems name", "system name"],
        None,
    ),
    (
        CanonicalField::TrainingData,
        &["training data"],
        &["data used to train", "describe any data used", "training data"],
        None,
    ),
    (
        CanonicalField::TrainingDataCatalog,
        &["data catalog", "federal data catalog"],
        &["federal data catalog", "data catalog"],
        None,
    ),
    (CanonicalField::Pii, &["pii"], &["personally identifiable", "pii that is maintained"], None),
    (
        CanonicalField::PrivacyImpactAssessment,
        &["pia", "privacy impact assessment"],
        &["privacy impact assessment"],
        None,
    ),
    (
        CanonicalField::DemographicVariables,
        &["demographic variables", "demographics"],
        &["demographic"],
        None,
    ),
    (
        CanonicalField::CustomCode,
        &["custom code"],
        &["custom developed code", "custom code", "custom developed"],
        None,
    ),
    (
        CanonicalField::CodeLink,
        &["code link", "source code", "open source"],
        &["publicly available source code", "open source", "source code"],
        None,
    ),
    (
        CanonicalField::PreDeploymentTesting,
        &["pre deployment testing"],
        &["pre deployment testing", "pre deployment"],
        None,
    ),
    (
        CanonicalField::ImpactAssessment,
        &["impact assessment", "ai impact assessment"],
        &["ai impact assessment", "impact assessment"],
        None,
    ),
    (
        CanonicalField::ImpactAssessmentDetails,
        &["potential impacts"],
        &["potential impacts", "impacts of using the ai"],
        None,
    ),
    (
        CanonicalField::IndependentReview,
        &["independent review"],
        &["independent review", "independent assessment", "independent evaluation"],
        None,
    ),
    (
        CanonicalField::OngoingMonitoring,
        &["ongoing monitoring"],
        &["ongoing monitoring", "monitoring for performance", "adverse impacts"],
        None,
    ),
    (
        CanonicalField::OperatorTraining,
        &["operator training"],
        &["operator training", "periodic training", "training for operators", "adequate human training"],
        None,
    ),
    (
        CanonicalField::FailSafe,
        &["fail safe", "failsafe"],
        &["fail safe", "failsafe", "minimizes the risk", "minimize the risk"],
        None,
    ),
    (
        CanonicalField::AppealProcess,
        &["appeal process"],
        &["appeal process", "appeal or contest"],
        None,
    ),
    (
        CanonicalField::PublicFeedback,
        &["public feedback"],
        &["incorporate feedback", "feedback from end users", "consult and incorporate", "public feedback"],
        None,
    ),
];

static STANDARD: Lazy<AliasTable> = Lazy::new(AliasTable::build_standard);

/// Alias sets for every mappable field, in declaration order.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    /// The built-in table, shared for the whole process.
    pub fn standard() -> &'static AliasTable {
        &STANDARD
    }

    fn build_standard() -> AliasTable {
        let mut entries: Vec<AliasEntry> = STANDARD_ALIASES
            .iter()
            .map(|(field, exact, contains, shape)| AliasEntry {
                field: *field,
                aliases: exact
                    .iter()
                    .map(|a| Alias::new(a, MatchMode::Exact))
                    .chain(contains.iter().map(|a| Alias::new(a, MatchMode::Contains)))
                    .collect(),
                shape: *shape,
            })
            .collect();
        entries.sort_by_key(|e| e.field.index());
        AliasTable { entries }
    }

    /// Copy of this table with extra per-agency aliases appended. Extra
    /// aliases match in `Contains` mode. Derived fields ignore additions.
    pub fn with_additions(&self, extra: &BTreeMap<CanonicalField, Vec<String>>) -> AliasTable {
        let mut table = self.clone();
        for (field, aliases) in extra {
            if field.is_derived() {
                continue;
            }
            let added = aliases.iter().map(|a| Alias::new(a, MatchMode::Contains));
            match table.entries.iter_mut().find(|e| e.field == *field) {
                Some(entry) => entry.aliases.extend(added),
                None => {
                    table.entries.push(AliasEntry {
                        field: *field,
                        aliases: added.collect(),
                        shape: None,
                    });
                    table.entries.sort_by_key(|e| e.field.index());
                }
            }
        }
        table
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn entry(&self, field: CanonicalField) -> Option<&AliasEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// Resolve an already normalized header. Exact aliases are tried across
    /// all fields before any `Contains` alias; within a pass the earliest
    /// declared field wins.
    pub fn match_normalized(&self, normalized: &str) -> Option<CanonicalField> {
        if normalized.is_empty() {
            return None;
        }
        for mode in [MatchMode::Exact, MatchMode::Contains] {
            for entry in &self.entries {
                if entry
                    .aliases
                    .iter()
                    .any(|a| a.mode == mode && a.matches(normalized))
                {
                    return Some(entry.field);
                }
            }
        }
        None
    }

    pub fn match_header(&self, raw: &str) -> Option<CanonicalField> {
        self.match_normalized(&normalize_header(raw))
    }

    /// Header keyword test used by the header locator: an alias hit or the
    /// exact canonical column title.
    pub fn is_header_keyword(&self, raw: &str) -> bool {
        let normalized = normalize_header(raw);
        if normalized.is_empty() {
            return false;
        }
        self.match_normalized(&normalized).is_some()
            || CanonicalField::ALL
                .iter()
                .any(|f| normalize_header(f.title()) == normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // FIELD SET TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_declaration_order_matches_index() {
        for (i, field) in CanonicalField::ALL.iter().enumerate() {
            assert_eq!(field.index(), i, "{} out of order", field);
        }
    }

    #[test]
    fn test_header_row_starts_with_identity_columns() {
        let header = CanonicalField::header_row();
        assert_eq!(header.len(), CanonicalField::COUNT);
        assert_eq!(&header[..6], &[
            "Agency",
            "Use Case ID",
            "Use Case Name",
            "Bureau/Component",
            "Stage of Development (Raw)",
            "Stage of Development",
        ]);
    }

    #[test]
    fn test_keys_round_trip_through_serde() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
            let back: CanonicalField = serde_json::from_str(&json).unwrap();
            assert_eq!(back, field);
        }
    }

    #[test]
    fn test_derived_fields_have_no_aliases() {
        let table = AliasTable::standard();
        assert!(table.entry(CanonicalField::Agency).is_none());
        assert!(table.entry(CanonicalField::StageOfDevelopmentNormalized).is_none());
        for field in CanonicalField::ALL.iter().filter(|f| !f.is_derived()) {
            assert!(table.entry(*field).is_some(), "{} has no aliases", field);
        }
    }

    // -------------------------------------------------------------------------
    // NORMALIZATION TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_normalize_header_punctuation_and_case() {
        assert_eq!(normalize_header("Bureau/Component"), "bureau component");
        assert_eq!(normalize_header("  Use   Case\nID "), "use case id");
        assert_eq!(normalize_header("Vendor(s) Name"), "vendor s name");
        assert_eq!(normalize_header("High-Impact?"), "high impact");
        assert_eq!(normalize_header(""), "");
    }

    // -------------------------------------------------------------------------
    // ALIAS MATCHING TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_match_simple_headers() {
        let table = AliasTable::standard();
        assert_eq!(table.match_header("Use Case ID"), Some(CanonicalField::UseCaseId));
        assert_eq!(table.match_header("Use Case Name"), Some(CanonicalField::UseCaseName));
        assert_eq!(table.match_header("Stage"), Some(CanonicalField::StageOfDevelopmentRaw));
        assert_eq!(table.match_header("STATUS"), Some(CanonicalField::StageOfDevelopmentRaw));
        assert_eq!(table.match_header("Foo"), None);
    }

    #[test]
    fn test_match_question_style_headers() {
        let table = AliasTable::standard();
        for field in CanonicalField::ALL.iter().filter(|f| !f.is_derived()) {
            assert_eq!(
                table.match_header(field.title()),
                Some(*field),
                "title of {} resolved elsewhere",
                field
            );
        }
    }

    #[test]
    fn test_contains_requires_whole_words() {
        let alias = Alias::new("ato", MatchMode::Contains);
        assert!(alias.matches("associated ato link"));
        assert!(!alias.matches("automatic data"));
    }

    #[test]
    fn test_exact_pass_beats_earlier_contains() {
        // "vendor name" is an exact VendorName alias; no earlier field claims it.
        let table = AliasTable::standard();
        assert_eq!(table.match_header("Vendor Name"), Some(CanonicalField::VendorName));
        assert_eq!(
            table.match_header("Was the system purchased from a vendor?"),
            Some(CanonicalField::VendorPurchased)
        );
    }

    #[test]
    fn test_with_additions_extends_field() {
        let mut extra = BTreeMap::new();
        extra.insert(CanonicalField::UseCaseName, vec!["AI Project".to_string()]);
        extra.insert(CanonicalField::Agency, vec!["Org".to_string()]);
        let table = AliasTable::standard().with_additions(&extra);
        assert_eq!(table.match_header("AI Project Title"), Some(CanonicalField::UseCaseName));
        assert_eq!(table.match_header("Org"), None);
        assert_eq!(AliasTable::standard().match_header("AI Project Title"), None);
    }

    #[test]
    fn test_header_keyword_detection() {
        let table = AliasTable::standard();
        assert!(table.is_header_keyword("Stage of Development"));
        assert!(table.is_header_keyword("Stage of Development (Raw)"));
        assert!(!table.is_header_keyword("FY2025 Inventory"));
        assert!(!table.is_header_keyword("   "));
    }

    // -------------------------------------------------------------------------
    // VALUE SHAPE TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_identifier_shape() {
        assert!(looks_like_identifier("USDA-001"));
        assert!(looks_like_identifier("DOJ-2024-0012"));
        assert!(looks_like_identifier("HHS_42"));
        assert!(!looks_like_identifier("Soil Sensor AI"));
        assert!(!looks_like_identifier("Soil-Sensor"));
        assert!(!looks_like_identifier("COVID-19 Dashboard"));
    }

    #[test]
    fn test_stage_keyword_shape() {
        assert!(ValueShape::StageKeyword.accepts("Deployed"));
        assert!(ValueShape::StageKeyword.accepts("c) Stage 3 - Implementation"));
        assert!(!ValueShape::StageKeyword.accepts("Soil Sensor AI"));
        assert!(!ValueShape::StageKeyword.accepts("Supports planning of grid maintenance crews"));
        assert!(!ValueShape::StageKeyword.accepts(""));
    }
}
