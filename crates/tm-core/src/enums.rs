//! Fixed enumerations for toolmine.
//!
//! All enums serialize as `snake_case` strings, except
//! [`ObservationCategory`], which uses the curated display labels of the
//! downstream database. Every enum exposes `as_str()` and `Display` so the
//! same string appears in JSON documents, CSV columns, and file names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

/// Lowercase, trim, and fold spaces/hyphens into underscores.
fn normalize_label(value: &str) -> String {
    value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// ToolType
// ---------------------------------------------------------------------------

/// Category of research tool tracked by the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    #[serde(alias = "Antibody")]
    Antibody,
    #[serde(alias = "Cell Line", alias = "cell line")]
    CellLine,
    #[serde(alias = "Animal Model", alias = "animal model")]
    AnimalModel,
    #[serde(alias = "Genetic Reagent", alias = "genetic reagent")]
    GeneticReagent,
    #[serde(alias = "Biobank")]
    Biobank,
    #[serde(alias = "Computational Tool", alias = "computational tool")]
    ComputationalTool,
    #[serde(alias = "Advanced Cellular Model", alias = "advanced cellular model")]
    AdvancedCellularModel,
    #[serde(alias = "Patient-Derived Model", alias = "patient-derived model")]
    PatientDerivedModel,
    #[serde(alias = "Clinical Assessment Tool", alias = "clinical assessment tool")]
    ClinicalAssessmentTool,
}

impl ToolType {
    /// Every tool type, in output order.
    pub const ALL: [Self; 9] = [
        Self::Antibody,
        Self::CellLine,
        Self::AnimalModel,
        Self::GeneticReagent,
        Self::Biobank,
        Self::ComputationalTool,
        Self::AdvancedCellularModel,
        Self::PatientDerivedModel,
        Self::ClinicalAssessmentTool,
    ];

    /// Slug used in JSON documents and artifact file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Antibody => "antibody",
            Self::CellLine => "cell_line",
            Self::AnimalModel => "animal_model",
            Self::GeneticReagent => "genetic_reagent",
            Self::Biobank => "biobank",
            Self::ComputationalTool => "computational_tool",
            Self::AdvancedCellularModel => "advanced_cellular_model",
            Self::PatientDerivedModel => "patient_derived_model",
            Self::ClinicalAssessmentTool => "clinical_assessment_tool",
        }
    }

    /// Human-readable name used in CSV `toolType` columns and reports.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Antibody => "Antibody",
            Self::CellLine => "Cell Line",
            Self::AnimalModel => "Animal Model",
            Self::GeneticReagent => "Genetic Reagent",
            Self::Biobank => "Biobank",
            Self::ComputationalTool => "Computational Tool",
            Self::AdvancedCellularModel => "Advanced Cellular Model",
            Self::PatientDerivedModel => "Patient-Derived Model",
            Self::ClinicalAssessmentTool => "Clinical Assessment Tool",
        }
    }

    /// Fields whose presence makes a record useful to curators.
    ///
    /// The completeness score and the `filtered` output tier are computed
    /// from the fraction of these that are populated.
    #[must_use]
    pub const fn critical_fields(self) -> &'static [&'static str] {
        match self {
            Self::Antibody => &["targetAntigen", "hostOrganism", "clonality", "reactiveSpecies"],
            Self::CellLine => &["organ", "tissue", "cellLineCategory", "cellLineGeneticDisorder"],
            Self::AnimalModel => &[
                "species",
                "backgroundStrain",
                "alleleType",
                "animalModelGeneticDisorder",
            ],
            Self::GeneticReagent => &["insertName", "vectorType", "vectorBackbone", "promoter"],
            Self::Biobank => &["specimenType", "tissue", "diseaseType", "specimenFormat"],
            Self::ComputationalTool => &[
                "softwareVersion",
                "softwareType",
                "programmingLanguage",
                "sourceRepository",
            ],
            Self::AdvancedCellularModel => &["modelType", "derivationSource", "cellTypes", "organ"],
            Self::PatientDerivedModel => &[
                "modelSystemType",
                "tumorType",
                "hostStrain",
                "engraftmentSite",
            ],
            Self::ClinicalAssessmentTool => &[
                "assessmentType",
                "targetPopulation",
                "diseaseSpecific",
                "numberOfItems",
            ],
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownValue {
                kind: "tool type",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Named section of a publication's text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Title,
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
}

impl Section {
    /// Sections held by a `minimal` cache entry.
    pub const MINIMAL: [Self; 3] = [Self::Abstract, Self::Introduction, Self::Methods];

    /// Sections held by a `full` cache entry.
    pub const FULL: [Self; 5] = [
        Self::Abstract,
        Self::Introduction,
        Self::Methods,
        Self::Results,
        Self::Discussion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Abstract => "abstract",
            Self::Introduction => "introduction",
            Self::Methods => "methods",
            Self::Results => "results",
            Self::Discussion => "discussion",
        }
    }

    /// Provenance rank used to break ties between equally good mentions.
    ///
    /// Lower is better: a methods-section mention is the strongest evidence
    /// that a tool was actually used.
    #[must_use]
    pub const fn provenance_rank(self) -> u8 {
        match self {
            Self::Methods => 0,
            Self::Results => 1,
            Self::Abstract => 2,
            Self::Title => 3,
            Self::Introduction => 4,
            Self::Discussion => 5,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "title" => Ok(Self::Title),
            "abstract" => Ok(Self::Abstract),
            "introduction" | "intro" | "background" => Ok(Self::Introduction),
            "methods" | "materials_and_methods" | "method" => Ok(Self::Methods),
            "results" | "result" => Ok(Self::Results),
            "discussion" | "conclusions" | "conclusion" => Ok(Self::Discussion),
            _ => Err(CoreError::UnknownValue {
                kind: "section",
                value: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheTier
// ---------------------------------------------------------------------------

/// Completeness level of cached text for a publication.
///
/// ```text
/// (absent) → minimal → full
/// ```
///
/// Tiers only move forward; a `full` entry answers every `minimal` query.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    Minimal,
    Full,
}

impl CacheTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Full => "full",
        }
    }

    /// Sections a fetch at this tier asks for.
    #[must_use]
    pub const fn sections(self) -> &'static [Section] {
        match self {
            Self::Minimal => &Section::MINIMAL,
            Self::Full => &Section::FULL,
        }
    }

    /// Whether an entry at `self` makes a fetch for `required` unnecessary.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of AI validation for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    #[serde(alias = "Accept", alias = "ACCEPT", alias = "accepted")]
    Accept,
    #[serde(alias = "Reject", alias = "REJECT", alias = "rejected")]
    Reject,
    #[serde(alias = "Uncertain", alias = "UNCERTAIN")]
    Uncertain,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QueryOrigin
// ---------------------------------------------------------------------------

/// Which upstream discovery query surfaced a publication.
///
/// A publication found by both queries carries both tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    #[serde(alias = "bench")]
    BenchScience,
    Clinical,
}

impl QueryOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BenchScience => "bench_science",
            Self::Clinical => "clinical",
        }
    }
}

impl fmt::Display for QueryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MatchKind
// ---------------------------------------------------------------------------

/// How the extractor found a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Known preferred name, matched verbatim.
    Literal,
    /// Known synonym, canonicalized to the preferred name.
    Synonym,
    /// Near match against a known name or synonym.
    Fuzzy,
    /// Descriptive phrasing rewritten to canonical nomenclature.
    Alias,
    /// Regex template (RRID, catalog forms, learned patterns).
    Pattern,
}

impl MatchKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Synonym => "synonym",
            Self::Fuzzy => "fuzzy",
            Self::Alias => "alias",
            Self::Pattern => "pattern",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ObservationCategory
// ---------------------------------------------------------------------------

/// Curated category of an observation about a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ObservationCategory {
    #[serde(rename = "Body Length")]
    BodyLength,
    #[serde(rename = "Body Weight")]
    BodyWeight,
    #[serde(rename = "Coat Color")]
    CoatColor,
    #[serde(rename = "Disease Susceptibility")]
    DiseaseSusceptibility,
    #[serde(rename = "Feed Intake")]
    FeedIntake,
    #[serde(rename = "Feeding Behavior")]
    FeedingBehavior,
    #[serde(rename = "Growth Rate")]
    GrowthRate,
    #[serde(rename = "Motor Activity")]
    MotorActivity,
    #[serde(rename = "Organ Development")]
    OrganDevelopment,
    #[serde(rename = "Reproductive Behavior")]
    ReproductiveBehavior,
    #[serde(rename = "Respiratory Quotient")]
    RespiratoryQuotient,
    #[serde(rename = "Social Behavior")]
    SocialBehavior,
    #[serde(rename = "Swimming Behavior")]
    SwimmingBehavior,
    #[serde(rename = "Tumor Growth")]
    TumorGrowth,
    #[serde(rename = "Cell Growth")]
    CellGrowth,
    #[serde(rename = "Usage Instructions")]
    UsageInstructions,
    #[serde(rename = "Issue")]
    Issue,
    #[serde(rename = "Depositor Comment")]
    DepositorComment,
    #[serde(rename = "General Comment or Review")]
    GeneralComment,
    #[serde(rename = "Other")]
    Other,
}

impl ObservationCategory {
    pub const ALL: [Self; 20] = [
        Self::BodyLength,
        Self::BodyWeight,
        Self::CoatColor,
        Self::DiseaseSusceptibility,
        Self::FeedIntake,
        Self::FeedingBehavior,
        Self::GrowthRate,
        Self::MotorActivity,
        Self::OrganDevelopment,
        Self::ReproductiveBehavior,
        Self::RespiratoryQuotient,
        Self::SocialBehavior,
        Self::SwimmingBehavior,
        Self::TumorGrowth,
        Self::CellGrowth,
        Self::UsageInstructions,
        Self::Issue,
        Self::DepositorComment,
        Self::GeneralComment,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BodyLength => "Body Length",
            Self::BodyWeight => "Body Weight",
            Self::CoatColor => "Coat Color",
            Self::DiseaseSusceptibility => "Disease Susceptibility",
            Self::FeedIntake => "Feed Intake",
            Self::FeedingBehavior => "Feeding Behavior",
            Self::GrowthRate => "Growth Rate",
            Self::MotorActivity => "Motor Activity",
            Self::OrganDevelopment => "Organ Development",
            Self::ReproductiveBehavior => "Reproductive Behavior",
            Self::RespiratoryQuotient => "Respiratory Quotient",
            Self::SocialBehavior => "Social Behavior",
            Self::SwimmingBehavior => "Swimming Behavior",
            Self::TumorGrowth => "Tumor Growth",
            Self::CellGrowth => "Cell Growth",
            Self::UsageInstructions => "Usage Instructions",
            Self::Issue => "Issue",
            Self::DepositorComment => "Depositor Comment",
            Self::GeneralComment => "General Comment or Review",
            Self::Other => "Other",
        }
    }

    /// Map a reviewer-supplied label onto a category.
    ///
    /// Matching ignores case, spaces, hyphens, and underscores. Labels that
    /// match nothing fall back to [`Self::Other`]; the second element is then
    /// the original label so callers can keep it in the detail text.
    #[must_use]
    pub fn from_label(label: &str) -> (Self, Option<String>) {
        let wanted = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|c| normalize_label(c.as_str()) == wanted)
            .map_or_else(
                || (Self::Other, Some(label.trim().to_string())),
                |c| (c, None),
            )
    }
}

impl fmt::Display for ObservationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("cell_line", ToolType::CellLine)]
    #[case("Cell Line", ToolType::CellLine)]
    #[case("patient-derived model", ToolType::PatientDerivedModel)]
    #[case(" Computational Tool ", ToolType::ComputationalTool)]
    fn tool_type_parses_slugs_and_display_names(#[case] input: &str, #[case] expected: ToolType) {
        assert_eq!(input.parse::<ToolType>().unwrap(), expected);
    }

    #[test]
    fn tool_type_rejects_unknown() {
        let err = "plasmid library".parse::<ToolType>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownValue { kind: "tool type", .. }));
    }

    #[test]
    fn every_tool_type_has_four_critical_fields() {
        for tool_type in ToolType::ALL {
            assert_eq!(tool_type.critical_fields().len(), 4, "{tool_type}");
        }
    }

    #[test]
    fn tool_type_serde_accepts_display_alias() {
        let parsed: ToolType = serde_json::from_str("\"Animal Model\"").unwrap();
        assert_eq!(parsed, ToolType::AnimalModel);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"animal_model\"");
    }

    #[test]
    fn full_tier_satisfies_minimal_but_not_reverse() {
        assert!(CacheTier::Full.satisfies(CacheTier::Minimal));
        assert!(CacheTier::Full.satisfies(CacheTier::Full));
        assert!(!CacheTier::Minimal.satisfies(CacheTier::Full));
    }

    #[test]
    fn full_sections_extend_minimal_sections() {
        for section in CacheTier::Minimal.sections() {
            assert!(CacheTier::Full.sections().contains(section));
        }
    }

    #[test]
    fn verdict_accepts_capitalized_forms() {
        let parsed: Verdict = serde_json::from_str("\"Reject\"").unwrap();
        assert_eq!(parsed, Verdict::Reject);
    }

    #[rstest]
    #[case("Tumor Growth", ObservationCategory::TumorGrowth)]
    #[case("tumor_growth", ObservationCategory::TumorGrowth)]
    #[case("general comment or review", ObservationCategory::GeneralComment)]
    fn observation_category_from_known_label(
        #[case] label: &str,
        #[case] expected: ObservationCategory,
    ) {
        assert_eq!(ObservationCategory::from_label(label), (expected, None));
    }

    #[test]
    fn observation_category_unknown_label_maps_to_other() {
        let (category, original) = ObservationCategory::from_label("Whisker Length");
        assert_eq!(category, ObservationCategory::Other);
        assert_eq!(original.as_deref(), Some("Whisker Length"));
    }

    #[test]
    fn observation_categories_are_twenty() {
        assert_eq!(ObservationCategory::ALL.len(), 20);
    }

    #[rstest]
    #[case("Materials and Methods", Section::Methods)]
    #[case("results", Section::Results)]
    #[case("Background", Section::Introduction)]
    fn section_parses_common_headings(#[case] heading: &str, #[case] expected: Section) {
        assert_eq!(heading.parse::<Section>().unwrap(), expected);
    }
}
