//! Versioned pattern-set artifact.
//!
//! The artifact is a JSON file passed into each run. A run reads it once,
//! never mutates the loaded copy, and writes the next version only at the
//! run boundary (see the feedback loop in `tm-pipeline`).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tm_core::ToolType;
use tm_core::documents::PatternKind;

use crate::error::ExtractError;

const fn default_template_confidence() -> f64 {
    0.9
}

const fn default_alias_confidence() -> f64 {
    0.8
}

/// Regex whose matches are tool mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexTemplate {
    pub pattern: String,
    /// Canonical name template (`$1`, `${name}`); `None` keeps the matched text.
    #[serde(default)]
    pub canonical: Option<String>,
    #[serde(default = "default_template_confidence")]
    pub confidence: f64,
}

/// Descriptive phrasing rewritten into canonical nomenclature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRule {
    pub pattern: String,
    /// Capture template, e.g. `${gene}+/-`.
    pub canonical: String,
    #[serde(default = "default_alias_confidence")]
    pub confidence: f64,
}

/// Everything the extractor knows about one tool type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypePatterns {
    /// Preferred names.
    #[serde(default)]
    pub known_names: Vec<String>,
    /// Synonym -> preferred name.
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    #[serde(default)]
    pub regex_patterns: Vec<RegexTemplate>,
    #[serde(default)]
    pub aliases: Vec<AliasRule>,
    /// Widely used tools that are never "developed" by a citing paper.
    #[serde(default)]
    pub established: Vec<String>,
}

impl TypePatterns {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known_names.is_empty()
            && self.synonyms.is_empty()
            && self.regex_patterns.is_empty()
            && self.aliases.is_empty()
    }

    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.known_names.len() + self.synonyms.len() + self.regex_patterns.len() + self.aliases.len()
    }

    fn has_literal(&self, name: &str) -> bool {
        self.known_names.iter().any(|n| n.eq_ignore_ascii_case(name))
            || self.synonyms.keys().any(|s| s.eq_ignore_ascii_case(name))
    }

    fn has_regex(&self, pattern: &str) -> bool {
        self.regex_patterns.iter().any(|t| t.pattern == pattern)
    }
}

/// Where a learned pattern came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternProvenance {
    pub tool_type: ToolType,
    pub pattern: String,
    pub kind: PatternKind,
    pub pmid: String,
    pub rationale: String,
    pub confidence: f64,
    /// Artifact version the pattern first appeared in.
    pub version: u32,
    pub added_at: DateTime<Utc>,
}

/// Result of offering a pattern to the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Duplicate,
}

/// The full pattern set, organized by tool type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    pub version: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub types: BTreeMap<ToolType, TypePatterns>,
    #[serde(default)]
    pub provenance: Vec<PatternProvenance>,
}

impl PatternSet {
    /// Patterns for `tool_type`, or an empty set.
    #[must_use]
    pub fn for_type(&self, tool_type: ToolType) -> TypePatterns {
        self.types.get(&tool_type).cloned().unwrap_or_default()
    }

    /// Tool types with no usable pattern at all.
    #[must_use]
    pub fn coverage_gaps(&self) -> Vec<ToolType> {
        ToolType::ALL
            .into_iter()
            .filter(|t| self.types.get(t).is_none_or(TypePatterns::is_empty))
            .collect()
    }

    /// Fail when no tool type has a single pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyPatternSet`].
    pub fn ensure_usable(&self) -> Result<(), ExtractError> {
        if self.coverage_gaps().len() == ToolType::ALL.len() {
            return Err(ExtractError::EmptyPatternSet);
        }
        Ok(())
    }

    /// Whether `pattern` of `kind` already exists for `tool_type`.
    #[must_use]
    pub fn contains(&self, tool_type: ToolType, pattern: &str, kind: PatternKind) -> bool {
        self.types.get(&tool_type).is_some_and(|t| match kind {
            PatternKind::Literal => t.has_literal(pattern),
            PatternKind::Regex => t.has_regex(pattern),
        })
    }

    /// Add a learned pattern with provenance at version `version`.
    ///
    /// Literal patterns become known names, or synonyms when a different
    /// canonical name is given. Regex patterns must compile.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidPattern`] for a regex that does not compile.
    pub fn merge(
        &mut self,
        tool_type: ToolType,
        pattern: &str,
        kind: PatternKind,
        canonical: Option<&str>,
        provenance: PatternProvenance,
    ) -> Result<MergeOutcome, ExtractError> {
        let pattern = pattern.trim();
        if self.contains(tool_type, pattern, kind) {
            return Ok(MergeOutcome::Duplicate);
        }
        let entry = self.types.entry(tool_type).or_default();
        match kind {
            PatternKind::Literal => match canonical.map(str::trim).filter(|c| !c.is_empty()) {
                Some(preferred) if !preferred.eq_ignore_ascii_case(pattern) => {
                    entry
                        .synonyms
                        .insert(pattern.to_string(), preferred.to_string());
                }
                _ => entry.known_names.push(pattern.to_string()),
            },
            PatternKind::Regex => {
                regex::Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
                    tool_type,
                    pattern: pattern.to_string(),
                    source,
                })?;
                entry.regex_patterns.push(RegexTemplate {
                    pattern: pattern.to_string(),
                    canonical: canonical.map(str::to_string),
                    confidence: default_template_confidence(),
                });
            }
        }
        self.provenance.push(provenance);
        Ok(MergeOutcome::Added)
    }

    /// Read an artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the artifact at `path`, or the built-in seed set when the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error only for a file that exists but cannot be parsed.
    pub fn load_or_builtin(path: &Path) -> Result<Self, ExtractError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "no pattern artifact; using built-in seed set");
            Ok(Self::builtin())
        }
    }

    /// Write the artifact atomically.
    ///
    /// # Errors
    ///
    /// Returns an I/O or JSON error; the previous artifact is left intact.
    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.persist(path)?;
        Ok(())
    }

    /// Seed set for neurofibromatosis research-tool mining.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn builtin() -> Self {
        fn names(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| (*s).to_string()).collect()
        }
        fn synonyms(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
            pairs
                .iter()
                .map(|(s, p)| ((*s).to_string(), (*p).to_string()))
                .collect()
        }
        fn rrid(prefix: &str) -> RegexTemplate {
            RegexTemplate {
                pattern: format!(r"RRID:\s?({prefix}_[A-Za-z0-9_-]+)"),
                canonical: Some("RRID:$1".to_string()),
                confidence: 0.9,
            }
        }

        let mut types = BTreeMap::new();
        types.insert(
            ToolType::Antibody,
            TypePatterns {
                known_names: names(&[
                    "anti-neurofibromin",
                    "anti-GFAP",
                    "anti-S100B",
                    "anti-Ki67",
                    "anti-SOX10",
                    "anti-phospho-ERK",
                ]),
                synonyms: synonyms(&[
                    ("neurofibromin antibody", "anti-neurofibromin"),
                    ("Ki-67 antibody", "anti-Ki67"),
                    ("S100 antibody", "anti-S100B"),
                ]),
                regex_patterns: vec![rrid("AB")],
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::CellLine,
            TypePatterns {
                known_names: names(&[
                    "ST88-14",
                    "sNF96.2",
                    "sNF02.2",
                    "ipNF95.11b",
                    "ipNF05.5",
                    "S462",
                    "NF90-8",
                    "T265",
                    "HEK293T",
                ]),
                synonyms: synonyms(&[("HEK 293T", "HEK293T"), ("HEK-293T", "HEK293T")]),
                regex_patterns: vec![rrid("CVCL")],
                established: names(&["HEK293T"]),
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::AnimalModel,
            TypePatterns {
                known_names: names(&["Nf1+/-", "Nf1-/-", "Nf1flox/flox", "Nf2flox/flox", "Dhh-Cre"]),
                synonyms: synonyms(&[("Nf1 fl/fl", "Nf1flox/flox"), ("Nf2 fl/fl", "Nf2flox/flox")]),
                regex_patterns: vec![rrid("IMSR"), rrid("MGI")],
                aliases: vec![
                    AliasRule {
                        pattern: r"(?i)\bheterozygous\s+(?P<gene>[a-z][a-z0-9]{1,9})\s+(?:knock-?out|null)\b"
                            .to_string(),
                        canonical: "${gene}+/-".to_string(),
                        confidence: 0.8,
                    },
                    AliasRule {
                        pattern: r"(?i)\bhomozygous\s+(?P<gene>[a-z][a-z0-9]{1,9})\s+(?:knock-?out|null)\b"
                            .to_string(),
                        canonical: "${gene}-/-".to_string(),
                        confidence: 0.8,
                    },
                ],
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::GeneticReagent,
            TypePatterns {
                known_names: names(&["pLKO.1", "lentiCRISPRv2", "pCMV-NF1", "pLenti-GFP"]),
                regex_patterns: vec![RegexTemplate {
                    pattern: r"Addgene\s+(?:plasmid\s+)?#\s?(\d{3,7})".to_string(),
                    canonical: Some("Addgene #$1".to_string()),
                    confidence: 0.9,
                }],
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::Biobank,
            TypePatterns {
                known_names: names(&[
                    "UK Biobank",
                    "Children's Tumor Foundation Biobank",
                    "Cooperative Human Tissue Network",
                ]),
                synonyms: synonyms(&[
                    ("CTF Biobank", "Children's Tumor Foundation Biobank"),
                    ("CHTN", "Cooperative Human Tissue Network"),
                ]),
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::ComputationalTool,
            TypePatterns {
                known_names: names(&[
                    "ImageJ",
                    "Fiji",
                    "CellProfiler",
                    "GraphPad Prism",
                    "SPSS",
                    "Seurat",
                    "DESeq2",
                    "FlowJo",
                    "MATLAB",
                    "Cytoscape",
                    "QuPath",
                ]),
                synonyms: synonyms(&[("Image J", "ImageJ"), ("Prism", "GraphPad Prism")]),
                regex_patterns: vec![rrid("SCR")],
                established: names(&[
                    "ImageJ",
                    "Fiji",
                    "CellProfiler",
                    "GraphPad Prism",
                    "SPSS",
                    "Seurat",
                    "DESeq2",
                    "FlowJo",
                    "MATLAB",
                    "Cytoscape",
                    "QuPath",
                ]),
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::AdvancedCellularModel,
            TypePatterns {
                known_names: names(&["cerebral organoids", "neurofibroma organoids", "Schwann cell spheroids"]),
                synonyms: synonyms(&[("brain organoids", "cerebral organoids")]),
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::PatientDerivedModel,
            TypePatterns {
                known_names: names(&["MPNST PDX", "JH-2-002", "JH-2-079"]),
                ..TypePatterns::default()
            },
        );
        types.insert(
            ToolType::ClinicalAssessmentTool,
            TypePatterns {
                known_names: names(&[
                    "PedsQL",
                    "SF-36",
                    "PROMIS",
                    "Brief Pain Inventory",
                    "Numerical Rating Scale",
                    "Skindex-29",
                    "CBCL",
                    "Riccardi scale",
                ]),
                synonyms: synonyms(&[
                    ("Pediatric Quality of Life Inventory", "PedsQL"),
                    ("Short Form-36", "SF-36"),
                    ("Child Behavior Checklist", "CBCL"),
                ]),
                established: names(&["PedsQL", "SF-36", "PROMIS", "Brief Pain Inventory", "CBCL"]),
                ..TypePatterns::default()
            },
        );

        Self {
            version: 1,
            updated_at: None,
            types,
            provenance: Vec::new(),
        }
    }
}
