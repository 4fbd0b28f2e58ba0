//! In-process fakes for the review service and the full-text source.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tm_clients::{ClientError, FullTextSource, ReviewRequest, ReviewService, ReviewTask, SectionMap};
use tm_config::ToolmineConfig;
use tm_core::publication::Publication;
use tm_core::{CacheTier, Section};

/// Reviewer answering from fixed sets of publication ids.
#[derive(Default)]
pub struct ScriptedReviewer {
    pub non_research: HashSet<String>,
    pub unlikely: HashSet<String>,
    /// Every candidate of these publications is rejected.
    pub reject: HashSet<String>,
    /// Pattern suggestions attached to every validation answer.
    pub suggestions: Vec<Value>,
    pub fail_tasks: HashSet<&'static str>,
    pub calls: Mutex<Vec<ReviewTask>>,
}

impl ScriptedReviewer {
    pub fn calls(&self, task: ReviewTask) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| **t == task).count()
    }

    fn screening(&self, body: &Value, task: ReviewTask) -> Value {
        let results: Vec<Value> = body["publications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| {
                let pmid = item["pmid"].as_str().unwrap();
                if task == ReviewTask::TitleScreening {
                    let verdict = if self.non_research.contains(pmid) { "non_research" } else { "research" };
                    json!({ "pmid": pmid, "verdict": verdict, "confidence": 0.95, "reason": "title" })
                } else {
                    let verdict = if self.unlikely.contains(pmid) { "unlikely" } else { "likely_tools" };
                    json!({
                        "pmid": pmid,
                        "verdict": verdict,
                        "confidence": 0.9,
                        "tool_types": ["computational_tool"],
                        "reason": "abstract",
                    })
                }
            })
            .collect();
        json!({ "results": results })
    }

    fn validation(&self, body: &Value) -> Value {
        let pmid = body["pmid"].as_str().unwrap();
        let rejected = self.reject.contains(pmid);
        let verdicts: Vec<Value> = body["candidates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| {
                if rejected {
                    json!({
                        "tool_name": c["tool_name"],
                        "tool_type": c["tool_type"],
                        "verdict": "reject",
                        "confidence": 0.9,
                        "reasoning": "The study develops its own questionnaire and survey; no existing tool is used.",
                        "recommended_action": "remove",
                    })
                } else {
                    json!({
                        "tool_name": c["tool_name"],
                        "tool_type": c["tool_type"],
                        "verdict": "accept",
                        "confidence": 0.9,
                        "reasoning": "Named software used for image quantification.",
                        "recommended_action": "keep",
                        "metadata": {
                            "softwareType": "image analysis",
                            "programmingLanguage": "Java",
                            "sourceRepository": "https://github.com/imagej/ImageJ",
                        },
                    })
                }
            })
            .collect();
        json!({
            "publication_type": if rejected { "questionnaire development" } else { "research article" },
            "verdicts": verdicts,
            "missed_tools": [],
            "suggested_patterns": self.suggestions,
        })
    }
}

#[async_trait]
impl ReviewService for ScriptedReviewer {
    async fn complete(&self, request: &ReviewRequest) -> Result<String, ClientError> {
        self.calls.lock().unwrap().push(request.task);
        if self.fail_tasks.contains(request.task.as_str()) {
            return Err(ClientError::Api {
                status: 500,
                message: "overloaded".into(),
            });
        }
        let body: Value = serde_json::from_str(&request.body).unwrap();
        let answer = match request.task {
            ReviewTask::TitleScreening | ReviewTask::AbstractScreening => self.screening(&body, request.task),
            ReviewTask::Validation => self.validation(&body),
            ReviewTask::ObservationExtraction => json!({ "observations": [] }),
        };
        Ok(format!("Here is my assessment:\n```json\n{answer}\n```"))
    }
}

/// Full text held in memory, by publication id.
#[derive(Default)]
pub struct MemorySource {
    pub texts: HashMap<String, SectionMap>,
}

impl MemorySource {
    pub fn with_methods(mut self, pmid: &str, methods: &str) -> Self {
        self.texts
            .insert(pmid.to_string(), SectionMap::from([(Section::Methods, methods.to_string())]));
        self
    }
}

#[async_trait]
impl FullTextSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self, pmid: &str, tier: CacheTier) -> Result<Option<SectionMap>, ClientError> {
        Ok(self.texts.get(pmid).map(|sections| {
            sections
                .iter()
                .filter(|(section, _)| tier.sections().contains(section))
                .map(|(section, text)| (*section, text.clone()))
                .collect()
        }))
    }
}

/// Source whose every fetch fails with a transient server error.
#[derive(Default)]
pub struct UnreachableSource {
    calls: AtomicUsize,
}

impl UnreachableSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FullTextSource for UnreachableSource {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn fetch(&self, _pmid: &str, _tier: CacheTier) -> Result<Option<SectionMap>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClientError::Api {
            status: 503,
            message: "service unavailable".into(),
        })
    }
}

pub fn config(data_dir: &Path) -> ToolmineConfig {
    let mut config = ToolmineConfig::default();
    config.paths.data_dir = data_dir.display().to_string();
    config.budget.use_measured_rate = false;
    config.run.parallel_workers = 3;
    config.run.screening_batch_size = 8;
    config
}

pub fn publication(pmid: &str, year: i32) -> Publication {
    let mut publication = Publication::new(pmid, format!("Cohort study {pmid}"));
    publication.year = Some(year);
    publication.abstract_text = Some(format!("Abstract of study {pmid}."));
    publication
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
