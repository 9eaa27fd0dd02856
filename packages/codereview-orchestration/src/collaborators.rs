//! Seams to the outside world
//!
//! The engine never talks to a language model or a human directly. Analysis
//! stages call a `CodeAnalyzer`, the decision stage calls a `DecisionSource`
//! and report synthesis calls a `ReportSynthesizer`. Any implementation can be
//! swapped in, including deterministic fakes in tests.

use crate::state::{Findings, ReviewState, Verdict};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Produces free-form findings for one review aspect
#[async_trait]
pub trait CodeAnalyzer: Send + Sync {
    async fn analyze(&self, code: &str, language: &str) -> anyhow::Result<String>;
}

/// Human (or policy) approval of the current findings
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn decide(&self, review: &ReviewState) -> anyhow::Result<Approval>;
}

/// Turns the four findings into the final report
#[async_trait]
pub trait ReportSynthesizer: Send + Sync {
    async fn synthesize(&self, language: &str, findings: &Findings) -> anyhow::Result<String>;
}

/// Answer of a decision source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    Approved,
    Rejected,
}

impl Approval {
    /// Every answer maps onto exactly one verdict
    pub fn verdict(self) -> Verdict {
        match self {
            Approval::Approved => Verdict::Approved,
            Approval::Rejected => Verdict::NeedsImprovement,
        }
    }

    /// Default-deny interpretation of a free-text answer: only an explicit
    /// affirmative (case-insensitive, trimmed) approves.
    pub fn from_response<S: AsRef<str>>(response: &str, affirmatives: &[S]) -> Self {
        let answer = response.trim();
        if affirmatives
            .iter()
            .any(|yes| yes.as_ref().trim().eq_ignore_ascii_case(answer))
            && !answer.is_empty()
        {
            Approval::Approved
        } else {
            Approval::Rejected
        }
    }

    /// Default-deny interpretation of a resume value
    ///
    /// Accepts `{"approved": "yes"}`, `{"approved": true}`, a bare string or a
    /// bare bool; anything else is a rejection.
    pub fn from_resume_value<S: AsRef<str>>(value: &serde_json::Value, affirmatives: &[S]) -> Self {
        use serde_json::Value;

        let answer = match value {
            Value::Object(map) => map.get("approved"),
            other => Some(other),
        };
        match answer {
            Some(Value::Bool(true)) => Approval::Approved,
            Some(Value::String(text)) => Self::from_response(text, affirmatives),
            _ => Approval::Rejected,
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approval::Approved => write!(f, "approved"),
            Approval::Rejected => write!(f, "rejected"),
        }
    }
}

/// One analyzer per review aspect
#[derive(Clone)]
pub struct AnalyzerSet {
    pub syntax: Arc<dyn CodeAnalyzer>,
    pub best_practices: Arc<dyn CodeAnalyzer>,
    pub security: Arc<dyn CodeAnalyzer>,
    pub performance: Arc<dyn CodeAnalyzer>,
}

impl AnalyzerSet {
    /// Same analyzer for every aspect
    pub fn uniform(analyzer: Arc<dyn CodeAnalyzer>) -> Self {
        Self {
            syntax: analyzer.clone(),
            best_practices: analyzer.clone(),
            security: analyzer.clone(),
            performance: analyzer,
        }
    }
}

/// Everything the review graph needs from outside
#[derive(Clone)]
pub struct Collaborators {
    pub analyzers: AnalyzerSet,
    /// Required unless the decision stage runs in interrupt mode
    pub decision: Option<Arc<dyn DecisionSource>>,
    pub synthesizer: Arc<dyn ReportSynthesizer>,
}
