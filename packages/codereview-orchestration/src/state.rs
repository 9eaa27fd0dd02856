//! Review and analysis state containers
//!
//! `ReviewState` is owned by the outer review graph; `AnalysisState` is the
//! scoped projection the analysis sub-pipeline works on. Both merge partial
//! updates field by field: a present field overwrites, an absent field is
//! left alone, nothing is ever cleared.

use crate::graph::GraphState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human verdict on the current findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    NeedsImprovement,
}

impl Verdict {
    /// Router label for this verdict
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::NeedsImprovement => "needs_improvement",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One of the four review concerns, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Syntax,
    BestPractices,
    Security,
    Performance,
}

impl Aspect {
    pub const ALL: [Aspect; 4] = [
        Aspect::Syntax,
        Aspect::BestPractices,
        Aspect::Security,
        Aspect::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Syntax => "syntax",
            Aspect::BestPractices => "best_practices",
            Aspect::Security => "security",
            Aspect::Performance => "performance",
        }
    }

    /// State field this aspect owns
    pub fn field(&self) -> &'static str {
        match self {
            Aspect::Syntax => "syntax_issues",
            Aspect::BestPractices => "best_practice_issues",
            Aspect::Security => "security_issues",
            Aspect::Performance => "performance_issues",
        }
    }

    /// Update that sets only this aspect's field
    pub fn update(&self, text: String) -> AnalysisUpdate {
        let mut update = AnalysisUpdate::default();
        match self {
            Aspect::Syntax => update.syntax_issues = Some(text),
            Aspect::BestPractices => update.best_practice_issues = Some(text),
            Aspect::Security => update.security_issues = Some(text),
            Aspect::Performance => update.performance_issues = Some(text),
        }
        update
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four analysis results of one sub-pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub syntax: Option<String>,
    pub best_practices: Option<String>,
    pub security: Option<String>,
    pub performance: Option<String>,
}

impl Findings {
    pub fn get(&self, aspect: Aspect) -> Option<&str> {
        match aspect {
            Aspect::Syntax => self.syntax.as_deref(),
            Aspect::BestPractices => self.best_practices.as_deref(),
            Aspect::Security => self.security.as_deref(),
            Aspect::Performance => self.performance.as_deref(),
        }
    }

    /// Name of the first finding that is absent or blank
    pub fn first_missing(&self) -> Option<&'static str> {
        Aspect::ALL
            .iter()
            .find(|aspect| self.get(**aspect).map_or(true, |v| v.trim().is_empty()))
            .map(|aspect| aspect.field())
    }

    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }
}

/// Outer review state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub code: String,
    pub language: String,
    pub syntax_issues: Option<String>,
    pub best_practice_issues: Option<String>,
    pub security_issues: Option<String>,
    pub performance_issues: Option<String>,
    pub human_feedback: Option<Verdict>,
    pub final_report: Option<String>,
    /// Completed analysis sub-pipeline runs
    pub analysis_rounds: u32,
}

impl ReviewState {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            ..Default::default()
        }
    }

    pub fn findings(&self) -> Findings {
        Findings {
            syntax: self.syntax_issues.clone(),
            best_practices: self.best_practice_issues.clone(),
            security: self.security_issues.clone(),
            performance: self.performance_issues.clone(),
        }
    }
}

/// Partial update of `ReviewState`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub syntax_issues: Option<String>,
    pub best_practice_issues: Option<String>,
    pub security_issues: Option<String>,
    pub performance_issues: Option<String>,
    pub human_feedback: Option<Verdict>,
    pub final_report: Option<String>,
    pub analysis_rounds: Option<u32>,
}

impl ReviewUpdate {
    /// Update that overwrites all four findings
    pub fn from_findings(findings: Findings) -> Self {
        Self {
            syntax_issues: findings.syntax,
            best_practice_issues: findings.best_practices,
            security_issues: findings.security,
            performance_issues: findings.performance,
            ..Default::default()
        }
    }
}

impl GraphState for ReviewState {
    type Update = ReviewUpdate;

    fn apply(&mut self, update: ReviewUpdate) {
        overwrite(&mut self.syntax_issues, update.syntax_issues);
        overwrite(&mut self.best_practice_issues, update.best_practice_issues);
        overwrite(&mut self.security_issues, update.security_issues);
        overwrite(&mut self.performance_issues, update.performance_issues);
        if update.human_feedback.is_some() {
            self.human_feedback = update.human_feedback;
        }
        overwrite(&mut self.final_report, update.final_report);
        if let Some(rounds) = update.analysis_rounds {
            self.analysis_rounds = rounds;
        }
    }
}

/// Inner analysis state, rebuilt from `ReviewState` on every sub-pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisState {
    pub code: String,
    pub language: String,
    pub syntax_issues: Option<String>,
    pub best_practice_issues: Option<String>,
    pub security_issues: Option<String>,
    pub performance_issues: Option<String>,
}

impl AnalysisState {
    /// Fresh projection: code and language copied, findings empty
    pub fn project(review: &ReviewState) -> Self {
        Self {
            code: review.code.clone(),
            language: review.language.clone(),
            ..Default::default()
        }
    }

    pub fn into_findings(self) -> Findings {
        Findings {
            syntax: self.syntax_issues,
            best_practices: self.best_practice_issues,
            security: self.security_issues,
            performance: self.performance_issues,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisUpdate {
    pub syntax_issues: Option<String>,
    pub best_practice_issues: Option<String>,
    pub security_issues: Option<String>,
    pub performance_issues: Option<String>,
}

impl GraphState for AnalysisState {
    type Update = AnalysisUpdate;

    fn apply(&mut self, update: AnalysisUpdate) {
        overwrite(&mut self.syntax_issues, update.syntax_issues);
        overwrite(&mut self.best_practice_issues, update.best_practice_issues);
        overwrite(&mut self.security_issues, update.security_issues);
        overwrite(&mut self.performance_issues, update.performance_issues);
    }
}

fn overwrite(field: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *field = value;
    }
}
