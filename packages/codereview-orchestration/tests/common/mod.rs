//! Deterministic collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use codereview_orchestration::{
    AnalyzerSet, Approval, Aspect, CodeAnalyzer, Collaborators, DecisionSource, Findings,
    ReportSynthesizer, ReviewState,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const SAMPLE_CODE: &str = r#"
def add_numbers(a, b):
    result = a + b
    return result
"#;

/// Numbers its answers so overwritten findings are distinguishable
pub struct CountingAnalyzer {
    aspect: Aspect,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
}

impl CountingAnalyzer {
    pub fn new(aspect: Aspect) -> Self {
        Self {
            aspect,
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    /// Fails the n-th call (1-based), succeeds otherwise
    pub fn failing_on(aspect: Aspect, call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(aspect)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeAnalyzer for CountingAnalyzer {
    async fn analyze(&self, _code: &str, language: &str) -> anyhow::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            anyhow::bail!("{} analyzer unavailable", self.aspect);
        }
        Ok(format!("{} finding #{} for {}", self.aspect, call, language))
    }
}

/// Plays back a fixed list of answers, then an optional fallback
pub struct ScriptedDecision {
    answers: Mutex<VecDeque<Approval>>,
    fallback: Option<Approval>,
    calls: AtomicUsize,
}

impl ScriptedDecision {
    pub fn new(answers: impl IntoIterator<Item = Approval>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(answer: Approval) -> Self {
        Self {
            fallback: Some(answer),
            ..Self::new([])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionSource for ScriptedDecision {
    async fn decide(&self, _review: &ReviewState) -> anyhow::Result<Approval> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.answers.lock().unwrap().pop_front();
        next.or(self.fallback)
            .ok_or_else(|| anyhow::anyhow!("decision script exhausted"))
    }
}

/// Holds every decision until `open` is called
pub struct GatedDecision {
    answer: Approval,
    entered: Notify,
    gate: Notify,
}

impl GatedDecision {
    pub fn new(answer: Approval) -> Self {
        Self {
            answer,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Resolves once a decision is waiting on the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DecisionSource for GatedDecision {
    async fn decide(&self, _review: &ReviewState) -> anyhow::Result<Approval> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.answer)
    }
}

/// Output depends only on its inputs
pub struct TemplateSynthesizer {
    calls: AtomicUsize,
    fail_first: AtomicBool,
}

impl TemplateSynthesizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicBool::new(false),
        }
    }

    /// First call fails, as if the process died mid-synthesis
    pub fn failing_once() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicBool::new(true),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSynthesizer for TemplateSynthesizer {
    async fn synthesize(&self, language: &str, findings: &Findings) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first.swap(false, Ordering::SeqCst) {
            anyhow::bail!("connection reset by peer");
        }
        Ok(format!(
            "# {} review\n- {}\n- {}\n- {}\n- {}",
            language,
            findings.syntax.as_deref().unwrap_or_default(),
            findings.best_practices.as_deref().unwrap_or_default(),
            findings.security.as_deref().unwrap_or_default(),
            findings.performance.as_deref().unwrap_or_default(),
        ))
    }
}

/// Collaborators plus handles to their call counters
pub struct Harness {
    pub syntax: Arc<CountingAnalyzer>,
    pub best_practices: Arc<CountingAnalyzer>,
    pub security: Arc<CountingAnalyzer>,
    pub performance: Arc<CountingAnalyzer>,
    pub decision: Arc<ScriptedDecision>,
    pub synthesizer: Arc<TemplateSynthesizer>,
}

impl Harness {
    pub fn new(decision: ScriptedDecision) -> Self {
        Self::with_synthesizer(decision, TemplateSynthesizer::new())
    }

    pub fn with_synthesizer(decision: ScriptedDecision, synthesizer: TemplateSynthesizer) -> Self {
        Self {
            syntax: Arc::new(CountingAnalyzer::new(Aspect::Syntax)),
            best_practices: Arc::new(CountingAnalyzer::new(Aspect::BestPractices)),
            security: Arc::new(CountingAnalyzer::new(Aspect::Security)),
            performance: Arc::new(CountingAnalyzer::new(Aspect::Performance)),
            decision: Arc::new(decision),
            synthesizer: Arc::new(synthesizer),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            analyzers: AnalyzerSet {
                syntax: self.syntax.clone(),
                best_practices: self.best_practices.clone(),
                security: self.security.clone(),
                performance: self.performance.clone(),
            },
            decision: Some(self.decision.clone()),
            synthesizer: self.synthesizer.clone(),
        }
    }

    pub fn analysis_calls(&self) -> usize {
        self.syntax.calls()
            + self.best_practices.calls()
            + self.security.calls()
            + self.performance.calls()
    }

    pub fn per_aspect_calls(&self) -> [usize; 4] {
        [
            self.syntax.calls(),
            self.best_practices.calls(),
            self.security.calls(),
            self.performance.calls(),
        ]
    }
}
