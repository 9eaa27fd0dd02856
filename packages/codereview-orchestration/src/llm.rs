//! Language model adapters
//!
//! `OllamaClient` talks to Ollama's native chat API. `LlmAnalyzer` and
//! `LlmReportSynthesizer` wrap any `TextGenerator` into the analysis and
//! report seams, so the graph never sees HTTP.

use crate::collaborators::{AnalyzerSet, CodeAnalyzer, ReportSynthesizer};
use crate::config::LlmConfig;
use crate::state::{Aspect, Findings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Prompt in, completion out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Ollama chat request (native API format, not OpenAI-compatible)
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Single-model client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    temperature: f64,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: &str,
        timeout: Duration,
        temperature: f64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            client,
        })
    }

    pub fn analysis(config: &LlmConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            &config.analysis_model,
            Duration::from_secs(config.timeout_secs),
            config.temperature,
        )
    }

    pub fn report(config: &LlmConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.base_url,
            &config.report_model,
            Duration::from_secs(config.timeout_secs),
            config.temperature,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("POST {} (model {})", self.chat_url(), self.model);
        let resp = self.client.post(self.chat_url()).json(&body).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Ollama returned status {}", resp.status());
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat.message.content.trim().to_string();
        if content.is_empty() {
            anyhow::bail!("Ollama returned empty response");
        }
        Ok(content)
    }
}

/// Analysis prompt for one aspect
pub fn analysis_prompt(aspect: Aspect, code: &str, language: &str) -> String {
    let focus = match aspect {
        Aspect::Syntax => "syntax issues. List any syntax errors or warnings; be specific.",
        Aspect::BestPractices => {
            "best practice violations. Check naming conventions, code organization and documentation."
        }
        Aspect::Security => {
            "security vulnerabilities. Look for SQL injection, XSS, hardcoded secrets and unsafe operations."
        }
        Aspect::Performance => {
            "performance issues. Check memory use, inefficient loops, unnecessary work and time or space complexity."
        }
    };
    format!(
        "Review this {language} code for {focus}\n\n```{language}\n{code}\n```\n"
    )
}

/// Report prompt over the approved findings
pub fn report_prompt(language: &str, findings: &Findings) -> String {
    let section = |aspect: Aspect| findings.get(aspect).unwrap_or("(none reported)");
    format!(
        "Generate a code review report for {language} code from these findings.\n\n\
         Syntax issues:\n{}\n\n\
         Best practices:\n{}\n\n\
         Security issues:\n{}\n\n\
         Performance issues:\n{}\n\n\
         Structure it as: executive summary, detailed findings, recommendations \
         with priority levels, and tips for improving the code.\n",
        section(Aspect::Syntax),
        section(Aspect::BestPractices),
        section(Aspect::Security),
        section(Aspect::Performance),
    )
}

/// `CodeAnalyzer` backed by a text generator
pub struct LlmAnalyzer {
    generator: Arc<dyn TextGenerator>,
    aspect: Aspect,
}

impl LlmAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, aspect: Aspect) -> Self {
        Self { generator, aspect }
    }

    /// One analyzer per aspect, all sharing `generator`
    pub fn set(generator: Arc<dyn TextGenerator>) -> AnalyzerSet {
        let make = |aspect| -> Arc<dyn CodeAnalyzer> {
            Arc::new(LlmAnalyzer::new(generator.clone(), aspect))
        };
        AnalyzerSet {
            syntax: make(Aspect::Syntax),
            best_practices: make(Aspect::BestPractices),
            security: make(Aspect::Security),
            performance: make(Aspect::Performance),
        }
    }
}

#[async_trait]
impl CodeAnalyzer for LlmAnalyzer {
    async fn analyze(&self, code: &str, language: &str) -> anyhow::Result<String> {
        self.generator
            .generate(&analysis_prompt(self.aspect, code, language))
            .await
    }
}

/// `ReportSynthesizer` backed by a text generator
pub struct LlmReportSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmReportSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl ReportSynthesizer for LlmReportSynthesizer {
    async fn synthesize(&self, language: &str, findings: &Findings) -> anyhow::Result<String> {
        self.generator
            .generate(&report_prompt(language, findings))
            .await
    }
}
