//! Code review CLI
//!
//! # Usage
//!
//! ```bash
//! # Review a file, approving on the console
//! cargo run --bin code-review -- --file src/app.py --language python
//!
//! # Suspend at the approval step and answer the interrupt
//! cargo run --bin code-review -- --file main.go --language go --interrupt
//!
//! # Custom config (see ReviewConfig for the schema)
//! cargo run --bin code-review -- --config review.yaml --code 'print(1)'
//! ```

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use codereview_orchestration::{
    Approval, Collaborators, DecisionMode, DecisionSource, LlmAnalyzer, LlmReportSynthesizer,
    OllamaClient, ReviewConfig, ReviewDriver, ReviewOutcome, ReviewReport, ReviewRequest,
    ReviewState,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "code-review")]
#[command(about = "LLM-assisted code review with human approval", long_about = None)]
struct Cli {
    /// File to review
    #[arg(short, long, conflicts_with = "code", required_unless_present = "code")]
    file: Option<PathBuf>,

    /// Inline code to review
    #[arg(long)]
    code: Option<String>,

    /// Language of the code
    #[arg(short, long, default_value = "python")]
    language: String,

    /// Session id (a new one is generated when omitted)
    #[arg(short, long)]
    session: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suspend at the approval step instead of prompting inline
    #[arg(long)]
    interrupt: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

/// Shows the findings and reads a yes/no answer per line of input
///
/// One reader serves every question, so piped answers are consumed in order.
struct ConsoleDecision<R> {
    lines: Mutex<Lines<R>>,
    affirmatives: Vec<String>,
}

impl ConsoleDecision<BufReader<Stdin>> {
    fn stdin(affirmatives: Vec<String>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), affirmatives)
    }
}

impl<R: AsyncBufRead + Unpin> ConsoleDecision<R> {
    fn new(reader: R, affirmatives: Vec<String>) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            affirmatives,
        }
    }

    /// Next line of input; closed input is an error, never an answer
    async fn prompt(&self, question: &str) -> anyhow::Result<String> {
        use std::io::Write;

        print!("\n{question}");
        std::io::stdout().flush()?;

        match self.lines.lock().await.next_line().await? {
            Some(line) => Ok(line),
            None => anyhow::bail!("stdin closed"),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> DecisionSource for ConsoleDecision<R> {
    async fn decide(&self, review: &ReviewState) -> anyhow::Result<Approval> {
        print_findings(review);
        let answer = self
            .prompt("Do you approve these findings? (yes/no): ")
            .await?;
        Ok(Approval::from_response(&answer, &self.affirmatives))
    }
}

fn print_findings(review: &ReviewState) {
    let rule = "=".repeat(60);
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("\n{rule}");
    println!("CODE REVIEW RESULTS (round {})", review.analysis_rounds);
    println!("{rule}");
    println!("\nSyntax Issues:\n{}\n", show(&review.syntax_issues));
    println!("Best Practices:\n{}\n", show(&review.best_practice_issues));
    println!("Security Issues:\n{}\n", show(&review.security_issues));
    println!("Performance Issues:\n{}\n", show(&review.performance_issues));
    println!("{rule}");
}

fn print_report(report: &ReviewReport, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!(
        "FINAL REPORT ({} code, session {}, {} round(s))",
        report.language, report.session_id, report.rounds
    );
    println!("{rule}");
    println!("{}", report.report);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReviewConfig::from_yaml(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReviewConfig::default(),
    }
    .with_env_overrides()?;
    if cli.interrupt {
        config.decision.mode = DecisionMode::Interrupt;
    }

    let code = match (&cli.file, &cli.code) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(code)) => code.clone(),
        (None, None) => anyhow::bail!("either --file or --code is required"),
    };

    let analysis_llm = Arc::new(OllamaClient::analysis(&config.llm)?);
    let report_llm = Arc::new(OllamaClient::report(&config.llm)?);
    let console = Arc::new(ConsoleDecision::stdin(config.decision.affirmatives.clone()));
    let collaborators = Collaborators {
        analyzers: LlmAnalyzer::set(analysis_llm),
        decision: Some(console.clone()),
        synthesizer: Arc::new(LlmReportSynthesizer::new(report_llm)),
    };

    let driver = ReviewDriver::new(&collaborators, &config)?;
    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    println!("Starting code review (session {session_id})...");
    let mut outcome = driver
        .review(&session_id, ReviewRequest::new(code, cli.language.clone()))
        .await?;

    loop {
        match outcome {
            ReviewOutcome::Completed(report) => {
                print_report(&report, cli.json)?;
                return Ok(());
            }
            ReviewOutcome::AwaitingApproval {
                interrupt, state, ..
            } => {
                print_findings(&state);
                println!("{}", interrupt.instructions);
                let answer = console.prompt("approved: ").await?;
                outcome = driver
                    .resume(&session_id, json!({ "approved": answer.trim() }))
                    .await?;
            }
        }
    }
}
