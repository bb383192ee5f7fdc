//! Evaluation runner - the generation-to-metric loop.

use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use super::config::EvalConfig;
use super::output::RunWriter;
use super::result::{AttemptRecord, TaskSummary, VerificationReport};
use super::verifier::BehaviorVerifier;
use crate::catalog::{Task, VerificationPlan};
use crate::checker::{CompileChecker, ProcessChecker};
use crate::error::OutputError;
use crate::llm::{complete, GenerationRequest, LlmProvider};
use crate::metrics::{aggregate, RunMetrics};
use crate::prompts::GenerationPrompt;
use crate::session::LiveSession;
use crate::utils::{truncate, CodeExtractor};

/// Longest compile transcript kept in an attempt record.
const MAX_TRANSCRIPT_CHARS: usize = 4000;

/// Errors that stop a run. Per-attempt failures never surface here.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tasks: Vec<TaskSummary>,
    pub attempts: Vec<AttemptRecord>,
    pub metrics: RunMetrics,
}

/// Draws k generations per task and scores each one.
pub struct EvalRunner {
    provider: Box<dyn LlmProvider>,
    compile_checker: CompileChecker,
    verifier: BehaviorVerifier,
    extractor: CodeExtractor,
    model: String,
    default_k: u32,
    temperature: f64,
    generate_only: bool,
}

impl EvalRunner {
    pub fn new(
        provider: Box<dyn LlmProvider>,
        compile_checker: CompileChecker,
        verifier: BehaviorVerifier,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            compile_checker,
            verifier,
            extractor: CodeExtractor::default(),
            model: model.into(),
            default_k: super::config::DEFAULT_K,
            temperature: 0.2,
            generate_only: false,
        }
    }

    /// Wires the process-backed checkers described by `config`.
    pub fn from_config(
        config: &EvalConfig,
        provider: Box<dyn LlmProvider>,
    ) -> Result<Self, RunnerError> {
        let extractor = CodeExtractor::new(&config.language).map_err(|e| {
            RunnerError::Setup(format!("Invalid language tag '{}': {}", config.language, e))
        })?;

        let cryptol = ProcessChecker::cryptol(&config.cryptol_program, config.compile_timeout())
            .with_success_marker(&config.success_marker);
        let compile_checker = CompileChecker::new(Box::new(cryptol), &config.scratch_dir)
            .with_keep_scratch(config.keep_scratch);

        let saw = ProcessChecker::saw(&config.saw_program, config.harness_timeout());
        let verifier = BehaviorVerifier::new(Box::new(saw), &config.scratch_dir)
            .with_keep_scratch(config.keep_scratch)
            .with_session_source_dir(config.session_source_dir.clone());

        Ok(Self::new(provider, compile_checker, verifier, &config.model)
            .with_extractor(extractor)
            .with_default_k(config.default_k)
            .with_temperature(config.temperature)
            .with_generate_only(config.generate_only))
    }

    pub fn with_extractor(mut self, extractor: CodeExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_default_k(mut self, k: u32) -> Self {
        self.default_k = k;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Records generations without compiling or verifying them. The session
    /// is never touched in this mode.
    pub fn with_generate_only(mut self, generate_only: bool) -> Self {
        self.generate_only = generate_only;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs every task in order and aggregates the results.
    ///
    /// Tasks run one after another and each attempt's external calls are
    /// awaited before the next starts. The session is lent to one attempt at
    /// a time and comes back reset.
    pub async fn run(
        &self,
        tasks: &[Task],
        session: &mut dyn LiveSession,
        writer: &mut RunWriter,
    ) -> Result<RunReport, RunnerError> {
        let start = Instant::now();
        info!(
            "Starting evaluation of {} tasks with model {}",
            tasks.len(),
            self.model
        );

        let mut summaries = Vec::with_capacity(tasks.len());
        let mut attempts = Vec::new();

        for task in tasks {
            let (summary, records) = self.run_task(task, session, writer).await?;
            summaries.push(summary);
            attempts.extend(records);
        }

        let metrics = aggregate(&attempts, tasks.len());
        info!(
            "Evaluation finished in {:?}: {} attempts, pass@k compile {:.3}, verify {:.3}",
            start.elapsed(),
            metrics.total_attempts,
            metrics.pass_at_k_compile,
            metrics.pass_at_k_verify
        );

        Ok(RunReport {
            tasks: summaries,
            attempts,
            metrics,
        })
    }

    /// Runs all attempts of one task, streaming records and transcript to `writer`.
    pub async fn run_task(
        &self,
        task: &Task,
        session: &mut dyn LiveSession,
        writer: &mut RunWriter,
    ) -> Result<(TaskSummary, Vec<AttemptRecord>), RunnerError> {
        let k = task.attempts(self.default_k);
        let plan = task.verification_plan();
        let prompt = GenerationPrompt::for_task(task);
        let rendered = prompt.render();

        info!(task_id = %task.task_id, k, "Running task");
        writer.write_transcript(&[
            format!("=== Task {} ===", task.task_id),
            "[PROMPT BEGIN]".to_string(),
            rendered.clone(),
            "[PROMPT END]".to_string(),
        ])?;

        // `k` comes straight from the catalog, so the vector grows as attempts finish.
        let mut records = Vec::new();
        for attempt_index in 0..k {
            let record = self
                .run_attempt(task, attempt_index, &prompt, &rendered, &plan, session)
                .await;

            info!(
                task_id = %task.task_id,
                attempt = attempt_index,
                compiled = record.compiled,
                verified = record.verified,
                "Attempt finished"
            );

            writer.write_attempt(&record)?;
            writer.write_transcript(&attempt_transcript(&record))?;
            records.push(record);
        }

        let summary = TaskSummary {
            task_id: task.task_id.clone(),
            attempts: k,
            compiled_any: records.iter().any(|r| r.compiled),
            verified_any: records.iter().any(|r| r.verified),
        };

        if !self.generate_only {
            let passed = if plan.is_none() {
                summary.compiled_any
            } else {
                summary.verified_any
            };
            writer.write_transcript(&[format!(
                "[RESULT] Task {}: {}",
                task.task_id,
                if passed { "ALL PASS" } else { "HAS FAILURES" }
            )])?;
        }

        Ok((summary, records))
    }

    async fn run_attempt(
        &self,
        task: &Task,
        attempt_index: u32,
        prompt: &GenerationPrompt,
        rendered: &str,
        plan: &VerificationPlan,
        session: &mut dyn LiveSession,
    ) -> AttemptRecord {
        let request = GenerationRequest::new(&self.model, prompt.messages())
            .with_temperature(self.temperature)
            .with_max_tokens(task.max_new_tokens);

        let generated = match complete(self.provider.as_ref(), request).await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    task_id = %task.task_id,
                    attempt = attempt_index,
                    error = %e,
                    "Generation failed"
                );
                return AttemptRecord::generation_failed(
                    &task.task_id,
                    attempt_index,
                    &self.model,
                    rendered,
                    e.to_string(),
                );
            }
        };

        let code = self.extractor.extract(&generated);
        if code.is_empty() {
            warn!(task_id = %task.task_id, attempt = attempt_index, "Extracted code is empty");
        }
        let source = task.with_setup(&code);

        let record = AttemptRecord::generated(
            &task.task_id,
            attempt_index,
            &self.model,
            rendered,
            generated,
            code,
        );
        if self.generate_only {
            return record;
        }

        let compile = self.compile_checker.check_source(&source).await;
        let mut record = record.with_compile(
            compile.succeeded,
            truncate(&compile.transcript, MAX_TRANSCRIPT_CHARS),
        );

        if let Some(report) = self.verifier.verify(plan, &source, session).await {
            record = record.with_verification(report);
        }

        record
    }
}

/// Transcript lines for one attempt.
fn attempt_transcript(record: &AttemptRecord) -> Vec<String> {
    let mut lines = vec![format!("--- Attempt {} ---", record.attempt_index)];

    if let Some(error) = &record.generation_error {
        lines.push(format!("[GENERATION ERROR] {}", error));
        return lines;
    }

    lines.push("[GENERATED BEGIN]".to_string());
    lines.push(record.generated_code.clone());
    lines.push("[GENERATED END]".to_string());
    if record.compile_transcript.is_some() {
        lines.push(format!(
            "[COMPILE] {}",
            if record.compiled { "PASS" } else { "FAIL" }
        ));
    }

    if let Some(report) = &record.verification {
        lines.extend(
            report
                .transcript_lines()
                .into_iter()
                .map(|line| format!("  {}", line)),
        );
        if let VerificationReport::Assertions { succeeded, .. } = report {
            lines.push(format!(
                "[VERIFY] {}",
                if *succeeded { "PASS" } else { "FAIL" }
            ));
        }
    }

    lines
}
