//! `Executor`: gates, spawns, bounds, and records command executions.
//!
//! One executor serves every session of a running process. All methods take
//! `&self`; share it as `Arc<Executor>` without an outer lock. Each attempt
//! moves through:
//!
//! ```text
//! Received → FirewallCheck → Denied
//!                          → PrivilegeCheck → Gated
//!                                           → Running → TimedOut | Completed | SpawnFailed
//! ```
//!
//! Every terminal state is reported as an [`ExecutionOutcome`]; `run` never
//! returns an error and never panics on child-process failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use vera_core::config::{VeraConfig, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_CONCURRENCY};

use crate::{
    audit::AuditSink,
    error::TerminalError,
    extract::CommandExtractor,
    firewall::Firewall,
    history::RingLog,
    process,
    rules::RuleSet,
    truncate,
    types::{AttemptId, ExecutionHistoryEntry, ExecutionOutcome, ExecutionVerdict},
};

// ---------------------------------------------------------------------------
// ExecContext
// ---------------------------------------------------------------------------

/// Limits and destinations for one executor, fixed at construction.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Wall-clock limit per command.
    pub timeout: Duration,
    /// Combined output is truncated past this many characters.
    pub max_output_chars: usize,
    /// Child processes allowed to run at once; further attempts wait.
    pub max_concurrency: usize,
    /// Entries kept in the execution history and the in-memory audit trail.
    pub history_capacity: usize,
    /// Audit file; `None` keeps denials in memory only.
    pub audit_log_path: Option<PathBuf>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(vera_core::config::DEFAULT_TIMEOUT_SECS),
            max_output_chars: truncate::DEFAULT_MAX_CHARS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            audit_log_path: None,
        }
    }
}

impl ExecContext {
    pub fn from_config(config: &VeraConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.executor.effective_timeout_secs()),
            max_output_chars: config.executor.max_output_chars,
            max_concurrency: config.executor.max_concurrency,
            history_capacity: config.executor.history_capacity,
            audit_log_path: Some(PathBuf::from(&config.firewall.audit_log_path)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log_path = Some(path.into());
        self
    }

    /// Whole seconds shown in the timeout message (at least 1).
    fn timeout_label_secs(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    firewall: Firewall,
    extractor: CommandExtractor,
    context: ExecContext,
    /// One permit per concurrently running child.
    slots: Semaphore,
    history: RingLog<ExecutionHistoryEntry>,
    audit: AuditSink,
}

impl Executor {
    pub fn new(firewall: Firewall, extractor: CommandExtractor, context: ExecContext) -> Self {
        let slots = Semaphore::new(context.max_concurrency.max(1));
        let history = RingLog::new(context.history_capacity);
        let audit = AuditSink::new(context.audit_log_path.clone(), context.history_capacity);
        Self {
            firewall,
            extractor,
            context,
            slots,
            history,
            audit,
        }
    }

    /// Wire an executor from loaded configuration and rules.
    pub fn from_config(config: &VeraConfig, rules: Arc<RuleSet>) -> Self {
        Self::new(
            Firewall::new(rules),
            CommandExtractor::new(&config.extractor.triggers),
            ExecContext::from_config(config),
        )
    }

    /// Execute `command` if the firewall allows it and the caller is privileged.
    ///
    /// Firewall denials are reported as `blocked` even for unprivileged
    /// callers; the privilege gate is only consulted for allowed commands.
    /// Time spent waiting for a free slot counts against the timeout, so a
    /// call never takes much longer than `context.timeout`.
    pub async fn run(&self, command: &str, has_privilege: bool) -> ExecutionOutcome {
        self.run_attempt(AttemptId::new(), command, has_privilege)
            .await
    }

    #[instrument(skip_all, fields(attempt = %attempt))]
    async fn run_attempt(
        &self,
        attempt: AttemptId,
        command: &str,
        has_privilege: bool,
    ) -> ExecutionOutcome {
        debug!(command, has_privilege, "execution requested");

        // Firewall gate.
        if let ExecutionVerdict::Denied { reason } = self.firewall.evaluate(command) {
            warn!(command, reason = %reason, "command blocked by firewall");
            self.audit.log_denied(command, &reason);
            return ExecutionOutcome::blocked(&reason);
        }

        // Privilege gate.
        if !has_privilege {
            info!(command, "command requires admin mode");
            return ExecutionOutcome::gated();
        }

        // One deadline covers both the wait for a slot and the run itself.
        let deadline = Instant::now() + self.context.timeout;
        let _permit = match tokio::time::timeout_at(deadline, self.slots.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => {
                // The semaphore is never closed while the executor is alive.
                return ExecutionOutcome::spawn_failed("executor is shutting down");
            }
            Err(_elapsed) => {
                warn!(command, "no execution slot freed up before the deadline");
                return ExecutionOutcome::timed_out(self.context.timeout_label_secs());
            }
        };
        let remaining = deadline.saturating_duration_since(Instant::now());

        match process::run_bounded(command, remaining).await {
            Ok(captured) => {
                let combined = truncate::combine_streams(&captured.stdout, &captured.stderr);
                let output = truncate::truncate_output(&combined, self.context.max_output_chars);

                self.history.push(ExecutionHistoryEntry {
                    attempt_id: attempt.clone(),
                    command: command.to_string(),
                    return_code: captured.exit_code,
                    timestamp: Utc::now(),
                    success: true,
                });

                info!(command, exit_code = ?captured.exit_code, "command completed");
                ExecutionOutcome::completed(output, captured.exit_code)
            }
            Err(TerminalError::Timeout { .. }) => {
                warn!(command, timeout_ms = self.context.timeout.as_millis() as u64, "command timed out");
                ExecutionOutcome::timed_out(self.context.timeout_label_secs())
            }
            Err(e) => {
                warn!(command, error = %e, "command failed to run");
                ExecutionOutcome::spawn_failed(&e.to_string())
            }
        }
    }

    /// Full path from free text: detect a request, extract the command, run it.
    ///
    /// Returns `None` when the text is not a command request or no command
    /// can be extracted; in that case nothing reaches the firewall.
    pub async fn handle_message(&self, text: &str, has_privilege: bool) -> Option<ExecutionOutcome> {
        let candidate = self.extractor.candidate(text);
        let command = candidate.extracted_command?;
        Some(self.run(&command, has_privilege).await)
    }

    /// Firewall verdict without executing or recording anything.
    pub fn verdict(&self, command: &str) -> ExecutionVerdict {
        self.firewall.evaluate(command)
    }

    /// Completed executions, oldest first.
    pub fn history(&self) -> Vec<ExecutionHistoryEntry> {
        self.history.snapshot()
    }

    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }

    pub fn extractor(&self) -> &CommandExtractor {
        &self.extractor
    }

    pub fn context(&self) -> &ExecContext {
        &self.context
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
