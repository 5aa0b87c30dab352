//! Command firewall.
//!
//! Decides, before anything is spawned, whether a command may run. The goal
//! is not to be an airtight sandbox (that requires OS-level isolation) but
//! to catch the dangerous commands the policy names.
//!
//! Decision order, first denial wins:
//!   1. Blacklist: case-insensitive substring of any blacklisted term.
//!   2. Dangerous patterns, in declared order; invalid entries are skipped.
//!   3. Protected paths for the current platform.
//!   4. Self-protection: a protected name *and* a mutating verb.
//!   5. Otherwise allowed.
//!
//! [`evaluate`] is pure. Recording a denial is the caller's job (see
//! `audit::AuditSink`).

use std::sync::Arc;

use crate::rules::{RuleSet, SelfProtection};
use crate::types::{ExecutionVerdict, OsKind};

/// Reason used when a matching pattern has no configured reason.
pub const GENERIC_PATTERN_REASON: &str = "dangerous pattern";

/// Check `command` against `rules` for `platform`.
pub fn evaluate(command: &str, rules: &RuleSet, platform: OsKind) -> ExecutionVerdict {
    let lower = command.trim().to_lowercase();

    if let Some(term) = rules
        .blacklisted_commands
        .iter()
        .find(|term| lower.contains(term.as_str()))
    {
        return deny(format!("Blocked: '{term}' is dangerous"));
    }

    if let Some(rule) = rules
        .dangerous_patterns
        .iter()
        .filter(|p| p.valid)
        .find(|p| p.is_match(&lower))
    {
        let reason = rule.reason.as_deref().unwrap_or(GENERIC_PATTERN_REASON);
        return deny(format!("Blocked: {reason}"));
    }

    if let Some(path) = rules
        .protected_paths_for(platform)
        .iter()
        .find(|path| lower.contains(path.as_str()))
    {
        return deny(format!("Blocked: Cannot access protected path '{path}'"));
    }

    if touches_own_files(&lower, &rules.self_protection) {
        return deny("Blocked: Cannot modify VERA core files".to_string());
    }

    ExecutionVerdict::Allowed
}

fn deny(reason: String) -> ExecutionVerdict {
    ExecutionVerdict::Denied { reason }
}

// ---------------------------------------------------------------------------
// Self-protection
// ---------------------------------------------------------------------------

/// `true` when `lower` names one of our own files and also mutates something.
/// Reading or listing those files is fine.
fn touches_own_files(lower: &str, protection: &SelfProtection) -> bool {
    let references = protection
        .names
        .iter()
        .any(|name| lower.contains(name.as_str()));

    references && has_mutating_verb(lower, protection)
}

/// Word verbs (`rm`, `del`, …) match a token that starts with them. Tokens
/// are split on whitespace, shell punctuation and quotes, and lose leading
/// dashes (`-delete`). A directory prefix is dropped (`/bin/rm`) unless the
/// token names a protected file, so `vera_data/remove_list.txt` is an
/// argument, not a verb. Symbolic verbs (`>`) match anywhere.
fn has_mutating_verb(lower: &str, protection: &SelfProtection) -> bool {
    let tokens: Vec<&str> = lower
        .split(|c: char| {
            c.is_whitespace()
                || matches!(c, ';' | '|' | '&' | '(' | ')' | '`' | '$' | '\'' | '"')
        })
        .map(|t| t.trim_start_matches('-'))
        .filter(|t| !t.is_empty())
        .map(|t| {
            if protection.names.iter().any(|name| t.contains(name.as_str())) {
                t
            } else {
                t.rsplit(['/', '\\']).next().unwrap_or(t)
            }
        })
        .collect();

    protection.mutating_verbs.iter().any(|verb| {
        let is_word = verb.chars().next().is_some_and(char::is_alphanumeric);
        if is_word {
            tokens.iter().any(|t| t.starts_with(verb.as_str()))
        } else {
            lower.contains(verb.as_str())
        }
    })
}

// ---------------------------------------------------------------------------
// Firewall
// ---------------------------------------------------------------------------

/// A rule set bound to a platform. Cheap to clone; the rules are shared.
#[derive(Debug, Clone)]
pub struct Firewall {
    rules: Arc<RuleSet>,
    platform: OsKind,
}

impl Firewall {
    /// Firewall for the platform this binary runs on.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self::with_platform(rules, OsKind::current())
    }

    pub fn with_platform(rules: Arc<RuleSet>, platform: OsKind) -> Self {
        Self { rules, platform }
    }

    pub fn evaluate(&self, command: &str) -> ExecutionVerdict {
        evaluate(command, &self.rules, self.platform)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn platform(&self) -> OsKind {
        self.platform
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
