//! Firewall policy data.
//!
//! A [`RuleSet`] is built once from the rule file and then shared read-only
//! (`Arc<RuleSet>`) for the life of the process. Every dangerous pattern is
//! compiled here, at load time; entries that fail to compile stay in the
//! list with `valid == false` so their position is preserved, and the
//! firewall skips them.
//!
//! Rule file shape:
//!
//! ```json
//! {
//!   "blacklisted_commands": ["rm -rf", "format c:"],
//!   "dangerous_patterns": [{ "pattern": "shutdown", "reason": "System shutdown" }],
//!   "protected_paths": { "linux": ["/etc/shadow"], "windows": ["c:\\windows\\system32"] },
//!   "self_protection": { "names": ["vera.toml"], "mutating_verbs": ["rm"] }
//! }
//! ```
//!
//! Every key is optional.

use std::collections::HashMap;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, TerminalError};
use crate::types::OsKind;

/// Names that identify VERA's own control files and data directory.
pub const DEFAULT_PROTECTED_NAMES: &[&str] = &["vera.toml", "vera_data", "vera_firewall.json"];

/// Verbs that turn a reference to a protected name into a modification.
pub const DEFAULT_MUTATING_VERBS: &[&str] = &["write", ">", "del", "rm", "remove", "mv"];

// ---------------------------------------------------------------------------
// DangerousPattern
// ---------------------------------------------------------------------------

/// One regex rule, compiled case-insensitively.
#[derive(Debug, Clone)]
pub struct DangerousPattern {
    /// Source text as written in the rule file.
    pub pattern: String,
    /// Configured denial reason, if any.
    pub reason: Option<String>,
    /// `false` when the pattern failed to compile; the firewall skips it.
    pub valid: bool,
    regex: Option<Regex>,
}

impl DangerousPattern {
    pub fn compile(pattern: impl Into<String>, reason: Option<String>) -> Self {
        let pattern = pattern.into();
        let regex = if pattern.is_empty() {
            // An empty regex matches every command.
            warn!("dangerous pattern is empty; rule disabled");
            None
        } else {
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "invalid dangerous pattern; rule disabled");
                    None
                }
            }
        };

        Self {
            valid: regex.is_some(),
            pattern,
            reason: reason.filter(|r| !r.trim().is_empty()),
            regex,
        }
    }

    /// Case-insensitive search. Always `false` for invalid entries.
    pub fn is_match(&self, command: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(command))
    }
}

// ---------------------------------------------------------------------------
// SelfProtection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfProtection {
    #[serde(default = "default_names")]
    pub names: Vec<String>,
    #[serde(default = "default_verbs")]
    pub mutating_verbs: Vec<String>,
}

impl Default for SelfProtection {
    fn default() -> Self {
        Self {
            names: default_names(),
            mutating_verbs: default_verbs(),
        }
    }
}

fn default_names() -> Vec<String> {
    DEFAULT_PROTECTED_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_verbs() -> Vec<String> {
    DEFAULT_MUTATING_VERBS.iter().map(|s| s.to_string()).collect()
}

impl SelfProtection {
    fn normalized(self) -> Self {
        Self {
            names: fold_all(self.names),
            mutating_verbs: fold_all(self.mutating_verbs),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Immutable firewall policy. All string rules are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub blacklisted_commands: Vec<String>,
    pub dangerous_patterns: Vec<DangerousPattern>,
    pub protected_paths: HashMap<String, Vec<String>>,
    pub self_protection: SelfProtection,
}

#[derive(Deserialize)]
struct RawRuleSet {
    #[serde(default)]
    blacklisted_commands: Vec<String>,
    /// Kept as raw values so one malformed entry cannot reject the file.
    #[serde(default)]
    dangerous_patterns: Vec<Value>,
    #[serde(default)]
    protected_paths: HashMap<String, Vec<String>>,
    #[serde(default)]
    self_protection: SelfProtection,
}

impl RuleSet {
    /// No blacklist, no patterns, no protected paths; default self-protection.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Read the rule file at `path`.
    ///
    /// A missing file yields an empty rule set (logged), matching how the
    /// other data files are treated. Unreadable or malformed files are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "rule file missing; firewall runs with an empty rule set");
                return Ok(Self::empty());
            }
            Err(e) => return Err(TerminalError::Io(e)),
        };

        let rules = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            blacklist = rules.blacklisted_commands.len(),
            patterns = rules.dangerous_patterns.len(),
            invalid_patterns = rules.invalid_pattern_count(),
            "firewall rules loaded"
        );
        Ok(rules)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawRuleSet =
            serde_json::from_str(text).map_err(|e| TerminalError::RuleSet(e.to_string()))?;

        let dangerous_patterns = raw
            .dangerous_patterns
            .into_iter()
            .enumerate()
            .map(|(index, entry)| pattern_from_value(index, entry))
            .collect();

        Ok(Self {
            blacklisted_commands: fold_all(raw.blacklisted_commands),
            dangerous_patterns,
            protected_paths: fold_paths(raw.protected_paths),
            self_protection: raw.self_protection.normalized(),
        })
    }

    /// Protected path substrings for `os`, in declared order.
    pub fn protected_paths_for(&self, os: OsKind) -> &[String] {
        self.protected_paths
            .get(os.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn invalid_pattern_count(&self) -> usize {
        self.dangerous_patterns.iter().filter(|p| !p.valid).count()
    }
}

fn pattern_from_value(index: usize, entry: Value) -> DangerousPattern {
    let pattern = entry.get("pattern").and_then(Value::as_str);
    let reason = entry
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string);

    match pattern {
        Some(p) => DangerousPattern::compile(p, reason),
        None => {
            warn!(index, "dangerous pattern entry has no string `pattern`; rule disabled");
            DangerousPattern::compile("", reason)
        }
    }
}

/// Lower-case, trim, and drop empty entries (an empty substring matches
/// every command).
fn fold_all(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn fold_paths(paths: HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    paths
        .into_iter()
        .map(|(os, list)| (os.to_lowercase(), fold_all(list)))
        .collect()
}

// ---------------------------------------------------------------------------
// RuleSetBuilder
// ---------------------------------------------------------------------------

/// Programmatic construction, mostly for embedding callers and tests.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    blacklist: Vec<String>,
    patterns: Vec<(String, Option<String>)>,
    paths: HashMap<String, Vec<String>>,
    self_protection: Option<SelfProtection>,
}

impl RuleSetBuilder {
    pub fn blacklist(mut self, term: impl Into<String>) -> Self {
        self.blacklist.push(term.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        self.patterns.push((pattern.into(), Some(reason.into())));
        self
    }

    pub fn pattern_without_reason(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push((pattern.into(), None));
        self
    }

    pub fn protected_path(mut self, os: OsKind, path: impl Into<String>) -> Self {
        self.paths
            .entry(os.key().to_string())
            .or_default()
            .push(path.into());
        self
    }

    pub fn self_protection(mut self, protection: SelfProtection) -> Self {
        self.self_protection = Some(protection);
        self
    }

    pub fn build(self) -> RuleSet {
        RuleSet {
            blacklisted_commands: fold_all(self.blacklist),
            dangerous_patterns: self
                .patterns
                .into_iter()
                .map(|(p, r)| DangerousPattern::compile(p, r))
                .collect(),
            protected_paths: fold_paths(self.paths),
            self_protection: self.self_protection.unwrap_or_default().normalized(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_rules_are_case_folded() {
        let rules = RuleSet::from_json_str(
            r#"{
                "blacklisted_commands": ["RM -RF", "  Format C:  "],
                "protected_paths": { "Linux": ["/ETC/Shadow"] }
            }"#,
        )
        .unwrap();

        assert_eq!(rules.blacklisted_commands, vec!["rm -rf", "format c:"]);
        assert_eq!(rules.protected_paths_for(OsKind::Linux), ["/etc/shadow"]);
        assert!(rules.protected_paths_for(OsKind::Windows).is_empty());
    }

    #[test]
    fn invalid_pattern_keeps_its_slot() {
        let rules = RuleSet::from_json_str(
            r#"{ "dangerous_patterns": [
                { "pattern": "(", "reason": "broken" },
                { "pattern": "shutdown", "reason": "System shutdown" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(rules.dangerous_patterns.len(), 2);
        assert!(!rules.dangerous_patterns[0].valid);
        assert!(rules.dangerous_patterns[1].valid);
        assert_eq!(rules.invalid_pattern_count(), 1);
    }

    #[test]
    fn non_object_pattern_entry_does_not_reject_file() {
        let rules = RuleSet::from_json_str(
            r#"{ "dangerous_patterns": [42, { "pattern": "mkfs" }] }"#,
        )
        .unwrap();
        assert!(!rules.dangerous_patterns[0].valid);
        assert!(rules.dangerous_patterns[1].is_match("MKFS.ext4 /dev/sdb"));
        assert_eq!(rules.dangerous_patterns[1].reason, None);
    }

    #[test]
    fn empty_strings_are_dropped() {
        let rules = RuleSet::from_json_str(
            r#"{ "blacklisted_commands": ["", "  "], "dangerous_patterns": [{ "pattern": "" }] }"#,
        )
        .unwrap();
        assert!(rules.blacklisted_commands.is_empty());
        assert!(!rules.dangerous_patterns[0].valid);
    }

    #[test]
    fn missing_self_protection_uses_defaults() {
        let rules = RuleSet::from_json_str("{}").unwrap();
        assert!(rules.self_protection.names.iter().any(|n| n == "vera_data"));
        assert!(rules.self_protection.mutating_verbs.iter().any(|v| v == "rm"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = RuleSet::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TerminalError::RuleSet(_)));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let rules = RuleSet::load("/nonexistent/vera_firewall.json").unwrap();
        assert!(rules.blacklisted_commands.is_empty());
        assert!(rules.dangerous_patterns.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "blacklisted_commands": ["mkfs"] }}"#).unwrap();
        let rules = RuleSet::load(file.path()).unwrap();
        assert_eq!(rules.blacklisted_commands, vec!["mkfs"]);
    }

    #[test]
    fn builder_compiles_patterns() {
        let rules = RuleSet::builder()
            .blacklist("DD IF=")
            .pattern(r"chmod\s+777", "World-writable permissions")
            .protected_path(OsKind::Windows, r"C:\Windows\System32")
            .build();

        assert_eq!(rules.blacklisted_commands, vec!["dd if="]);
        assert!(rules.dangerous_patterns[0].is_match("CHMOD   777 /srv"));
        assert_eq!(
            rules.protected_paths_for(OsKind::Windows),
            [r"c:\windows\system32"]
        );
    }
}
