//! Natural-language command extraction.
//!
//! Two questions, asked in order by the caller:
//!
//! 1. [`CommandExtractor::is_command_request`]: does the message contain
//!    any trigger word? Necessary, not sufficient.
//! 2. [`CommandExtractor::extract_command`]: which command does it ask for?
//!
//! Extraction precedence is fixed:
//!
//! | # | Form                                   | Example                     |
//! |---|----------------------------------------|-----------------------------|
//! | 1 | `run [the] [command] <cmd>`            | `run command ls -la`        |
//! | 2 | `execute [the] <cmd>`                  | `execute whoami`            |
//! | 3 | `cmd [command] <cmd>`                  | `cmd dir`                   |
//! | 4 | `> <cmd>`, `cmd: <cmd>`, `command: <cmd>` | `command: uptime`        |
//! | 5 | first quoted or backticked token       | ``please try `df -h` ``     |
//!
//! The first form that yields a non-empty command wins. Verb matching is
//! case-insensitive; the command keeps the caller's original casing.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::CommandCandidate;

/// Ordered extraction patterns; capture group 1 is the command.
static EXTRACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)\brun\s+(?:the\s+)?(?:command\s+)?["'`]?([^"'`\n]+)["'`]?"#,
        r#"(?i)\bexecute\s+(?:the\s+)?["'`]?([^"'`\n]+)["'`]?"#,
        r#"(?i)\bcmd\s+(?:command\s+)?["'`]?([^"'`\n]+)["'`]?"#,
        r#"(?i)(?:^|\s)(?:>|cmd:|command:)\s*([^\n]+)"#,
        r#"["'`]([^"'`]+)["'`]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static extraction pattern"))
    .collect()
});

/// Decides whether a message asks for a command and pulls the command out.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    /// Lower-cased trigger vocabulary.
    triggers: Vec<String>,
}

impl CommandExtractor {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// `true` if the lower-cased text contains any trigger word.
    pub fn is_command_request(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.triggers.iter().any(|t| lower.contains(t.as_str()))
    }

    /// Extract a command using the fixed precedence above.
    ///
    /// A form that matches but captures only whitespace does not count as a
    /// match; the next form is tried.
    pub fn extract_command(&self, text: &str) -> Option<String> {
        for (index, re) in EXTRACTION_PATTERNS.iter().enumerate() {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let command = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if command.is_empty() {
                continue;
            }
            debug!(pattern = index, command, "command extracted");
            return Some(command.to_string());
        }
        None
    }

    /// Classify one inbound message. Extraction only runs for requests.
    pub fn candidate(&self, text: &str) -> CommandCandidate {
        let extracted_command = if self.is_command_request(text) {
            self.extract_command(text)
        } else {
            None
        };
        CommandCandidate {
            raw_message: text.to_string(),
            extracted_command,
        }
    }
}

impl Default for CommandExtractor {
    fn default() -> Self {
        Self::new(vera_core::config::DEFAULT_TRIGGERS)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> CommandExtractor {
        CommandExtractor::default()
    }

    // --- Request detection ---

    #[test]
    fn weather_question_is_not_a_request() {
        assert!(!extractor().is_command_request("what's the weather"));
    }

    #[test]
    fn trigger_detection_is_case_insensitive() {
        assert!(extractor().is_command_request("EXECUTE whoami"));
        assert!(extractor().is_command_request("Can you Ping google.com?"));
    }

    #[test]
    fn custom_vocabulary_replaces_defaults() {
        let ex = CommandExtractor::new(["launch"]);
        assert!(ex.is_command_request("launch htop"));
        assert!(!ex.is_command_request("run htop"));
    }

    // --- Extraction ---

    #[test]
    fn run_command_phrase() {
        assert_eq!(
            extractor().extract_command("run command rm -rf /").as_deref(),
            Some("rm -rf /")
        );
    }

    #[test]
    fn execute_phrase() {
        assert_eq!(
            extractor().extract_command("execute whoami").as_deref(),
            Some("whoami")
        );
    }

    #[test]
    fn run_the_quoted_command() {
        assert_eq!(
            extractor()
                .extract_command("please run the command \"ls -la /tmp\" for me")
                .as_deref(),
            Some("ls -la /tmp")
        );
    }

    #[test]
    fn backticked_command_after_verb() {
        assert_eq!(
            extractor().extract_command("Run `git status` now").as_deref(),
            Some("git status")
        );
    }

    #[test]
    fn command_case_is_preserved() {
        assert_eq!(
            extractor().extract_command("EXECUTE Get-Process").as_deref(),
            Some("Get-Process")
        );
    }

    #[test]
    fn cmd_prefix() {
        assert_eq!(extractor().extract_command("cmd dir C:\\").as_deref(), Some("dir C:\\"));
    }

    #[test]
    fn marker_prefix() {
        assert_eq!(
            extractor().extract_command("command: uptime").as_deref(),
            Some("uptime")
        );
        assert_eq!(extractor().extract_command("> df -h").as_deref(), Some("df -h"));
    }

    #[test]
    fn quoted_fallback() {
        assert_eq!(
            extractor()
                .extract_command("could you check 'free -m' please")
                .as_deref(),
            Some("free -m")
        );
    }

    #[test]
    fn verb_phrase_beats_quoted_token() {
        // Both forms are present; the verb pattern comes first.
        assert_eq!(
            extractor()
                .extract_command("execute uname -a and ignore 'date'")
                .as_deref(),
            Some("uname -a and ignore")
        );
    }

    #[test]
    fn verb_inside_word_does_not_match() {
        // "truncate" contains "run" but not as a word.
        assert_eq!(extractor().extract_command("truncate the file"), None);
    }

    #[test]
    fn blank_capture_falls_through_to_next_form() {
        // The "run" form captures only the space before the empty quotes.
        assert_eq!(
            extractor()
                .extract_command("run  \"\" then command: uptime")
                .as_deref(),
            Some("uptime")
        );
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extractor().extract_command("show me something nice"), None);
    }

    #[test]
    fn candidate_skips_extraction_for_non_requests() {
        let c = extractor().candidate("tell me about 'ls'");
        assert_eq!(c.raw_message, "tell me about 'ls'");
        assert_eq!(c.extracted_command, None);

        let c = extractor().candidate("execute whoami");
        assert_eq!(c.extracted_command.as_deref(), Some("whoami"));
    }
}
