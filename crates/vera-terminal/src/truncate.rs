//! Output truncation.
//!
//! Command output is returned to a chat client, so it is capped. The head of
//! the output is kept and a notice stating the original length is appended.
//! Lengths are counted in characters, not bytes, so multi-byte sequences are
//! never split.

/// Default maximum characters before truncation kicks in.
pub const DEFAULT_MAX_CHARS: usize = vera_core::config::DEFAULT_MAX_OUTPUT_CHARS;

/// Cut `output` to its first `max_chars` characters.
///
/// Over-long output becomes:
///
/// ```text
/// <first max_chars chars>
///
/// ... (output truncated, N total chars)
/// ```
pub fn truncate_output(output: &str, max_chars: usize) -> String {
    if output.len() <= max_chars {
        // Byte length bounds char count, so this is within budget.
        return output.to_owned();
    }

    let total = output.chars().count();
    if total <= max_chars {
        return output.to_owned();
    }

    let head: String = output.chars().take(max_chars).collect();
    format!("{head}\n\n... (output truncated, {total} total chars)")
}

/// Join stdout and stderr the way they are presented to the user: stderr,
/// when present, follows a `[STDERR]` marker line.
pub fn combine_streams(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        return stdout.to_owned();
    }
    format!("{stdout}\n[STDERR]\n{stderr}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
