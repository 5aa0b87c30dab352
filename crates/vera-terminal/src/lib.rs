//! vera-terminal: guarded command execution for the VERA assistant.
//!
//! Turns chat text into a command, filters it through a policy firewall,
//! gates it on the process's privilege level, and runs it under a timeout
//! with capped output. Denials are audited.
//!
//! Components:
//! - [`privilege`]: root / administrator detection (fails closed)
//! - [`rules`]: firewall policy loaded from JSON, patterns compiled once
//! - [`extract`]: trigger detection and command extraction from free text
//! - [`firewall`]: ordered allow/deny evaluation
//! - [`executor`]: the gate-spawn-record pipeline
//! - [`audit`]: denial log, in memory and on disk
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vera_terminal::{
//!     privilege::{OsPrivilegeProbe, PrivilegeProbe},
//!     CommandExtractor, ExecContext, Executor, Firewall, RuleSet,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let rules = RuleSet::load("vera_data/vera_firewall.json").unwrap_or_default();
//!     let executor = Executor::new(
//!         Firewall::new(Arc::new(rules)),
//!         CommandExtractor::default(),
//!         ExecContext::default().with_audit_log("logs/vera_access.log"),
//!     );
//!
//!     let privileged = OsPrivilegeProbe.has_elevated_privilege();
//!     if let Some(outcome) = executor.handle_message("execute whoami", privileged).await {
//!         println!("{}", serde_json::to_string(&outcome).unwrap());
//!     }
//! }
//! ```

pub mod audit;
pub mod error;
pub mod executor;
pub mod extract;
pub mod firewall;
pub mod history;
pub mod privilege;
pub mod process;
pub mod rules;
pub mod truncate;
pub mod types;

pub use error::{Result, TerminalError};
pub use executor::{ExecContext, Executor};
pub use extract::CommandExtractor;
pub use firewall::Firewall;
pub use privilege::{OsPrivilegeProbe, PrivilegeMode, PrivilegeProbe, StaticPrivilege};
pub use rules::RuleSet;
pub use types::{
    AuditEntry, CommandCandidate, ExecutionHistoryEntry, ExecutionOutcome, ExecutionVerdict,
    OsKind, OutcomeFrame,
};
