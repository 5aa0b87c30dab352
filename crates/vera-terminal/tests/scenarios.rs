// End-to-end behaviour of the chat-text → outcome pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vera_terminal::{
    CommandExtractor, ExecContext, Executor, ExecutionVerdict, Firewall, OsKind, RuleSet,
};

fn executor_with(rules: RuleSet, ctx: ExecContext) -> Executor {
    Executor::new(
        Firewall::with_platform(Arc::new(rules), OsKind::current()),
        CommandExtractor::default(),
        ctx,
    )
}

#[tokio::test]
async fn blacklisted_request_is_denied_and_audited() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("logs").join("vera_access.log");
    let rules = RuleSet::from_json_str(r#"{ "blacklisted_commands": ["rm -rf"] }"#).unwrap();
    let ex = executor_with(rules, ExecContext::default().with_audit_log(&log));

    let out = ex
        .handle_message("run command rm -rf /", true)
        .await
        .expect("is a command request");

    assert!(!out.success);
    assert!(out.blocked);
    assert!(out.output.contains("rm -rf"));
    assert!(ex.history().is_empty(), "no process may be spawned");

    let text = std::fs::read_to_string(&log).unwrap();
    assert!(text.contains("[BLOCKED] "));
    assert!(text.contains("Command: rm -rf /"));
}

#[cfg(unix)]
#[tokio::test]
async fn privileged_whoami_runs() {
    let Ok(expected) = std::process::Command::new("whoami").output() else {
        return; // no whoami on this host
    };
    let ex = executor_with(RuleSet::empty(), ExecContext::default());

    let out = ex.handle_message("execute whoami", true).await.unwrap();

    assert!(out.success);
    assert_eq!(out.return_code, Some(0));
    assert_eq!(out.output, String::from_utf8_lossy(&expected.stdout));
}

#[tokio::test]
async fn unprivileged_whoami_is_gated() {
    let ex = executor_with(RuleSet::empty(), ExecContext::default());

    let out = ex.handle_message("execute whoami", false).await.unwrap();

    assert!(!out.success);
    assert!(out.gated_by_privilege);
    assert!(out.output.contains("Admin mode required"));
    assert!(ex.history().is_empty());

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["mode"], "client");
}

#[tokio::test]
async fn small_talk_is_ignored() {
    let ex = executor_with(RuleSet::empty(), ExecContext::default());
    assert!(!ex.extractor().is_command_request("what's the weather"));
    assert!(ex.handle_message("what's the weather", true).await.is_none());
}

#[tokio::test]
async fn malformed_pattern_does_not_shadow_later_rule() {
    let rules = RuleSet::from_json_str(
        r#"{ "dangerous_patterns": [
            { "pattern": "(", "reason": "never compiles" },
            { "pattern": "shutdown", "reason": "System shutdown" }
        ] }"#,
    )
    .unwrap();
    let ex = executor_with(rules, ExecContext::default());

    assert_eq!(
        ex.verdict("shutdown now"),
        ExecutionVerdict::Denied {
            reason: "Blocked: System shutdown".to_string()
        }
    );

    let out = ex.run("shutdown now", true).await;
    assert!(out.blocked);
    assert_eq!(out.output, "🔒 Blocked: System shutdown");
}

#[cfg(unix)]
#[tokio::test]
async fn long_running_command_times_out() {
    let ctx = ExecContext::default().with_timeout(Duration::from_secs(1));
    let ex = executor_with(RuleSet::empty(), ctx);

    let start = Instant::now();
    let out = ex.run("sleep 20", true).await;

    assert!(!out.success);
    assert_eq!(out.output, "Command timed out (1s limit)");
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(ex.history().is_empty());
}

#[cfg(unix)]
#[tokio::test]
#[ignore = "takes the full default timeout"]
async fn default_timeout_is_thirty_seconds() {
    let ex = executor_with(RuleSet::empty(), ExecContext::default());

    let start = Instant::now();
    let out = ex.run("sleep 45", true).await;
    let elapsed = start.elapsed();

    assert_eq!(out.output, "Command timed out (30s limit)");
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(35));
}

#[cfg(unix)]
#[tokio::test]
async fn missing_executable_completes_with_shell_status() {
    // The shell itself starts fine; it reports 127 for an unknown program.
    let ex = executor_with(RuleSet::empty(), ExecContext::default());
    let out = ex.run("definitely-not-a-real-binary-vera", true).await;
    assert!(out.success);
    assert_eq!(out.return_code, Some(127));
    assert!(out.output.contains("[STDERR]"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sessions_do_not_block_each_other() {
    let ex = Arc::new(executor_with(RuleSet::empty(), ExecContext::default()));

    let start = Instant::now();
    let slow = {
        let ex = Arc::clone(&ex);
        tokio::spawn(async move { ex.run("sleep 2", true).await })
    };
    // A second session gets its answer while the first is still running.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let quick = ex.run("echo quick", true).await;
    assert_eq!(quick.output, "quick\n");
    assert!(start.elapsed() < Duration::from_millis(1_500));

    let slow = slow.await.unwrap();
    assert!(slow.success);
    assert_eq!(ex.history().len(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn concurrency_limit_queues_extra_attempts() {
    let mut ctx = ExecContext::default();
    ctx.max_concurrency = 1;
    let ex = Arc::new(executor_with(RuleSet::empty(), ctx));

    let start = Instant::now();
    let a = tokio::spawn({
        let ex = Arc::clone(&ex);
        async move { ex.run("sleep 1", true).await }
    });
    let b = tokio::spawn({
        let ex = Arc::clone(&ex);
        async move { ex.run("sleep 1", true).await }
    });
    assert!(a.await.unwrap().success);
    assert!(b.await.unwrap().success);
    assert!(start.elapsed() >= Duration::from_millis(1_900));
}

#[tokio::test]
async fn self_protection_through_the_pipeline() {
    let ex = executor_with(RuleSet::empty(), ExecContext::default());

    let out = ex.handle_message("run rm -rf vera_data", true).await.unwrap();
    assert_eq!(out.output, "🔒 Blocked: Cannot modify VERA core files");

    assert!(ex.verdict("cat vera_data/notes.txt").is_allowed());
}
