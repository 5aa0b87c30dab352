//! Line-oriented session loop: one chat message in, one JSON line out.
//!
//! Each line is handled on its own task so a slow command never holds up
//! the next message. Results are printed in completion order, tagged with
//! the input line number.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use vera_terminal::{ExecutionOutcome, Executor};

#[derive(Serialize)]
struct Reply<'a> {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'static str>,
}

pub async fn run(executor: Arc<Executor>, privileged: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks = JoinSet::new();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let text = line.trim().to_string();
        if text.is_empty() {
            continue;
        }

        let executor = Arc::clone(&executor);
        let n = line_no;
        tasks.spawn(async move {
            let outcome = executor.handle_message(&text, privileged).await;
            let reply = Reply {
                line: n,
                result: outcome.as_ref(),
                note: outcome.is_none().then_some("not a command request"),
            };
            match serde_json::to_string(&reply) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!(line = n, error = %e, "failed to encode reply"),
            }
        });

        // Reap finished sessions so the set does not grow without bound.
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                warn!(error = %e, "session task failed");
            }
        }
    }

    debug!(pending = tasks.len(), "stdin closed, waiting for sessions");
    while let Some(done) = tasks.join_next().await {
        if let Err(e) = done {
            warn!(error = %e, "session task failed");
        }
    }
    Ok(())
}
