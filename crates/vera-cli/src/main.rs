use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use vera_core::VeraConfig;
use vera_terminal::{
    Executor, ExecutionOutcome, ExecutionVerdict, OsPrivilegeProbe, PrivilegeMode, RuleSet,
};

mod repl;

#[derive(Parser)]
#[command(name = "vera")]
#[command(version)]
#[command(about = "Guarded command execution for the VERA assistant")]
struct Cli {
    /// Config file (default: $VERA_CONFIG, then ~/.vera/vera.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show whether this process runs in admin or client mode
    Mode,
    /// Print the firewall verdict for a command without running it
    Check {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Run a command through the firewall, privilege gate and executor
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    /// Extract a command from natural language and run it
    Ask {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        text: Vec<String>,
    },
    /// Read messages from stdin, one per line; print one JSON result per line
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // stdout carries results; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vera=info,vera_terminal=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > VERA_CONFIG env > ~/.vera/vera.toml
    let config_path = cli.config.or_else(|| std::env::var("VERA_CONFIG").ok());
    let config = VeraConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        VeraConfig::default()
    });

    // privilege is resolved once for the lifetime of the process
    let mode = PrivilegeMode::detect(&OsPrivilegeProbe);
    info!(mode = mode.label(), "privilege mode detected");

    match cli.command {
        Command::Mode => {
            println!("{}", mode.label());
            println!("{}", mode.message());
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { command } => {
            let executor = build_executor(&config)?;
            match executor.verdict(&command.join(" ")) {
                ExecutionVerdict::Allowed => {
                    println!("allowed");
                    Ok(ExitCode::SUCCESS)
                }
                ExecutionVerdict::Denied { reason } => {
                    println!("denied: {reason}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Exec { command } => {
            let executor = build_executor(&config)?;
            let outcome = executor.run(&command.join(" "), mode.elevated).await;
            print_outcome(&outcome)
        }
        Command::Ask { text } => {
            let executor = build_executor(&config)?;
            match executor.handle_message(&text.join(" "), mode.elevated).await {
                Some(outcome) => print_outcome(&outcome),
                None => {
                    println!("not a command request");
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Command::Repl => {
            repl::run(build_executor(&config)?, mode.elevated).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// A malformed rule file aborts startup; a missing one runs with no rules.
fn build_executor(config: &VeraConfig) -> anyhow::Result<Arc<Executor>> {
    let rules = RuleSet::load(&config.firewall.rules_path)?;
    Ok(Arc::new(Executor::from_config(config, Arc::new(rules))))
}

fn print_outcome(outcome: &ExecutionOutcome) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string(outcome)?);
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
