mod config;
mod context;
mod embeddings;
mod errors;
mod evaluation;
mod extract;
mod interview;
mod llm_gateway;
mod state;
mod vector;

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::interview::profile::InterviewKind;
use crate::interview::{CreateSessionRequest, TurnKind};
use crate::state::EngineState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parley engine v{}", env!("CARGO_PKG_VERSION"));

    let state = EngineState::from_config(config);
    info!(
        "Components initialized (cost-optimized: {}, max sessions: {})",
        state.config.cost_optimized, state.config.max_sessions
    );

    run_terminal_interview(&state).await
}

/// Minimal terminal shim over the engine: one session, stdin turns. The real
/// boundary layer (HTTP, voice) lives outside this crate.
async fn run_terminal_interview(state: &EngineState) -> Result<()> {
    let kind: InterviewKind = std::env::var("INTERVIEW_TYPE")
        .unwrap_or_else(|_| "behavioral".to_string())
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let user_id = std::env::var("USER_ID").unwrap_or_else(|_| "local-user".to_string());

    let mut request = CreateSessionRequest::new(user_id, kind);
    request.resume_text = read_optional_file("RESUME_PATH");
    request.jd_text = read_optional_file("JD_PATH");

    let handle = state.interviews.create_session(request);
    println!("\n{}\n", handle.greeting);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let text = line?;
        if text.trim().is_empty() {
            continue;
        }

        let turn = state.interviews.submit_turn(handle.session_id, &text).await?;
        println!("\ninterviewer> {}\n", turn.message);

        if turn.kind == TurnKind::Completion {
            if let Some(summary) = turn.summary {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            info!(
                "Interview complete ({} live session(s) in registry)",
                state.interviews.active_sessions()
            );
            break;
        }
    }

    Ok(())
}

fn read_optional_file(env_key: &str) -> Option<String> {
    let path = std::env::var(env_key).ok()?;
    match std::fs::read_to_string(&path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::warn!("Could not read {env_key}={path}: {err}");
            None
        }
    }
}
