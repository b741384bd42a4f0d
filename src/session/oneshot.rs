// One-shot agent execution
//
// For agents driven per-prompt rather than as a dialogue (auggie --print,
// amp --execute, gemini positional, codex exec). Runs the process to
// completion, merging stdout and stderr into one buffer, and applies the
// agent's output parser.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agents::Agent;
use crate::session::{build_invocation_args, SessionError};
use crate::utils::lock_mutex_recover;

/// Result of a one-shot agent execution.
#[derive(Debug)]
pub struct OneShotResult {
    /// Combined stdout/stderr output, after parsing
    pub output: String,
    /// Process exit code (-1 on cancellation or signal death)
    pub exit_code: i32,
    /// Error, if the run failed; output is still populated
    pub error: Option<SessionError>,
}

/// Executes an agent in one-shot mode and waits for completion.
pub async fn run_one_shot(
    token: &CancellationToken,
    agent: &Agent,
    prompt: &str,
) -> OneShotResult {
    let args = build_invocation_args(&agent.pattern, prompt);

    log::debug!("[OneShot] Running {} with args {:?}", agent.name, args);

    let mut child = match Command::new(&agent.path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(source) => {
            return OneShotResult {
                output: String::new(),
                exit_code: -1,
                error: Some(SessionError::SpawnFailed(source)),
            }
        }
    };

    let merged = Arc::new(Mutex::new(String::new()));
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_merge_reader(stdout, Arc::clone(&merged)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_merge_reader(stderr, Arc::clone(&merged)));
    }

    let status = tokio::select! {
        status = child.wait() => Some(status),
        _ = token.cancelled() => None,
    };

    let Some(status) = status else {
        // Cancelled: kill, reap, and hand back whatever was captured
        let _ = child.start_kill();
        let _ = child.wait().await;
        let output = collect_output(agent, readers, &merged).await;
        return OneShotResult {
            output,
            exit_code: -1,
            error: Some(SessionError::Cancelled),
        };
    };

    let output = collect_output(agent, readers, &merged).await;

    match status {
        Ok(status) => {
            let exit_code = status.code().unwrap_or(-1);
            let error = if exit_code == 0 {
                None
            } else {
                Some(SessionError::AgentExited(exit_code))
            };
            OneShotResult {
                output,
                exit_code,
                error,
            }
        }
        Err(source) => OneShotResult {
            output,
            exit_code: -1,
            error: Some(SessionError::ProcessFailed(source)),
        },
    }
}

/// Joins the readers and parses whatever they captured.
async fn collect_output(
    agent: &Agent,
    readers: Vec<JoinHandle<()>>,
    merged: &Arc<Mutex<String>>,
) -> String {
    for reader in readers {
        let _ = reader.await;
    }
    let raw = lock_mutex_recover(merged).clone();
    agent.parser.parse(&raw)
}

/// Spawns a task appending one stream's lines to the merged buffer.
fn spawn_merge_reader<R>(stream: R, merged: Arc<Mutex<String>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut buffer = lock_mutex_recover(&merged);
            buffer.push_str(&line);
            buffer.push('\n');
        }
    })
}
