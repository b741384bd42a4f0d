// Agent subprocess session lifecycle
//
// A session owns one long-lived agent process plus one reader task per
// output stream. Readers append to a shared buffer under a mutex and track
// the agent's self-reported context usage; `send` writes to stdin and
// snapshots whatever the readers have buffered so far.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::agents::Agent;
use crate::session::{build_invocation_args, Response, Session, SessionError};
use crate::utils::lock_mutex_recover;

/// Matches agent-reported usage lines like "Context: 15% used" or
/// "15% used (29368/200000 tokens)". Permissive on purpose; a false
/// positive costs nothing, so usage tracking stays heuristic.
static CONTEXT_USAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)%\s+used").unwrap());

/// Output accumulated by the reader tasks since the last send.
#[derive(Default)]
struct OutputState {
    buffer: String,
    usage: f64,
}

impl OutputState {
    /// Records one output line: appends it to the buffer and folds any
    /// usage report into the counter. Usage is monotonic non-decreasing
    /// and clamped to [0.0, 1.0] for the life of the session.
    fn observe(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');

        if let Some(usage) = parse_context_usage(line) {
            let usage = usage.clamp(0.0, 1.0);
            if usage > self.usage {
                self.usage = usage;
            }
        }
    }
}

fn parse_context_usage(line: &str) -> Option<f64> {
    let captures = CONTEXT_USAGE_REGEX.captures(line)?;
    let pct: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(f64::from(pct) / 100.0)
}

/// Process-side state, guarded by an async mutex because close and the
/// cancellation watcher both need the child.
#[derive(Default)]
struct ProcState {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
    cancel_watch: Option<JoinHandle<()>>,
    closed: bool,
}

/// Session backed by a real agent CLI process.
pub struct AgentSession {
    agent: Agent,
    output: Arc<Mutex<OutputState>>,
    started: AtomicBool,
    alive: Arc<AtomicBool>,
    proc: Arc<tokio::sync::Mutex<ProcState>>,
}

impl AgentSession {
    pub(crate) fn new(agent: Agent) -> Self {
        Self {
            agent,
            output: Arc::new(Mutex::new(OutputState::default())),
            started: AtomicBool::new(false),
            alive: Arc::new(AtomicBool::new(false)),
            proc: Arc::new(tokio::sync::Mutex::new(ProcState::default())),
        }
    }

    /// Everything the readers have buffered since the last send. This is
    /// the polling surface for callers that layer their own turn-boundary
    /// protocol on top of `send`.
    pub fn buffered_output(&self) -> String {
        lock_mutex_recover(&self.output).buffer.clone()
    }
}

#[async_trait]
impl Session for AgentSession {
    async fn start(
        &self,
        token: &CancellationToken,
        agents_path: &Path,
    ) -> Result<(), SessionError> {
        let mut proc = self.proc.lock().await;
        if self.started.load(Ordering::SeqCst) || proc.closed {
            return Err(SessionError::AlreadyStarted);
        }

        // Validate AGENTS.md exists before paying for a spawn
        if let Err(source) = tokio::fs::metadata(agents_path).await {
            return Err(SessionError::AgentsFileMissing {
                path: agents_path.to_path_buf(),
                source,
            });
        }

        let initial_prompt = format!("please read and apply {}", agents_path.display());
        let args = build_invocation_args(&self.agent.pattern, &initial_prompt);

        log::debug!(
            "[Session] Starting {} with args {:?}",
            self.agent.name,
            args
        );

        let mut child = Command::new(&self.agent.path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SessionError::SpawnFailed)?;

        proc.stdin = child.stdin.take();
        if let Some(stdout) = child.stdout.take() {
            proc.readers.push(spawn_reader(stdout, self.output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            proc.readers.push(spawn_reader(stderr, self.output.clone()));
        }
        proc.child = Some(child);

        // Bind the child to the caller's cancellation signal. Weak keeps
        // the watcher from holding the process state alive on its own.
        let weak = Arc::downgrade(&self.proc);
        let alive = Arc::clone(&self.alive);
        let watch_token = token.clone();
        proc.cancel_watch = Some(tokio::spawn(async move {
            watch_token.cancelled().await;
            alive.store(false, Ordering::SeqCst);
            if let Some(proc) = weak.upgrade() {
                let mut state = proc.lock().await;
                if let Some(child) = state.child.as_mut() {
                    let _ = child.start_kill();
                }
            }
        }));

        self.alive.store(true, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(
        &self,
        token: &CancellationToken,
        prompt: &str,
    ) -> Result<Response, SessionError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(SessionError::NotStarted);
        }
        if !self.is_alive() {
            return Err(SessionError::Dead);
        }

        // Clear the buffer so the response only reflects this turn
        lock_mutex_recover(&self.output).buffer.clear();

        let mut proc = self.proc.lock().await;
        if proc.closed {
            return Err(SessionError::Dead);
        }
        let stdin = proc.stdin.as_mut().ok_or(SessionError::Dead)?;

        let payload = format!("{}\n", prompt);
        let write = async {
            stdin.write_all(payload.as_bytes()).await?;
            stdin.flush().await
        };
        let written = tokio::select! {
            result = write => result,
            _ = token.cancelled() => return Err(SessionError::Cancelled),
        };
        drop(proc);

        if let Err(source) = written {
            self.alive.store(false, Ordering::SeqCst);
            return Err(SessionError::SendFailed(source));
        }

        // No wait for a completion marker: snapshot what the readers have
        let output = lock_mutex_recover(&self.output);
        Ok(Response {
            output: output.buffer.clone(),
            context_usage: output.usage,
        })
    }

    fn context_usage(&self) -> f64 {
        lock_mutex_recover(&self.output).usage
    }

    fn is_alive(&self) -> bool {
        self.started.load(Ordering::SeqCst) && self.alive.load(Ordering::SeqCst)
    }

    fn agent(&self) -> &Agent {
        &self.agent
    }

    async fn close(&self) -> Result<(), SessionError> {
        let mut proc = self.proc.lock().await;
        if proc.closed {
            return Ok(());
        }
        proc.closed = true;
        self.alive.store(false, Ordering::SeqCst);

        // Close stdin first so well-behaved agents exit on their own
        proc.stdin.take();

        if let Some(watch) = proc.cancel_watch.take() {
            watch.abort();
        }

        if let Some(mut child) = proc.child.take() {
            let _ = child.start_kill();
            // Reap; never leave a zombie behind
            let _ = child.wait().await;
        }

        // Readers see EOF once the process is gone; join them
        for reader in proc.readers.drain(..) {
            let _ = reader.await;
        }

        Ok(())
    }
}

/// Spawns a task that drains one output stream into the shared buffer.
fn spawn_reader<R>(stream: R, output: Arc<Mutex<OutputState>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            lock_mutex_recover(&output).observe(&line);
        }
    })
}
