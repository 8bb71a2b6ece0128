//! External command execution.
//!
//! Every stage talks to the outside world through the [`Runner`] trait:
//! - [`ProcessRunner`] spawns real processes with `tokio::process`
//! - [`RecordingRunner`] records what would run, for plans and dry runs

mod types;

use std::future::Future;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

pub use types::{CommandOutput, CommandSpec, ExecError};

use types::{STDERR_TAIL_LINES, tail_lines};

/// Executes command specs.
pub trait Runner {
  /// Whether the process already runs with root privileges.
  fn elevated(&self) -> bool;

  /// Run one command to completion.
  fn run(&self, spec: &CommandSpec) -> impl Future<Output = Result<CommandOutput, ExecError>>;
}

/// Runs commands as child processes.
///
/// Output is captured and echoed line by line to the log, so the tool's own
/// diagnostics stay visible while the pipeline keeps a copy.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
  elevated: bool,
  timeout: Option<Duration>,
}

impl ProcessRunner {
  pub fn new(elevated: bool) -> Self {
    Self { elevated, timeout: None }
  }

  /// Kill commands that run longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }
}

impl Runner for ProcessRunner {
  fn elevated(&self) -> bool {
    self.elevated
  }

  async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
    let (program, args) = spec.argv(self.elevated);
    let cmd_line = spec.command_line(self.elevated);
    info!(cmd = %cmd_line, "executing command");

    let mut command = Command::new(&program);
    command
      .args(&args)
      .envs(&spec.env)
      .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    // Own process group, so a timeout reaches every descendant.
    #[cfg(unix)]
    command.process_group(0);

    if let Some(cwd) = &spec.cwd {
      command.current_dir(cwd);
    }

    debug!(program = %program, working_dir = ?spec.cwd, "spawning process");

    let mut child = command.spawn().map_err(|source| match source.kind() {
      std::io::ErrorKind::NotFound => ExecError::NotFound {
        program: program.clone(),
      },
      _ => ExecError::Spawn {
        program: program.clone(),
        source,
      },
    })?;

    let pid = child.id();
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let input = spec.stdin.clone();
    let wait = async move {
      let (fed, out, err) = tokio::join!(
        feed_stdin(stdin, input),
        collect_lines(stdout, &program),
        collect_lines(stderr, &program)
      );
      let status = child.wait().await?;
      fed?;
      Ok::<_, std::io::Error>((status, out?, err?))
    };
    let mut wait = std::pin::pin!(wait);

    let (status, stdout, stderr) = match self.timeout {
      Some(limit) => tokio::select! {
        result = &mut wait => result?,
        _ = tokio::time::sleep(limit) => {
          warn!(cmd = %cmd_line, secs = limit.as_secs(), "command timed out, terminating process group");
          terminate_group(pid, &mut wait).await;
          return Err(ExecError::TimedOut {
            cmd: cmd_line,
            secs: limit.as_secs(),
          });
        }
      },
      None => wait.await?,
    };

    if !status.success() {
      return Err(ExecError::Failed {
        cmd: cmd_line,
        code: status.code(),
        stderr_tail: tail_lines(&stderr, STDERR_TAIL_LINES),
      });
    }

    Ok(CommandOutput { stdout, stderr })
  }
}

/// Grace period between SIGTERM and SIGKILL for a timed-out process group.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Write the stdin payload, then close the pipe.
///
/// Runs alongside the output readers so a child echoing its input back
/// cannot fill both pipes. A child that exits without reading is not an error.
async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<String>) -> std::io::Result<()> {
  let (Some(mut stdin), Some(input)) = (stdin, input) else {
    return Ok(());
  };

  let result = async {
    stdin.write_all(input.as_bytes()).await?;
    stdin.shutdown().await
  }
  .await;

  match result {
    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
    other => other,
  }
}

/// Stop a timed-out command and everything it started.
///
/// SIGTERM goes first so `sudo` can relay it to the root-owned command it
/// runs; whatever is left after the grace period gets SIGKILL.
async fn terminate_group<F>(pid: Option<u32>, wait: &mut std::pin::Pin<&mut F>)
where
  F: Future,
{
  signal_group(pid, GroupSignal::Terminate);
  if tokio::time::timeout(KILL_GRACE, wait.as_mut()).await.is_err() {
    signal_group(pid, GroupSignal::Kill);
  }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
  Terminate,
  Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: GroupSignal) {
  use rustix::process::{Pid, Signal, kill_process_group};

  let Some(pgid) = pid.and_then(|pid| i32::try_from(pid).ok()).and_then(Pid::from_raw) else {
    return;
  };
  let signal = match signal {
    GroupSignal::Terminate => Signal::TERM,
    GroupSignal::Kill => Signal::KILL,
  };
  if let Err(e) = kill_process_group(pgid, signal) {
    debug!(pgid = pgid.as_raw_pid(), error = %e, "could not signal process group");
  }
}

#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: GroupSignal) {}

/// Read a child stream to the end, logging each line as it arrives.
async fn collect_lines<R>(reader: Option<R>, program: &str) -> std::io::Result<String>
where
  R: AsyncRead + Unpin,
{
  let Some(reader) = reader else {
    return Ok(String::new());
  };

  let mut reader = BufReader::new(reader);
  let mut collected = String::new();
  let mut buf = Vec::new();

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }
    let line = String::from_utf8_lossy(&buf);
    let line = line.trim_end_matches(['\n', '\r']);
    info!(target: "stagehand::output", program = %program, "{}", line);
    collected.push_str(line);
    collected.push('\n');
  }

  Ok(collected)
}

type FailurePredicate = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

/// Records command specs instead of executing them.
///
/// Backs `plan` and `--dry-run`, and doubles as a scripted runner in tests:
/// canned stdout can be attached per program and selected commands can be
/// made to fail.
pub struct RecordingRunner {
  elevated: bool,
  calls: Mutex<Vec<CommandSpec>>,
  responses: Vec<(String, String)>,
  fail_when: Option<FailurePredicate>,
}

impl Default for RecordingRunner {
  fn default() -> Self {
    Self::new(false)
  }
}

impl RecordingRunner {
  pub fn new(elevated: bool) -> Self {
    Self {
      elevated,
      calls: Mutex::new(Vec::new()),
      responses: Vec::new(),
      fail_when: None,
    }
  }

  /// Return `stdout` for every command running `program`.
  pub fn respond(mut self, program: impl Into<String>, stdout: impl Into<String>) -> Self {
    self.responses.push((program.into(), stdout.into()));
    self
  }

  /// Fail every command matching `predicate` with exit code 1.
  pub fn fail_when<F>(mut self, predicate: F) -> Self
  where
    F: Fn(&CommandSpec) -> bool + Send + Sync + 'static,
  {
    self.fail_when = Some(Box::new(predicate));
    self
  }

  /// Commands recorded so far, in execution order.
  pub fn calls(&self) -> Vec<CommandSpec> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }

  /// Recorded commands rendered as command lines.
  pub fn command_lines(&self) -> Vec<String> {
    self
      .calls()
      .iter()
      .map(|spec| spec.command_line(self.elevated))
      .collect()
  }

  /// Drain recorded commands.
  pub fn take_calls(&self) -> Vec<CommandSpec> {
    self
      .calls
      .lock()
      .map(|mut calls| std::mem::take(&mut *calls))
      .unwrap_or_default()
  }
}

impl Runner for RecordingRunner {
  fn elevated(&self) -> bool {
    self.elevated
  }

  async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
    let cmd_line = spec.command_line(self.elevated);
    debug!(cmd = %cmd_line, "recording command");

    if let Ok(mut calls) = self.calls.lock() {
      calls.push(spec.clone());
    }

    if self.fail_when.as_ref().is_some_and(|predicate| predicate(spec)) {
      return Err(ExecError::Failed {
        cmd: cmd_line,
        code: Some(1),
        stderr_tail: String::new(),
      });
    }

    let stdout = self
      .responses
      .iter()
      .find(|(program, _)| *program == spec.program)
      .map(|(_, stdout)| stdout.clone())
      .unwrap_or_default();

    Ok(CommandOutput {
      stdout,
      stderr: String::new(),
    })
  }
}
