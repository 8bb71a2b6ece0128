//! Types for external command execution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Privilege-elevation wrapper used for privileged commands.
pub(crate) const SUDO: &str = "sudo";

/// Number of trailing stderr lines kept on a failed command.
pub(crate) const STDERR_TAIL_LINES: usize = 20;

/// Errors that can occur while executing an external command.
#[derive(Debug, Error)]
pub enum ExecError {
  /// The program does not exist on PATH (or at the given path).
  #[error("command not found: {program}")]
  NotFound { program: String },

  /// The program exists but could not be started.
  #[error("failed to spawn {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed {
    cmd: String,
    code: Option<i32>,
    /// Last lines written to stderr, for diagnostics.
    stderr_tail: String,
  },

  /// Command exceeded the configured timeout and was killed.
  #[error("command timed out after {secs}s: {cmd}")]
  TimedOut { cmd: String, secs: u64 },

  /// I/O error while talking to the child process.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  /// First non-empty line of stdout, falling back to stderr.
  ///
  /// Some tools print their version banner on stderr.
  pub fn first_line(&self) -> Option<&str> {
    self
      .stdout
      .lines()
      .chain(self.stderr.lines())
      .map(str::trim)
      .find(|line| !line.is_empty())
  }
}

/// One external command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: Option<PathBuf>,
  /// Extra environment variables on top of the inherited environment.
  pub env: BTreeMap<String, String>,
  /// Payload written to the child's stdin.
  pub stdin: Option<String>,
  /// Run through the privilege-elevation wrapper unless already elevated.
  pub privileged: bool,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  pub fn stdin(mut self, input: impl Into<String>) -> Self {
    self.stdin = Some(input.into());
    self
  }

  pub fn privileged(mut self) -> Self {
    self.privileged = true;
    self
  }

  /// True when this spec runs `program` with `first_arg` as its first argument.
  pub fn is(&self, program: &str, first_arg: &str) -> bool {
    self.program == program && self.args.first().is_some_and(|a| a == first_arg)
  }

  /// Program and arguments actually executed.
  ///
  /// Privileged commands are prefixed with `sudo` when the current process is
  /// not elevated. `sudo` resets the environment, so extra variables are set
  /// through `sudo env KEY=VALUE program`.
  pub fn argv(&self, elevated: bool) -> (String, Vec<String>) {
    if !self.privileged || elevated {
      return (self.program.clone(), self.args.clone());
    }

    let mut args = Vec::with_capacity(self.env.len() + self.args.len() + 2);
    if !self.env.is_empty() {
      args.push("env".to_string());
      args.extend(self.env.iter().map(|(k, v)| format!("{}={}", k, v)));
    }
    args.push(self.program.clone());
    args.extend(self.args.iter().cloned());
    (SUDO.to_string(), args)
  }

  /// Shell-style rendering of the executed command line, for logs and plans.
  pub fn command_line(&self, elevated: bool) -> String {
    let (program, args) = self.argv(elevated);
    std::iter::once(program)
      .chain(args)
      .map(|word| shell_quote(&word))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Quote a word for display in a POSIX shell command line.
pub(crate) fn shell_quote(word: &str) -> String {
  let plain = !word.is_empty()
    && word
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':' | '+' | ',' | '@' | '~'));

  if plain {
    word.to_string()
  } else {
    format!("'{}'", word.replace('\'', r"'\''"))
  }
}

/// Keep the last `max` lines of `text`.
pub(crate) fn tail_lines(text: &str, max: usize) -> String {
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(max);
  lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn argv_unprivileged_is_unchanged() {
    let spec = CommandSpec::new("git").args(["checkout", "Version-3.9.3"]);
    let (program, args) = spec.argv(false);
    assert_eq!(program, "git");
    assert_eq!(args, vec!["checkout", "Version-3.9.3"]);
  }

  #[test]
  fn argv_privileged_wraps_in_sudo() {
    let spec = CommandSpec::new("modprobe").arg("snd-dummy").privileged();
    let (program, args) = spec.argv(false);
    assert_eq!(program, "sudo");
    assert_eq!(args, vec!["modprobe", "snd-dummy"]);
  }

  #[test]
  fn argv_privileged_when_elevated_skips_sudo() {
    let spec = CommandSpec::new("modprobe").arg("snd-dummy").privileged();
    assert_eq!(spec.argv(true).0, "modprobe");
  }

  #[test]
  fn argv_privileged_passes_env_through_sudo() {
    let spec = CommandSpec::new("apt-get")
      .args(["install", "-y", "cmake"])
      .env("DEBIAN_FRONTEND", "noninteractive")
      .privileged();
    let (program, args) = spec.argv(false);
    assert_eq!(program, "sudo");
    assert_eq!(args[..3], ["env", "DEBIAN_FRONTEND=noninteractive", "apt-get"]);
    assert_eq!(args[3..], ["install", "-y", "cmake"]);
  }

  #[test]
  fn command_line_quotes_special_words() {
    let spec = CommandSpec::new("python").args(["-c", "print('hi')"]);
    assert_eq!(spec.command_line(false), r"python -c 'print('\''hi'\'')'");
  }

  #[test]
  fn command_line_leaves_plain_words() {
    let spec = CommandSpec::new("make").arg("-j4");
    assert_eq!(spec.command_line(false), "make -j4");
  }

  #[test]
  fn is_matches_program_and_first_arg() {
    let spec = CommandSpec::new("git").args(["checkout", "x"]);
    assert!(spec.is("git", "checkout"));
    assert!(!spec.is("git", "clone"));
    assert!(!CommandSpec::new("git").is("git", "checkout"));
  }

  #[test]
  fn first_line_skips_blank_lines_and_falls_back_to_stderr() {
    let output = CommandOutput {
      stdout: "\n  \n".to_string(),
      stderr: "scsynth 3.9.3 (Built from tag 'Version-3.9.3')\n".to_string(),
    };
    assert_eq!(output.first_line(), Some("scsynth 3.9.3 (Built from tag 'Version-3.9.3')"));
    assert_eq!(CommandOutput::default().first_line(), None);
  }

  #[test]
  fn tail_lines_keeps_last_lines() {
    assert_eq!(tail_lines("a\nb\nc\n", 2), "b\nc");
    assert_eq!(tail_lines("a", 5), "a");
    assert_eq!(tail_lines("", 5), "");
  }
}
