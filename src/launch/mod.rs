//! Process launching and diagnostics sinks.
//!
//! Everything the engine does against a backend tool goes through
//! [`ProcessLauncher`] as a [`CommandInvocation`]; human-readable output
//! goes through [`Listener`]. Both are trait objects so tests and callers
//! can substitute their own.

use crate::error::{BurrowError, BurrowResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// One subprocess invocation: discrete argv elements plus optional
/// environment and working directory.
///
/// Arguments are always passed as separate list elements; nothing here is
/// ever concatenated into a single shell string.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    echo: bool,
}

impl CommandInvocation {
    /// Start a new invocation from a program and leading arguments.
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            cwd: None,
            echo: true,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set extra environment variables for the child process.
    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set the working directory for the child process.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Capture output without echoing it to the listener.
    ///
    /// Used for probes whose output is inspected, not shown.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// The argv elements of this invocation.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Loggable single-line rendering of the invocation.
    pub fn display(&self) -> String {
        self.args.join(" ")
    }
}

/// Outcome of a completed subprocess: exit code plus captured output.
///
/// A non-zero exit code is a normal result, not an error; only a failure
/// to launch the process at all surfaces as [`BurrowError`].
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Sink for human-readable build diagnostics.
///
/// Every fatal condition in the engine produces at least one `fatal` line
/// before the operation reports failure.
pub trait Listener: Send + Sync {
    /// Emit a plain log line.
    fn log(&self, line: &str);

    /// Emit a fatal diagnostic.
    fn fatal(&self, line: &str);
}

/// Listener printing to the invoking terminal.
pub struct ConsoleListener;

impl Listener for ConsoleListener {
    fn log(&self, line: &str) {
        println!("{line}");
    }

    fn fatal(&self, line: &str) {
        eprintln!("{} {}", console::style("FATAL:").red().bold(), line);
    }
}

/// Abstract subprocess execution seam.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Run the invocation to completion and return its result.
    async fn launch(&self, invocation: &CommandInvocation) -> BurrowResult<CommandResult>;
}

/// Launcher running commands on the local node with `tokio::process`.
///
/// Streams child output line by line to the listener while collecting it
/// for the caller, unless the invocation asked to stay quiet.
pub struct LocalLauncher {
    listener: std::sync::Arc<dyn Listener>,
}

impl LocalLauncher {
    pub fn new(listener: std::sync::Arc<dyn Listener>) -> Self {
        Self { listener }
    }
}

#[async_trait]
impl ProcessLauncher for LocalLauncher {
    async fn launch(&self, invocation: &CommandInvocation) -> BurrowResult<CommandResult> {
        let argv = invocation.argv();
        if argv.is_empty() {
            return Err(BurrowError::Internal("empty command invocation".to_string()));
        }
        debug!("Executing: {}", invocation.display());

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &invocation.env {
            cmd.env(k, v);
        }
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| BurrowError::command_failed(invocation.display(), e))?;

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");
        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();

        let mut stdout_lines = Vec::new();
        let mut stderr_lines = Vec::new();
        let mut stdout_done = false;
        let mut stderr_done = false;

        while !stdout_done || !stderr_done {
            tokio::select! {
                line = stdout_reader.next_line(), if !stdout_done => {
                    match line {
                        Ok(Some(line)) => {
                            if invocation.echo {
                                self.listener.log(&line);
                            }
                            stdout_lines.push(line);
                        }
                        _ => stdout_done = true,
                    }
                }
                line = stderr_reader.next_line(), if !stderr_done => {
                    match line {
                        Ok(Some(line)) => {
                            if invocation.echo {
                                self.listener.log(&line);
                            }
                            stderr_lines.push(line);
                        }
                        _ => stderr_done = true,
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| BurrowError::command_failed(invocation.display(), e))?;

        Ok(CommandResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: stdout_lines.join("\n"),
            stderr: stderr_lines.join("\n"),
        })
    }
}

/// Identity of the invoking host user, probed through the launcher so it
/// reflects the node the commands actually run on.
#[derive(Debug, Clone)]
pub struct HostUser {
    pub name: String,
    pub group: String,
    pub uid: u32,
    pub gid: u32,
}

impl HostUser {
    /// Query user name, group name and numeric ids via `id`.
    pub async fn probe(launcher: &dyn ProcessLauncher) -> BurrowResult<Self> {
        let name = Self::query(launcher, &["id", "-un"]).await?;
        let group = Self::query(launcher, &["id", "-gn", &name]).await?;
        let uid = Self::query(launcher, &["id", "-u", &name])
            .await?
            .parse::<u32>()
            .map_err(|e| BurrowError::HostUserProbe(format!("unparsable uid: {e}")))?;
        let gid = Self::query(launcher, &["id", "-g", &name])
            .await?
            .parse::<u32>()
            .map_err(|e| BurrowError::HostUserProbe(format!("unparsable gid: {e}")))?;
        Ok(Self {
            name,
            group,
            uid,
            gid,
        })
    }

    async fn query(launcher: &dyn ProcessLauncher, args: &[&str]) -> BurrowResult<String> {
        let result = launcher
            .launch(&CommandInvocation::new(args.iter().copied()).quiet())
            .await?;
        if !result.success() {
            return Err(BurrowError::HostUserProbe(format!(
                "'{}' exited with {}",
                args.join(" "),
                result.exit_code
            )));
        }
        Ok(result.stdout.trim().to_string())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared test doubles for launcher and listener seams.

    use super::*;
    use std::sync::Mutex;

    type Responder = dyn Fn(&CommandInvocation) -> CommandResult + Send + Sync;

    /// Launcher answering from a closure while recording every invocation.
    pub struct ScriptedLauncher {
        pub invocations: Mutex<Vec<CommandInvocation>>,
        respond: Box<Responder>,
    }

    impl ScriptedLauncher {
        pub fn new(
            respond: impl Fn(&CommandInvocation) -> CommandResult + Send + Sync + 'static,
        ) -> Self {
            Self {
                invocations: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }
        }

        /// Launcher that reports success with empty output for everything.
        pub fn succeeding() -> Self {
            Self::new(|_| ok())
        }

        pub fn recorded(&self) -> Vec<Vec<String>> {
            self.invocations
                .lock()
                .unwrap()
                .iter()
                .map(|inv| inv.argv().to_vec())
                .collect()
        }
    }

    #[async_trait]
    impl ProcessLauncher for ScriptedLauncher {
        async fn launch(&self, invocation: &CommandInvocation) -> BurrowResult<CommandResult> {
            self.invocations.lock().unwrap().push(invocation.clone());
            Ok((self.respond)(invocation))
        }
    }

    /// Launcher whose every launch fails at the spawn stage.
    pub struct ErroringLauncher;

    #[async_trait]
    impl ProcessLauncher for ErroringLauncher {
        async fn launch(&self, invocation: &CommandInvocation) -> BurrowResult<CommandResult> {
            Err(BurrowError::command_failed(
                invocation.display(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "tool missing"),
            ))
        }
    }

    /// Listener collecting lines for assertions.
    #[derive(Default)]
    pub struct RecordingListener {
        pub lines: Mutex<Vec<String>>,
        pub fatals: Mutex<Vec<String>>,
    }

    impl Listener for RecordingListener {
        fn log(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn fatal(&self, line: &str) {
            self.fatals.lock().unwrap().push(line.to_string());
        }
    }

    pub fn ok() -> CommandResult {
        with_exit(0)
    }

    pub fn with_exit(code: i32) -> CommandResult {
        CommandResult {
            exit_code: code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn with_stdout(stdout: &str) -> CommandResult {
        CommandResult {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// `id` answers for a fixed host user, or `None` to fall through.
    pub fn host_user_responses(inv: &CommandInvocation) -> Option<CommandResult> {
        let argv = inv.argv();
        if argv.first().map(String::as_str) != Some("id") {
            return None;
        }
        Some(match argv[1].as_str() {
            "-un" => with_stdout("builder\n"),
            "-gn" => with_stdout("builders\n"),
            "-u" => with_stdout("1000\n"),
            "-g" => with_stdout("1000\n"),
            _ => with_exit(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn invocation_keeps_arguments_discrete() {
        let inv = CommandInvocation::new(["sudo", "/usr/sbin/cowbuilder"])
            .arg("--extrapackages")
            .arg("gcc make libfoo dev");
        assert_eq!(inv.argv().len(), 4);
        assert_eq!(inv.argv()[3], "gcc make libfoo dev");
    }

    #[tokio::test]
    async fn local_launcher_captures_exit_code_and_output() {
        let launcher = LocalLauncher::new(Arc::new(RecordingListener::default()));
        let result = launcher
            .launch(&CommandInvocation::new(["sh", "-c", "echo out; echo err >&2; exit 3"]).quiet())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
    }

    #[tokio::test]
    async fn local_launcher_echoes_to_listener() {
        let listener = Arc::new(RecordingListener::default());
        let launcher = LocalLauncher::new(listener.clone());
        launcher
            .launch(&CommandInvocation::new(["sh", "-c", "echo visible"]))
            .await
            .unwrap();
        assert_eq!(listener.lines.lock().unwrap().as_slice(), ["visible"]);
    }

    #[tokio::test]
    async fn local_launcher_spawn_failure_is_error() {
        let launcher = LocalLauncher::new(Arc::new(RecordingListener::default()));
        let err = launcher
            .launch(&CommandInvocation::new(["/nonexistent/burrow-tool"]).quiet())
            .await
            .unwrap_err();
        assert!(matches!(err, BurrowError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn host_user_probe_parses_ids() {
        let launcher =
            ScriptedLauncher::new(|inv| host_user_responses(inv).unwrap_or_else(|| with_exit(1)));
        let user = HostUser::probe(&launcher).await.unwrap();
        assert_eq!(user.name, "builder");
        assert_eq!(user.group, "builders");
        assert_eq!(user.uid, 1000);
        assert_eq!(user.gid, 1000);
    }

    #[tokio::test]
    async fn host_user_probe_fails_on_nonzero_exit() {
        let launcher = ScriptedLauncher::new(|_| with_exit(1));
        assert!(matches!(
            HostUser::probe(&launcher).await,
            Err(BurrowError::HostUserProbe(_))
        ));
    }
}
