//! File copy into the gadget pod
//!
//! Delegates the transfer to an external `cp`-capable tool (kubectl by
//! default) run through the shell.

use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use thiserror::Error;
use tokio::process::Command;

use super::client::PodLister;
use super::locator::locate_gadget_pod;
use super::{GADGET_NAMESPACE, SHELL_WRAPPER};
use crate::config::RemoteConfig;

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("Failed to spawn copy command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Failed to wait for copy command: {0}")]
    Wait(#[source] std::io::Error),
    #[error("Copy command failed: {0}")]
    ExitStatus(ExitStatus),
}

/// Result of a copy into the gadget pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Failed { message: String },
}

impl CopyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CopyOutcome::Copied)
    }

    /// Failure description, empty on success
    pub fn message(&self) -> &str {
        match self {
            CopyOutcome::Copied => "",
            CopyOutcome::Failed { message } => message,
        }
    }
}

/// Quote `value` for `/bin/sh` unless it only holds characters the shell
/// passes through unchanged
pub fn shell_quote(value: &str) -> Cow<'_, str> {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if plain {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
    }
}

/// `<tool> [--kubeconfig=<path>] cp <source> kube-system/<pod>:<dest>`
///
/// The tool is emitted as-is; paths are shell-quoted when needed.
#[derive(Debug, Clone, Copy)]
pub struct CopyCommand<'a> {
    pub tool: &'a str,
    pub kubeconfig: Option<&'a Path>,
    pub source: &'a str,
    pub pod: &'a str,
    pub dest: &'a str,
}

impl fmt::Display for CopyCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool)?;
        if let Some(kubeconfig) = self.kubeconfig {
            write!(
                f,
                " --kubeconfig={}",
                shell_quote(&kubeconfig.to_string_lossy())
            )?;
        }
        let target = format!("{}/{}:{}", GADGET_NAMESPACE, self.pod, self.dest);
        write!(f, " cp {} {}", shell_quote(self.source), shell_quote(&target))
    }
}

/// Runs a fully built copy command line
#[async_trait]
pub trait CopyExecutor: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<(), CopyError>;
}

/// Runs the command line with `/bin/sh -c`, sharing this process's stdout and stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCopyExecutor;

#[async_trait]
impl CopyExecutor for ShellCopyExecutor {
    async fn run(&self, command_line: &str) -> Result<(), CopyError> {
        let mut child = Command::new(SHELL_WRAPPER[0])
            .arg(SHELL_WRAPPER[1])
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(CopyError::Spawn)?;

        let status = child.wait().await.map_err(CopyError::Wait)?;
        if !status.success() {
            return Err(CopyError::ExitStatus(status));
        }
        Ok(())
    }
}

/// Copies local files into the gadget pod of a node
pub struct RemoteCopier<C = ShellCopyExecutor> {
    remote: RemoteConfig,
    executor: C,
    echo: Mutex<Box<dyn Write + Send>>,
}

impl RemoteCopier<ShellCopyExecutor> {
    pub fn new(remote: RemoteConfig) -> Self {
        Self::with_executor(remote, ShellCopyExecutor)
    }
}

impl<C: CopyExecutor> RemoteCopier<C> {
    pub fn with_executor(remote: RemoteConfig, executor: C) -> Self {
        Self {
            remote,
            executor,
            echo: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Print command lines to `writer` instead of stdout
    pub fn with_echo(mut self, writer: impl Write + Send + 'static) -> Self {
        self.echo = Mutex::new(Box::new(writer));
        self
    }

    pub fn executor(&self) -> &C {
        &self.executor
    }

    /// Build the copy command for a located pod
    pub fn command_for<'a>(&'a self, pod: &'a str, source: &'a str, dest: &'a str) -> CopyCommand<'a> {
        CopyCommand {
            tool: &self.remote.copy_tool,
            kubeconfig: self.remote.kubeconfig.as_deref(),
            source,
            pod,
            dest,
        }
    }

    /// Copy `source` into the gadget pod on `node` at `dest`.
    ///
    /// The command line is written to the echo writer (stdout by default)
    /// before it is run. It goes through `/bin/sh -c`: paths are quoted,
    /// but the copy tool string is interpreted by the shell as written.
    pub async fn copy_into<L>(&self, client: &L, node: &str, source: &str, dest: &str) -> CopyOutcome
    where
        L: PodLister + ?Sized,
    {
        let pod = match locate_gadget_pod(client, node).await {
            Ok(pod) => pod,
            Err(e) => {
                return CopyOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        let command_line = self.command_for(&pod, source, dest).to_string();
        self.echo_line(&command_line);
        tracing::info!(node, pod = %pod, source, dest, "Copying into gadget pod");

        match self.executor.run(&command_line).await {
            Ok(()) => CopyOutcome::Copied,
            Err(e) => {
                tracing::warn!(pod = %pod, error = %e, "Copy failed");
                CopyOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl<C> RemoteCopier<C> {
    fn echo_line(&self, line: &str) {
        let mut echo = self.echo.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(echo, "{}", line).and_then(|_| echo.flush()) {
            tracing::warn!(error = %e, "Failed to print copy command");
        }
    }
}
