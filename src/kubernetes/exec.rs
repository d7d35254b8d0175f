//! Remote command execution in the gadget pod
//!
//! Runs `/bin/sh -c <command>` in the gadget container over the kube
//! websocket exec channel and drains stdout/stderr into caller sinks.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams};
use tokio::io::AsyncWrite;

use super::client::{build_client, PodLister};
use super::config::{apply_exec_defaults, resolve_config};
use super::locator::locate_gadget_pod;
use super::{GADGET_CONTAINER, GADGET_NAMESPACE, SHELL_WRAPPER};
use crate::config::RemoteConfig;
use crate::error::{RemoteError, StreamError};

/// Output sink for one of the remote process streams
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// A single shell command to run in a located gadget pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub command: String,
}

impl ExecRequest {
    /// Request targeting the gadget container of `pod`
    pub fn new(pod: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            namespace: GADGET_NAMESPACE.to_string(),
            pod: pod.into(),
            container: GADGET_CONTAINER.to_string(),
            command: command.into(),
        }
    }

    /// Full argv: the shell wrapper followed by the command string
    pub fn argv(&self) -> Vec<String> {
        SHELL_WRAPPER
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(self.command.clone()))
            .collect()
    }

    /// Attach parameters: no stdin, no tty, stdout and stderr captured
    pub fn attach_params(&self) -> AttachParams {
        AttachParams::default()
            .container(self.container.clone())
            .stdin(false)
            .stdout(true)
            .stderr(true)
            .tty(false)
    }
}

/// Streams an [`ExecRequest`] and writes the process output to the sinks
#[async_trait]
pub trait ExecTransport: Send + Sync {
    async fn stream(
        &self,
        request: &ExecRequest,
        stdout: &mut (dyn AsyncWrite + Unpin + Send),
        stderr: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), RemoteError>;
}

/// Exec transport over the cluster API.
///
/// Every call resolves credentials and opens a new connection.
#[derive(Debug, Clone)]
pub struct KubeExecTransport {
    remote: RemoteConfig,
}

impl KubeExecTransport {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl ExecTransport for KubeExecTransport {
    async fn stream(
        &self,
        request: &ExecRequest,
        stdout: &mut (dyn AsyncWrite + Unpin + Send),
        stderr: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), RemoteError> {
        let mut config = resolve_config(&self.remote).await?;
        apply_exec_defaults(&mut config);
        let client = build_client(config)?;

        let pods: Api<Pod> = Api::namespaced(client, &request.namespace);
        let mut attached = pods
            .exec(&request.pod, request.argv(), &request.attach_params())
            .await
            .map_err(StreamError::Kube)?;

        let status = attached.take_status();
        {
            let mut out = attached
                .stdout()
                .ok_or(StreamError::NotAttached("stdout"))?;
            let mut err = attached
                .stderr()
                .ok_or(StreamError::NotAttached("stderr"))?;

            let (out_bytes, err_bytes) = tokio::try_join!(
                tokio::io::copy(&mut out, &mut *stdout),
                tokio::io::copy(&mut err, &mut *stderr),
            )?;
            tracing::debug!(pod = %request.pod, out_bytes, err_bytes, "Exec streams drained");
        }

        let status = match status {
            Some(status) => status.await,
            None => None,
        };

        attached
            .join()
            .await
            .map_err(|e| StreamError::Channel(Box::new(e)))?;

        check_status(status)
    }
}

/// Map the final exec status onto a result.
///
/// A missing status or anything other than `Failure` counts as success.
pub fn check_status(status: Option<Status>) -> Result<(), RemoteError> {
    let Some(status) = status else {
        return Ok(());
    };

    if status.status.as_deref() != Some("Failure") {
        return Ok(());
    }

    let exit_code = status
        .details
        .as_ref()
        .and_then(|d| d.causes.as_ref())
        .and_then(|causes| {
            causes
                .iter()
                .find(|c| c.reason.as_deref() == Some("ExitCode"))
                .and_then(|c| c.message.as_deref())
                .and_then(|m| m.trim().parse().ok())
        });

    Err(RemoteError::CommandFailed {
        exit_code,
        message: status.message.unwrap_or_default(),
    })
}

/// Output captured from a remote command.
///
/// Output is kept even when `error` is set.
#[derive(Debug)]
pub struct ExecCapture {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<RemoteError>,
}

impl ExecCapture {
    pub fn into_result(self) -> Result<(String, String), RemoteError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.stdout, self.stderr)),
        }
    }

    /// Error text (if any), then stdout, then stderr
    pub fn combined(&self) -> String {
        let mut text = self
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }
}

/// Runs shell commands in the gadget pod of a node
pub struct RemoteExecutor<T = KubeExecTransport> {
    transport: T,
}

impl RemoteExecutor<KubeExecTransport> {
    pub fn new(remote: RemoteConfig) -> Self {
        Self::with_transport(KubeExecTransport::new(remote))
    }
}

impl<T: ExecTransport> RemoteExecutor<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `command` in the gadget pod on `node`, writing its output to the sinks.
    ///
    /// Lookup errors are returned before anything is executed.
    pub async fn execute<L>(
        &self,
        client: &L,
        node: &str,
        command: &str,
        stdout: Sink<'_>,
        stderr: Sink<'_>,
    ) -> Result<(), RemoteError>
    where
        L: PodLister + ?Sized,
    {
        let pod = locate_gadget_pod(client, node).await?;
        let request = ExecRequest::new(pod, command);

        tracing::info!(node, pod = %request.pod, command, "Executing in gadget pod");
        let start = std::time::Instant::now();
        let result = self.transport.stream(&request, stdout, stderr).await;

        match &result {
            Ok(()) => tracing::debug!(pod = %request.pod, "Exec finished in {:?}", start.elapsed()),
            Err(e) => tracing::warn!(pod = %request.pod, error = %e, "Exec failed"),
        }
        result
    }

    /// Run `command` and capture both streams into strings
    pub async fn capture<L>(&self, client: &L, node: &str, command: &str) -> ExecCapture
    where
        L: PodLister + ?Sized,
    {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let error = self
            .execute(client, node, command, &mut stdout, &mut stderr)
            .await
            .err();

        ExecCapture {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            error,
        }
    }

    /// Run `command` and return error text and output as one string
    pub async fn simple<L>(&self, client: &L, node: &str, command: &str) -> String
    where
        L: PodLister + ?Sized,
    {
        self.capture(client, node, command).await.combined()
    }
}
