//! Test utilities for gadget-remote
//!
//! In-memory cluster, local-shell exec transport and a recording copy
//! executor, so the locator, executor and copier can be exercised
//! without a live cluster.

#![allow(dead_code)]

use async_trait::async_trait;
use gadget_remote::kubernetes::{
    CopyError, CopyExecutor, ExecRequest, ExecTransport, PodLister,
};
use gadget_remote::{RemoteError, StreamError};
use k8s_openapi::api::core::v1::{Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Create a pod with the given labels, node and phase
pub fn create_pod(
    name: &str,
    namespace: &str,
    labels: &[(&str, &str)],
    node: &str,
    phase: &str,
) -> Pod {
    let labels: BTreeMap<String, String> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some(node.to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

/// Create a running gadget pod on `node`
pub fn create_gadget_pod(name: &str, node: &str) -> Pod {
    create_pod(name, "kube-system", &[("k8s-app", "gadget")], node, "Running")
}

/// In-memory cluster that evaluates equality label and field selectors
pub struct FakeCluster {
    pods: Mutex<Vec<Pod>>,
    list_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new(pods: Vec<Pod>) -> Self {
        Self {
            pods: Mutex::new(pods),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn add_pod(&self, pod: Pod) {
        self.pods.lock().unwrap().push(pod);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn field_value(pod: &Pod, field: &str) -> Option<String> {
        match field {
            "metadata.name" => pod.metadata.name.clone(),
            "metadata.namespace" => pod.metadata.namespace.clone(),
            "spec.nodeName" => pod.spec.as_ref().and_then(|s| s.node_name.clone()),
            "status.phase" => pod.status.as_ref().and_then(|s| s.phase.clone()),
            _ => None,
        }
    }

    fn matches_selector<F>(selector: Option<&str>, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(selector) = selector else {
            return true;
        };
        selector
            .split(',')
            .filter(|term| !term.is_empty())
            .all(|term| match term.split_once('=') {
                Some((key, value)) => lookup(key).as_deref() == Some(value),
                None => false,
            })
    }
}

#[async_trait]
impl PodLister for FakeCluster {
    async fn list_pods(&self, namespace: &str, params: &ListParams) -> Result<Vec<Pod>, kube::Error> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let pods = self.pods.lock().unwrap();
        Ok(pods
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .filter(|pod| {
                Self::matches_selector(params.label_selector.as_deref(), |key| {
                    pod.metadata.labels.as_ref().and_then(|l| l.get(key).cloned())
                })
            })
            .filter(|pod| {
                Self::matches_selector(params.field_selector.as_deref(), |key| {
                    Self::field_value(pod, key)
                })
            })
            .cloned()
            .collect())
    }
}

/// Exec transport that runs the request's argv on the test host
#[derive(Default)]
pub struct LocalShellTransport {
    requests: Mutex<Vec<ExecRequest>>,
}

impl LocalShellTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ExecRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecTransport for LocalShellTransport {
    async fn stream(
        &self,
        request: &ExecRequest,
        stdout: &mut (dyn AsyncWrite + Unpin + Send),
        stderr: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), RemoteError> {
        self.requests.lock().unwrap().push(request.clone());

        let argv = request.argv();
        let output = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .await?;

        stdout.write_all(&output.stdout).await?;
        stderr.write_all(&output.stderr).await?;

        if !output.status.success() {
            return Err(RemoteError::CommandFailed {
                exit_code: output.status.code(),
                message: "command terminated with non-zero exit code".to_string(),
            });
        }
        Ok(())
    }
}

/// Exec transport that writes partial output and then drops the stream
pub struct BrokenStreamTransport {
    pub partial_stdout: &'static str,
    pub partial_stderr: &'static str,
}

#[async_trait]
impl ExecTransport for BrokenStreamTransport {
    async fn stream(
        &self,
        _request: &ExecRequest,
        stdout: &mut (dyn AsyncWrite + Unpin + Send),
        stderr: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<(), RemoteError> {
        stdout.write_all(self.partial_stdout.as_bytes()).await?;
        stderr.write_all(self.partial_stderr.as_bytes()).await?;
        Err(RemoteError::Stream(StreamError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))))
    }
}

/// Ordered record of echoed lines and executor runs
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Writer that logs each complete line as `echo: <line>`
    pub fn writer(&self) -> EchoWriter {
        EchoWriter {
            log: self.clone(),
            pending: Vec::new(),
        }
    }
}

pub struct EchoWriter {
    log: EventLog,
    pending: Vec<u8>,
}

impl std::io::Write for EchoWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]).into_owned();
            self.log.push(format!("echo: {}", line));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Copy executor that records command lines instead of running them
#[derive(Default)]
pub struct RecordingCopyExecutor {
    commands: Mutex<Vec<String>>,
    fail_with: Option<&'static str>,
    log: Option<EventLog>,
}

impl RecordingCopyExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor whose runs fail as if the tool could not be spawned
    pub fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::default()
        }
    }

    /// Also log each run as `run: <line>`
    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CopyExecutor for RecordingCopyExecutor {
    async fn run(&self, command_line: &str) -> Result<(), CopyError> {
        self.commands.lock().unwrap().push(command_line.to_string());
        if let Some(log) = &self.log {
            log.push(format!("run: {}", command_line));
        }
        match self.fail_with {
            Some(message) => Err(CopyError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                message,
            ))),
            None => Ok(()),
        }
    }
}
