//! Kubernetes integration module
//!
//! Locates the gadget agent pod on a node, runs shell commands inside it,
//! and copies files into it.

pub mod config;
pub mod client;
pub mod locator;
pub mod exec;
pub mod copy;

/// Namespace the gadget daemonset runs in
pub const GADGET_NAMESPACE: &str = "kube-system";

/// Label carried by every gadget pod
pub const GADGET_LABEL_SELECTOR: &str = "k8s-app=gadget";

/// Container inside the gadget pod that commands run in
pub const GADGET_CONTAINER: &str = "gadget";

/// Shell wrapper; the command string is appended as the third argument
pub const SHELL_WRAPPER: [&str; 2] = ["/bin/sh", "-c"];

/// Tool invoked for `cp` into the pod
pub const DEFAULT_COPY_TOOL: &str = "kubectl";

pub use config::{apply_exec_defaults, resolve_config, CredentialError};
pub use client::{build_client, KubeClient, PodLister};
pub use locator::{gadget_pod_params, locate_gadget_pod};
pub use exec::{ExecCapture, ExecRequest, ExecTransport, KubeExecTransport, RemoteExecutor, Sink};
pub use copy::{
    shell_quote, CopyCommand, CopyError, CopyExecutor, CopyOutcome, RemoteCopier, ShellCopyExecutor,
};
