//! Errors surfaced by the pod locator and remote executor

use thiserror::Error;

use crate::kubernetes::config::CredentialError;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("No running gadget pod found on node {node}")]
    NotFound { node: String },

    #[error("Found {count} running gadget pods on node {node}, expected exactly one")]
    AmbiguousMatch { node: String, count: usize },

    #[error("Failed to list pods: {0}")]
    PodList(#[source] kube::Error),

    #[error("Failed to resolve cluster config: {0}")]
    ConfigResolution(#[from] CredentialError),

    #[error("Failed to create client: {0}")]
    TransportConstruction(#[source] kube::Error),

    #[error("Remote stream failed: {0}")]
    Stream(#[from] StreamError),

    #[error("Remote command failed (exit code {}): {message}", display_code(.exit_code))]
    CommandFailed {
        exit_code: Option<i32>,
        message: String,
    },
}

/// Failure of the exec channel itself, as opposed to the remote command
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Kube error: {0}")]
    Kube(#[from] kube::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Exec channel error: {0}")]
    Channel(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("{0} not attached")]
    NotAttached(&'static str),
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl RemoteError {
    /// True when the pod lookup itself failed, before anything was executed
    pub fn is_locate_error(&self) -> bool {
        matches!(
            self,
            RemoteError::NotFound { .. } | RemoteError::AmbiguousMatch { .. } | RemoteError::PodList(_)
        )
    }

    /// Exit code of the remote command, if it ran and reported one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RemoteError::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Stream(StreamError::Io(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_messages() {
        let err = RemoteError::NotFound {
            node: "node-1".to_string(),
        };
        assert_eq!(err.to_string(), "No running gadget pod found on node node-1");
        assert!(err.is_locate_error());

        let err = RemoteError::AmbiguousMatch {
            node: "node-1".to_string(),
            count: 2,
        };
        assert!(err.to_string().contains("Found 2 running gadget pods"));
        assert!(err.is_locate_error());
    }

    #[test]
    fn test_command_failed_exit_code() {
        let err = RemoteError::CommandFailed {
            exit_code: Some(3),
            message: "command terminated with non-zero exit code".to_string(),
        };
        assert_eq!(err.exit_code(), Some(3));
        assert!(err.to_string().contains("exit code 3"));
        assert!(!err.is_locate_error());

        let err = RemoteError::CommandFailed {
            exit_code: None,
            message: "killed".to_string(),
        };
        assert!(err.to_string().contains("exit code unknown"));
    }

    #[test]
    fn test_io_error_is_stream_failure() {
        let err: RemoteError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        match &err {
            RemoteError::Stream(StreamError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe)
            }
            other => panic!("Expected Stream(Io), got {:?}", other),
        }
        assert_eq!(err.exit_code(), None);
        assert_eq!(err.to_string(), "Remote stream failed: IO error: pipe");
    }

    #[test]
    fn test_stream_error_keeps_source_chain() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RemoteError::from(StreamError::Channel(Box::new(inner)));

        let stream = err.source().expect("stream error source");
        let channel = stream.source().expect("channel error source");
        let io = channel
            .downcast_ref::<std::io::Error>()
            .expect("io error preserved");
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
    }
}
