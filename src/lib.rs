pub mod config;
pub mod error;
pub mod kubernetes;

pub use config::{ConfigError, RemoteConfig};
pub use error::{RemoteError, StreamError};
pub use kubernetes::{
    CopyOutcome, ExecCapture, KubeClient, PodLister, RemoteCopier, RemoteExecutor,
};
