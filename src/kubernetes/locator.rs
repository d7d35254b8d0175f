//! Gadget pod lookup
//!
//! Finds the single running gadget pod scheduled on a node.

use kube::api::ListParams;

use super::client::PodLister;
use super::{GADGET_LABEL_SELECTOR, GADGET_NAMESPACE};
use crate::error::RemoteError;

/// List parameters matching running gadget pods on `node`
pub fn gadget_pod_params(node: &str) -> ListParams {
    ListParams::default()
        .labels(GADGET_LABEL_SELECTOR)
        .fields(&format!("spec.nodeName={},status.phase=Running", node))
}

/// Locate the gadget pod running on `node` and return its name.
///
/// Exactly one pod must match. Zero matches, or a single match without a
/// name, is `NotFound`; more than one is `AmbiguousMatch` and no pod is
/// picked. The lookup is never retried.
pub async fn locate_gadget_pod<L>(client: &L, node: &str) -> Result<String, RemoteError>
where
    L: PodLister + ?Sized,
{
    let pods = client
        .list_pods(GADGET_NAMESPACE, &gadget_pod_params(node))
        .await
        .map_err(RemoteError::PodList)?;

    match pods.len() {
        0 => {
            tracing::debug!(node, "No gadget pod found");
            Err(RemoteError::NotFound {
                node: node.to_string(),
            })
        }
        1 => match pods.into_iter().next().and_then(|pod| pod.metadata.name) {
            Some(name) if !name.is_empty() => {
                tracing::debug!(node, pod = %name, "Located gadget pod");
                Ok(name)
            }
            _ => {
                tracing::warn!(node, "Matched gadget pod has no name");
                Err(RemoteError::NotFound {
                    node: node.to_string(),
                })
            }
        },
        count => {
            tracing::warn!(node, count, "Multiple gadget pods running on node");
            Err(RemoteError::AmbiguousMatch {
                node: node.to_string(),
                count,
            })
        }
    }
}
