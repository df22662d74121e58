//! Cluster API `Cluster` resource
//!
//! The owning cluster of a guest cluster scope. Only the network block is
//! read by the reconciler.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label CAPI stamps on every object belonging to a cluster
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

/// Default Kubernetes API server port
pub const DEFAULT_API_SERVER_PORT: i32 = 6443;

/// Specification for a CAPI Cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1alpha3",
    kind = "Cluster",
    plural = "clusters",
    namespaced,
    status = "ClusterStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Pauses reconciliation of this cluster and its objects
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,

    /// Cluster-wide network configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_network: Option<ClusterNetwork>,

    /// Reference to the provider-specific infrastructure object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ObjectReference>,
}

/// Cluster network configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    /// Port the API server binds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_port: Option<i32>,

    /// Domain name for services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_domain: Option<String>,
}

/// Observed state of a CAPI Cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Lifecycle phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Whether the infrastructure is ready
    #[serde(default)]
    pub infrastructure_ready: bool,
}

impl Cluster {
    /// API server port, falling back to the Kubernetes default
    pub fn api_server_port(&self) -> i32 {
        self.spec
            .cluster_network
            .as_ref()
            .and_then(|n| n.api_server_port)
            .unwrap_or(DEFAULT_API_SERVER_PORT)
    }
}
