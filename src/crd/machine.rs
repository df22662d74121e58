//! Machine and MachineSet resources
//!
//! Only the fields the reconciler reads or writes are modelled; unknown fields
//! survive a fetch-patch cycle because the reconciler only ever sends a merge
//! patch of the keys it changed.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opaque, provider-specific configuration embedded in a machine spec
///
/// The generic resource model never interprets `value`; it is typed only by
/// the provider config codec.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Encoded provider configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawExtension>,
}

impl ProviderSpec {
    /// Wrap an encoded payload
    pub fn from_raw(raw: &[u8]) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(raw).map_err(|e| {
            crate::Error::serialization_for_kind("ProviderSpec", e.to_string())
        })?;
        Ok(Self {
            value: Some(RawExtension(value)),
        })
    }

    /// The raw payload bytes, if a value is set
    pub fn raw(&self) -> crate::Result<Option<Vec<u8>>> {
        self.value
            .as_ref()
            .map(|v| {
                serde_json::to_vec(&v.0).map_err(|e| {
                    crate::Error::serialization_for_kind("ProviderSpec", e.to_string())
                })
            })
            .transpose()
    }
}

/// Desired state of a single machine
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "machine.openshift.io",
    version = "v1beta1",
    kind = "Machine",
    plural = "machines",
    namespaced,
    status = "MachineStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"ProviderID","type":"string","jsonPath":".spec.providerID"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Provider-specific configuration
    #[serde(default)]
    pub provider_spec: ProviderSpec,

    /// Cloud identifier of the backing instance, set once provisioned
    #[serde(
        rename = "providerID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_id: Option<String>,
}

/// Observed state of a machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Lifecycle phase reported by the machine actuator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Node backed by this machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<ObjectReference>,
}

/// Labels and annotations stamped onto machines created from a template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineTemplateMeta {
    /// Labels copied to every machine
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations copied to every machine
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Template for machines created by a MachineSet
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineTemplateSpec {
    /// Metadata applied to created machines
    #[serde(default)]
    pub metadata: MachineTemplateMeta,

    /// Spec of created machines
    #[serde(default)]
    pub spec: MachineSpec,
}

/// Desired state of a group of identical machines
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "machine.openshift.io",
    version = "v1beta1",
    kind = "MachineSet",
    plural = "machinesets",
    shortname = "ms",
    namespaced,
    status = "MachineSetStatus",
    printcolumn = r#"{"name":"Desired","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetSpec {
    /// Number of desired machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Policy used to pick machines on scale down (Random, Newest, Oldest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_policy: Option<String>,

    /// Template for new machines
    #[serde(default)]
    pub template: MachineTemplateSpec,
}

/// Observed state of a MachineSet
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetStatus {
    /// Number of machines currently owned
    #[serde(default)]
    pub replicas: i32,

    /// Number of machines with a ready node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i32>,

    /// Most recent generation observed by the machine set controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl MachineSet {
    /// Provider spec of the machine template
    pub fn provider_spec(&self) -> &ProviderSpec {
        &self.spec.template.spec.provider_spec
    }
}

impl Machine {
    /// Provider spec of this machine
    pub fn provider_spec(&self) -> &ProviderSpec {
        &self.spec.provider_spec
    }
}
