//! Object store access
//!
//! The reconciler and scope only ever talk to the cluster through
//! [`ObjectStore`], so tests can substitute a mock or an in-memory store.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{
    Api, ApiResource, DynamicObject, GroupVersionKind, ListParams, Patch, PatchParams,
};
use kube::{Client, Resource, ResourceExt};
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::Error;

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity of a namespaced object in the store
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    /// API version, e.g. `machine.openshift.io/v1beta1`
    pub api_version: String,
    /// Kind, e.g. `MachineSet`
    pub kind: String,
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

impl ResourceRef {
    /// Build a reference from its parts
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference a typed object
    pub fn for_object<K>(obj: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self {
            api_version: K::api_version(&()).into_owned(),
            kind: K::kind(&()).into_owned(),
            namespace: obj.meta().namespace.clone().unwrap_or_default(),
            name: obj.meta().name.clone().unwrap_or_default(),
        }
    }

    /// Reference an untyped object
    ///
    /// Returns `None` when the object carries no type information.
    pub fn for_dynamic(obj: &DynamicObject) -> Option<Self> {
        let types = obj.types.as_ref()?;
        Some(Self {
            api_version: types.api_version.clone(),
            kind: types.kind.clone(),
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        })
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Resolve the API resource without discovery
    pub fn api_resource(&self) -> ApiResource {
        api_resource(&self.api_version, &self.kind)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A JSON merge patch guarded by an optional resourceVersion precondition
#[derive(Clone, Debug, PartialEq)]
pub struct MergePatch {
    /// Fields to change
    pub delta: Value,
    /// resourceVersion the patch was computed against
    pub resource_version: Option<String>,
}

impl MergePatch {
    /// Create a patch
    pub fn new(delta: Value, resource_version: Option<String>) -> Self {
        Self {
            delta,
            resource_version,
        }
    }

    /// Split off the `status` part of the patch
    ///
    /// Both halves keep the precondition. The status half is `None` when the
    /// patch does not touch status.
    pub fn split_status(mut self) -> (MergePatch, Option<MergePatch>) {
        let status = match &mut self.delta {
            Value::Object(map) => map.remove("status"),
            _ => None,
        };
        let status = status.map(|status| {
            let mut delta = serde_json::Map::new();
            delta.insert("status".to_string(), status);
            MergePatch::new(Value::Object(delta), self.resource_version.clone())
        });
        (self, status)
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        crate::patch::is_noop(&self.delta)
    }

    /// Request body sent to the API server
    ///
    /// The precondition travels as `metadata.resourceVersion`; the server
    /// answers 409 when the object has moved on.
    pub fn body(&self) -> Value {
        let mut body = self.delta.clone();
        if let (Some(rv), Value::Object(map)) = (&self.resource_version, &mut body) {
            let metadata = map
                .entry("metadata")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Value::Object(metadata) = metadata {
                metadata.insert("resourceVersion".to_string(), Value::String(rv.clone()));
            }
        }
        body
    }
}

/// Read and write access to cluster objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object
    ///
    /// Returns [`Error::NotFound`] when it does not exist.
    async fn get(&self, reference: &ResourceRef) -> Result<DynamicObject, Error>;

    /// Apply a merge patch
    ///
    /// Returns [`Error::Conflict`] when the precondition no longer holds.
    async fn patch(&self, reference: &ResourceRef, patch: &MergePatch) -> Result<(), Error>;

    /// Apply a merge patch to the status subresource
    ///
    /// Returns [`Error::Conflict`] when the precondition no longer holds.
    async fn patch_status(&self, reference: &ResourceRef, patch: &MergePatch) -> Result<(), Error>;

    /// List objects of a kind in a namespace matching all `labels`
    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DynamicObject>, Error>;
}

/// [`ObjectStore`] backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
    timeout: Duration,
}

impl KubeStore {
    /// Create a store with the default call timeout
    pub fn new(client: Client) -> Self {
        Self::with_timeout(client, DEFAULT_STORE_TIMEOUT)
    }

    /// Create a store with an explicit call timeout
    pub fn with_timeout(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn api(&self, reference: &ResourceRef) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            &reference.namespace,
            &reference.api_resource(),
        )
    }

    async fn bounded<T, F>(&self, operation: &str, resource: String, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::timeout(operation, resource, self.timeout.as_secs()))?
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, reference: &ResourceRef) -> Result<DynamicObject, Error> {
        let api = self.api(reference);
        self.bounded("get", reference.key(), async {
            api.get(&reference.name)
                .await
                .map_err(|e| map_kube_error("get", reference, e))
        })
        .await
    }

    async fn patch(&self, reference: &ResourceRef, patch: &MergePatch) -> Result<(), Error> {
        let api = self.api(reference);
        let body = patch.body();
        debug!(resource = %reference, patch = %body, "patching object");
        self.bounded("patch", reference.key(), async {
            api.patch(&reference.name, &PatchParams::default(), &Patch::Merge(&body))
                .await
                .map(|_| ())
                .map_err(|e| map_kube_error("patch", reference, e))
        })
        .await
    }

    async fn patch_status(&self, reference: &ResourceRef, patch: &MergePatch) -> Result<(), Error> {
        let api = self.api(reference);
        let body = patch.body();
        debug!(resource = %reference, patch = %body, "patching object status");
        self.bounded("patch_status", reference.key(), async {
            api.patch_status(&reference.name, &PatchParams::default(), &Patch::Merge(&body))
                .await
                .map(|_| ())
                .map_err(|e| map_kube_error("patch_status", reference, e))
        })
        .await
    }

    async fn list(
        &self,
        api_version: &str,
        kind: &str,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DynamicObject>, Error> {
        let api: Api<DynamicObject> = Api::namespaced_with(
            self.client.clone(),
            namespace,
            &api_resource(api_version, kind),
        );
        let params = ListParams::default().labels(&label_selector(labels));
        self.bounded("list", format!("{}/{}", namespace, kind), async {
            api.list(&params)
                .await
                .map(|list| list.items)
                .map_err(|e| Error::kube("list", e))
        })
        .await
    }
}

/// Convert an untyped object into a typed resource
pub fn to_typed<K: DeserializeOwned>(obj: &DynamicObject) -> Result<K, Error> {
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let value = serde_json::to_value(obj)
        .map_err(|e| Error::serialization_for_kind(kind.clone(), e.to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
}

/// Render labels as an equality selector, `k1=v1,k2=v2`
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

fn map_kube_error(operation: &str, reference: &ResourceRef, err: kube::Error) -> Error {
    match &err {
        kube::Error::Api(ae) if ae.code == 404 => {
            Error::not_found(reference.kind.clone(), reference.key())
        }
        kube::Error::Api(ae) if ae.code == 409 => Error::conflict(reference.key(), ae.message.clone()),
        _ => Error::kube(operation, err),
    }
}

fn api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    let gvk = GroupVersionKind::gvk(group, version, kind);
    ApiResource::from_gvk_with_plural(&gvk, &pluralize_kind(kind))
}

/// Split an apiVersion into group and version
///
/// Core resources (`v1`) have an empty group.
fn parse_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rfind('/') {
        Some(idx) => (&api_version[..idx], &api_version[idx + 1..]),
        None => ("", api_version),
    }
}

/// Kinds whose plural does not follow the suffix rules below
const KIND_PLURALS: &[(&str, &str)] = &[
    ("machine", "machines"),
    ("machineset", "machinesets"),
    ("machinedeployment", "machinedeployments"),
    ("cluster", "clusters"),
    ("awscluster", "awsclusters"),
    ("awsmachine", "awsmachines"),
    ("awsmachinetemplate", "awsmachinetemplates"),
    ("endpoints", "endpoints"),
];

fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}
