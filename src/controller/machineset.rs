//! MachineSet reconciliation controller
//!
//! Annotates every MachineSet with the capacity of its instance type so the
//! cluster autoscaler can scale from zero without a running machine to
//! inspect.
//!
//! Each reconcile runs `fetch -> deletion check -> snapshot -> decode ->
//! derive -> patch`. The patch contains only annotation keys whose value
//! changed and carries the fetched resourceVersion, so a reconcile racing a
//! concurrent writer fails with a conflict and is retried against fresh
//! state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DynamicObject, TypeMeta};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument, warn};

use crate::codec::{ProviderConfig, ProviderConfigCodec};
use crate::crd::{Cluster, MachineSet};
use crate::credentials::CredentialSource;
use crate::instance_types::{self, CapabilityDescriptor};
use crate::scope::{GuestClusterScope, GuestClusterScopeParams, PatchHelper};
use crate::session::{AwsSessionFactory, ServiceEndpoint, SessionFactory};
use crate::store::{to_typed, ObjectStore, ResourceRef};
use crate::Error;

/// Annotation carrying the vCPU count of the template's instance type
pub const VCPU_ANNOTATION: &str = "machine.openshift.io/vCPU";
/// Annotation carrying the memory, in MiB, of the template's instance type
pub const MEMORY_ANNOTATION: &str = "machine.openshift.io/memoryMb";
/// Annotation carrying the GPU count of the template's instance type
pub const GPU_ANNOTATION: &str = "machine.openshift.io/GPU";

/// Requeue delay after a resourceVersion conflict
pub const CONFLICT_REQUEUE: Duration = Duration::ZERO;
/// Requeue delay for errors that need an operator to fix configuration
pub const CONFIGURATION_REQUEUE: Duration = Duration::from_secs(300);
/// Requeue delay for undecodable provider configuration
pub const DECODE_REQUEUE: Duration = Duration::from_secs(60);
/// Requeue delay for transient failures
pub const TRANSIENT_REQUEUE: Duration = Duration::from_secs(10);

/// Controller name used when none is configured
pub const DEFAULT_CONTROLLER_NAME: &str = "machineset-controller";

/// Shared state for MachineSet reconciles
pub struct Context {
    /// Object store (trait object for testability)
    pub store: Arc<dyn ObjectStore>,
    /// Provider config codec
    pub codec: ProviderConfigCodec,
    /// Name this controller reports in logs and scopes
    pub controller_name: String,
    /// Service endpoint overrides applied to every session
    pub endpoints: Vec<ServiceEndpoint>,
    /// Builds per-reconcile cloud sessions
    pub session_factory: Arc<dyn SessionFactory>,
}

impl Context {
    /// Create a context over `store`
    pub fn new(store: Arc<dyn ObjectStore>, controller_name: impl Into<String>) -> Self {
        Self {
            store,
            codec: ProviderConfigCodec::new(),
            controller_name: controller_name.into(),
            endpoints: Vec::new(),
            session_factory: Arc::new(AwsSessionFactory),
        }
    }

    /// Apply service endpoint overrides to sessions built from this context
    pub fn with_endpoints(mut self, endpoints: Vec<ServiceEndpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Use a different session factory
    pub fn with_session_factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.session_factory = factory;
        self
    }

    /// Where sessions for `config` get their credentials
    ///
    /// A referenced credentials secret is read from `namespace` through the
    /// store; without one the environment is used.
    pub async fn credentials_for(
        &self,
        namespace: &str,
        config: &ProviderConfig,
    ) -> Result<CredentialSource, Error> {
        match &config.credentials_secret {
            Some(secret) => {
                CredentialSource::from_secret_ref(self.store.as_ref(), namespace, &secret.name).await
            }
            None => Ok(CredentialSource::Environment),
        }
    }

    /// Build a guest cluster scope sharing this context's store and settings
    pub fn guest_cluster_scope(
        &self,
        cluster: Option<Cluster>,
        guest_cluster: Option<DynamicObject>,
        credentials: CredentialSource,
    ) -> Result<GuestClusterScope, Error> {
        GuestClusterScope::new(GuestClusterScopeParams {
            store: self.store.clone(),
            cluster,
            guest_cluster,
            controller_name: self.controller_name.clone(),
            endpoints: self.endpoints.clone(),
            credentials,
            session_factory: self.session_factory.clone(),
        })
    }

    /// Create a context for testing with a mock store
    #[cfg(test)]
    pub fn for_testing(store: Arc<dyn ObjectStore>) -> Self {
        Self::new(store, DEFAULT_CONTROLLER_NAME)
    }
}

/// What a reconcile did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do: gone, deleting, or already up to date
    Done,
    /// Annotations were patched
    Patched,
}

/// Reconcile a MachineSet handed over by the controller runtime
///
/// The cached object is only used for its identity; the reconcile always
/// fetches the current state from the store.
#[instrument(skip(machine_set, ctx), fields(machineset = %machine_set.name_any()))]
pub async fn reconcile(machine_set: Arc<MachineSet>, ctx: Arc<Context>) -> Result<Action, Error> {
    let reference = ResourceRef::for_object(machine_set.as_ref());
    let outcome = reconcile_ref(&reference, &ctx).await?;
    debug!(?outcome, "reconcile finished");
    Ok(Action::await_change())
}

/// Run one reconcile of the MachineSet identified by `reference`
#[instrument(
    skip(reference, ctx),
    fields(resource = %reference, controller = %ctx.controller_name)
)]
pub async fn reconcile_ref(reference: &ResourceRef, ctx: &Context) -> Result<ReconcileOutcome, Error> {
    debug!("reconciling");

    // Fetched
    let mut obj = match ctx.store.get(reference).await {
        Ok(obj) => obj,
        Err(e) if e.is_not_found() => {
            debug!("machineset no longer exists");
            return Ok(ReconcileOutcome::Done);
        }
        Err(e) => return Err(e),
    };

    if obj.metadata.deletion_timestamp.is_some() {
        debug!("machineset is being deleted, skipping");
        return Ok(ReconcileOutcome::Done);
    }

    if obj.types.is_none() {
        obj.types = Some(TypeMeta {
            api_version: reference.api_version.clone(),
            kind: reference.kind.clone(),
        });
    }
    let snapshot = PatchHelper::new(&obj)?;

    // Decoded
    let machine_set: MachineSet = to_typed(&obj)?;
    let config = ctx
        .codec
        .decode_provider_spec(machine_set.provider_spec())
        .map_err(|e| Error::decode(reference.key(), e))?;

    // Derived
    let capacity = if instance_types::is_known(&config.instance_type) {
        instance_types::lookup(&config.instance_type)
    } else {
        warn!(
            instance_type = %config.instance_type,
            "unknown instance type, annotating zero capacity"
        );
        CapabilityDescriptor::default()
    };
    let changed = apply_capacity_annotations(&mut obj.metadata, capacity);
    if changed.is_empty() {
        debug!("capacity annotations up to date");
        return Ok(ReconcileOutcome::Done);
    }

    // Patched
    let patch = snapshot.diff(&obj)?;
    ctx.store.patch(reference, &patch).await?;

    info!(
        instance_type = %config.instance_type,
        vcpu = capacity.vcpu,
        memory_mib = capacity.memory_mib,
        gpu = capacity.gpu,
        changed = ?changed,
        "annotated machineset capacity"
    );
    Ok(ReconcileOutcome::Patched)
}

/// Annotations describing `capacity`
pub fn capacity_annotations(capacity: CapabilityDescriptor) -> BTreeMap<String, String> {
    BTreeMap::from([
        (VCPU_ANNOTATION.to_string(), capacity.vcpu.to_string()),
        (MEMORY_ANNOTATION.to_string(), capacity.memory_mib.to_string()),
        (GPU_ANNOTATION.to_string(), capacity.gpu.to_string()),
    ])
}

/// Write the capacity annotations into `meta`
///
/// Returns the keys whose value changed; other annotations are untouched.
pub fn apply_capacity_annotations(
    meta: &mut ObjectMeta,
    capacity: CapabilityDescriptor,
) -> Vec<String> {
    let annotations = meta.annotations.get_or_insert_with(BTreeMap::new);
    let mut changed = Vec::new();
    for (key, value) in capacity_annotations(capacity) {
        if annotations.get(&key) != Some(&value) {
            annotations.insert(key.clone(), value);
            changed.push(key);
        }
    }
    changed
}

/// Requeue delay for a failed reconcile
pub fn requeue_delay(error: &Error) -> Duration {
    match error {
        Error::Conflict { .. } => CONFLICT_REQUEUE,
        Error::Configuration { .. } | Error::Credential { .. } | Error::SessionCreation { .. } => {
            CONFIGURATION_REQUEUE
        }
        Error::Decode { .. } | Error::Schema { .. } | Error::MalformedPayload { .. } => {
            DECODE_REQUEUE
        }
        _ => TRANSIENT_REQUEUE,
    }
}

/// Error policy for the MachineSet controller
pub fn error_policy(machine_set: Arc<MachineSet>, error: &Error, _ctx: Arc<Context>) -> Action {
    let resource = error.resource().unwrap_or("<none>");
    if error.requires_operator() {
        error!(
            ?error,
            machineset = %machine_set.name_any(),
            resource,
            "provider config schema is not recognised, operator action required"
        );
    } else if error.is_conflict() {
        debug!(machineset = %machine_set.name_any(), resource, "conflict, retrying against fresh state");
    } else {
        error!(?error, machineset = %machine_set.name_any(), resource, "reconciliation failed");
    }

    if !error.is_retryable() {
        return Action::await_change();
    }
    Action::requeue(requeue_delay(error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::v1alpha1;
    use crate::store::MockObjectStore;
    use rstest::rstest;
    use serde_json::json;

    /// MachineSet as the store returns it
    fn machineset_object(
        name: &str,
        resource_version: &str,
        provider_value: serde_json::Value,
    ) -> DynamicObject {
        serde_json::from_value(serde_json::json!({
            "apiVersion": "machine.openshift.io/v1beta1",
            "kind": "MachineSet",
            "metadata": {
                "name": name,
                "namespace": "openshift-machine-api",
                "resourceVersion": resource_version
            },
            "spec": {
                "replicas": 1,
                "template": {"spec": {"providerSpec": {"value": provider_value}}}
            }
        }))
        .unwrap()
    }

    fn provider_value(instance_type: &str) -> serde_json::Value {
        json!({
            "apiVersion": "awsproviderconfig.openshift.io/v1beta1",
            "kind": "AWSMachineProviderConfig",
            "instanceType": instance_type,
            "placement": {"region": "us-east-1", "availabilityZone": "us-east-1a"}
        })
    }

    fn workers_ref() -> ResourceRef {
        ResourceRef::new(
            "machine.openshift.io/v1beta1",
            "MachineSet",
            "openshift-machine-api",
            "workers",
        )
    }

    fn annotated(mut obj: DynamicObject, capacity: CapabilityDescriptor) -> DynamicObject {
        apply_capacity_annotations(&mut obj.metadata, capacity);
        obj
    }

    fn store_returning(obj: DynamicObject) -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .returning(move |_| Ok(obj.clone()));
        store
    }

    fn ctx(store: MockObjectStore) -> Context {
        Context::for_testing(Arc::new(store))
    }

    // ===== Reconcile Flow Tests =====

    /// Story: a MachineSet using m4.xlarge is annotated with 4 vCPU, 16 GiB
    /// and no GPUs, in a single patch guarded by the fetched resourceVersion
    #[tokio::test]
    async fn story_machineset_is_annotated_with_capacity() {
        let mut store = store_returning(machineset_object("workers", "7", provider_value("m4.xlarge")));
        store
            .expect_patch()
            .withf(|reference, patch| {
                reference.key() == "openshift-machine-api/workers"
                    && patch.resource_version.as_deref() == Some("7")
                    && patch.delta
                        == json!({"metadata": {"annotations": {
                            "machine.openshift.io/vCPU": "4",
                            "machine.openshift.io/memoryMb": "16384",
                            "machine.openshift.io/GPU": "0"
                        }}})
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Patched);
    }

    /// Story: the GPU annotation reports GPUs, not vCPUs
    #[tokio::test]
    async fn story_gpu_annotation_uses_gpu_count() {
        let mut store = store_returning(machineset_object("gpu", "1", provider_value("p3.8xlarge")));
        store
            .expect_patch()
            .withf(|_, patch| {
                let annotations = &patch.delta["metadata"]["annotations"];
                annotations[VCPU_ANNOTATION] == "32" && annotations[GPU_ANNOTATION] == "4"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
    }

    /// Story: reconciling an already-annotated MachineSet writes nothing
    #[tokio::test]
    async fn story_reconcile_is_idempotent() {
        let obj = annotated(
            machineset_object("workers", "8", provider_value("m4.xlarge")),
            instance_types::lookup("m4.xlarge"),
        );
        let mut store = store_returning(obj);
        store.expect_patch().never();

        let outcome = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Done);
    }

    /// Story: only annotations that differ are sent, and unrelated
    /// annotations are left alone
    #[tokio::test]
    async fn story_only_changed_annotations_are_patched() {
        let mut obj = machineset_object("workers", "3", provider_value("m4.xlarge"));
        obj.metadata.annotations = Some(BTreeMap::from([
            (VCPU_ANNOTATION.to_string(), "4".to_string()),
            (MEMORY_ANNOTATION.to_string(), "16384".to_string()),
            (GPU_ANNOTATION.to_string(), "4".to_string()),
            ("owner".to_string(), "team-a".to_string()),
        ]));
        let mut store = store_returning(obj);
        store
            .expect_patch()
            .withf(|_, patch| {
                patch.delta == json!({"metadata": {"annotations": {"machine.openshift.io/GPU": "0"}}})
            })
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
    }

    /// Story: a MachineSet that was deleted before its reconcile ran is not
    /// an error
    #[tokio::test]
    async fn story_missing_machineset_is_done() {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .returning(|r| Err(Error::not_found(r.kind.clone(), r.key())));
        store.expect_patch().never();

        let outcome = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Done);
    }

    /// Story: a MachineSet being deleted is left untouched
    #[tokio::test]
    async fn story_deleting_machineset_is_never_patched() {
        let mut obj = machineset_object("workers", "2", provider_value("m4.xlarge"));
        obj.metadata.deletion_timestamp = Some(
            k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(
                "2024-01-01T00:00:00Z".parse().expect("timestamp"),
            ),
        );
        let mut store = store_returning(obj);
        store.expect_patch().never();

        let outcome = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Done);
    }

    /// Story: an unknown instance type is annotated with zero capacity
    /// rather than failing the reconcile
    #[tokio::test]
    async fn story_unknown_instance_type_gets_zero_capacity() {
        let mut store = store_returning(machineset_object("workers", "1", provider_value("z9.mega")));
        store
            .expect_patch()
            .withf(|_, patch| {
                let annotations = &patch.delta["metadata"]["annotations"];
                annotations[VCPU_ANNOTATION] == "0"
                    && annotations[MEMORY_ANNOTATION] == "0"
                    && annotations[GPU_ANNOTATION] == "0"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
    }

    /// Story: legacy v1alpha1 payloads are still understood
    #[tokio::test]
    async fn story_legacy_payload_is_decoded() {
        let legacy = json!({
            "apiVersion": v1alpha1::API_VERSION,
            "kind": "AWSMachineProviderConfig",
            "instanceType": "m5.large",
            "publicIp": false
        });
        let mut store = store_returning(machineset_object("workers", "1", legacy));
        store
            .expect_patch()
            .withf(|_, patch| patch.delta["metadata"]["annotations"][MEMORY_ANNOTATION] == "8192")
            .times(1)
            .returning(|_, _| Ok(()));

        reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap();
    }

    // ===== Error Propagation Tests =====

    /// Story: an unrecognised provider config schema fails the reconcile
    /// with a decode error that asks for operator attention
    #[tokio::test]
    async fn story_unknown_schema_is_decode_error() {
        let value = json!({"apiVersion": "example.com/v9", "kind": "Other", "instanceType": "m4.xlarge"});
        let mut store = store_returning(machineset_object("workers", "1", value));
        store.expect_patch().never();

        let err = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }), "{:?}", err);
        assert!(err.requires_operator());
        assert_eq!(requeue_delay(&err), DECODE_REQUEUE);
    }

    /// Story: a MachineSet without a provider spec value cannot be decoded
    #[tokio::test]
    async fn story_missing_provider_spec_is_decode_error() {
        let mut obj = machineset_object("workers", "1", json!(null));
        obj.data["spec"]["template"]["spec"] = json!({});
        let mut store = store_returning(obj);
        store.expect_patch().never();

        let err = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(!err.requires_operator());
    }

    /// Story: a concurrent writer makes the patch fail with a conflict,
    /// which is retried immediately
    #[tokio::test]
    async fn story_conflict_propagates_for_retry() {
        let mut store = store_returning(machineset_object("workers", "1", provider_value("m4.xlarge")));
        store
            .expect_patch()
            .times(1)
            .returning(|r, _| Err(Error::conflict(r.key(), "the object has been modified")));

        let err = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(requeue_delay(&err), CONFLICT_REQUEUE);
    }

    /// Story: store failures on fetch propagate so the reconcile is retried
    #[tokio::test]
    async fn story_fetch_failure_propagates() {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .returning(|r| Err(Error::timeout("get", r.key(), 30)));

        let err = reconcile_ref(&workers_ref(), &ctx(store)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(requeue_delay(&err), TRANSIENT_REQUEUE);
    }

    /// Story: the controller adapter reports await_change on success
    #[tokio::test]
    async fn story_controller_adapter_awaits_change() {
        let obj = annotated(
            machineset_object("workers", "8", provider_value("m4.xlarge")),
            instance_types::lookup("m4.xlarge"),
        );
        let machine_set: MachineSet = to_typed(&obj).unwrap();
        let store = store_returning(obj);

        let action = reconcile(Arc::new(machine_set), Arc::new(ctx(store)))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
    }

    /// Story: scopes built from the context carry its endpoint overrides
    #[test]
    fn story_context_builds_scope_with_overrides() {
        use crate::credentials::AwsCredentials;
        use crate::crd::ClusterSpec;
        use crate::scope::ClusterScoper;

        let endpoint: ServiceEndpoint = "ec2=https://ec2.internal".parse().unwrap();
        let ctx = ctx(MockObjectStore::new()).with_endpoints(vec![endpoint]);
        let guest: DynamicObject = serde_json::from_value(json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha3",
            "kind": "AWSCluster",
            "metadata": {"name": "guest", "namespace": "clusters", "resourceVersion": "1"},
            "spec": {"region": "us-west-2"}
        }))
        .unwrap();
        let credentials = CredentialSource::Static(AwsCredentials {
            access_key_id: "AKID".into(),
            secret_access_key: "SECRET".into(),
            session_token: None,
        });

        let scope = ctx
            .guest_cluster_scope(
                Some(Cluster::new("guest", ClusterSpec::default())),
                Some(guest),
                credentials,
            )
            .unwrap();
        assert_eq!(scope.controller_name(), DEFAULT_CONTROLLER_NAME);
        assert_eq!(
            scope.session().client_config("ec2").endpoint,
            "https://ec2.internal"
        );
    }

    /// Story: a provider config naming a credentials secret resolves its
    /// credentials from that secret in the MachineSet's namespace
    #[tokio::test]
    async fn story_context_reads_referenced_credentials_secret() {
        use crate::codec::SecretReference;
        use crate::credentials::{AWS_CREDS_SECRET_ACCESS_KEY, AWS_CREDS_SECRET_ID_KEY};
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .withf(|r| r.kind == "Secret" && r.key() == "openshift-machine-api/aws-cloud-credentials")
            .times(1)
            .returning(|_| {
                Ok(serde_json::from_value(json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "aws-cloud-credentials", "namespace": "openshift-machine-api"},
                    "data": {
                        AWS_CREDS_SECRET_ID_KEY: STANDARD.encode("AKID"),
                        AWS_CREDS_SECRET_ACCESS_KEY: STANDARD.encode("SECRET")
                    }
                }))
                .unwrap())
            });
        let config = ProviderConfig {
            credentials_secret: Some(SecretReference {
                name: "aws-cloud-credentials".into(),
            }),
            ..Default::default()
        };

        let source = ctx(store)
            .credentials_for("openshift-machine-api", &config)
            .await
            .unwrap();
        let creds = source.resolve_with(|_| None).unwrap();
        assert_eq!(creds.access_key_id, "AKID");
        assert_eq!(creds.secret_access_key, "SECRET");
    }

    /// Story: without a credentials secret the environment is used and the
    /// store is not consulted
    #[tokio::test]
    async fn story_context_defaults_to_environment_credentials() {
        let mut store = MockObjectStore::new();
        store.expect_get().never();

        let source = ctx(store)
            .credentials_for("openshift-machine-api", &ProviderConfig::default())
            .await
            .unwrap();
        assert!(matches!(source, CredentialSource::Environment));
    }

    // ===== Pure Helper Tests =====

    #[test]
    fn apply_creates_missing_annotation_map() {
        let mut meta = ObjectMeta::default();
        let changed = apply_capacity_annotations(&mut meta, CapabilityDescriptor::new(2, 4096, 1));
        assert_eq!(changed.len(), 3);
        let annotations = meta.annotations.unwrap();
        assert_eq!(annotations[VCPU_ANNOTATION], "2");
        assert_eq!(annotations[MEMORY_ANNOTATION], "4096");
        assert_eq!(annotations[GPU_ANNOTATION], "1");
    }

    #[rstest]
    #[case::conflict(Error::conflict("ns/ms", "modified"), CONFLICT_REQUEUE)]
    #[case::configuration(Error::configuration("ns/ms", "no region"), CONFIGURATION_REQUEUE)]
    #[case::credential(Error::credential("no keys"), CONFIGURATION_REQUEUE)]
    #[case::session(
        Error::session_creation("ns/ms", Error::credential("no keys")),
        CONFIGURATION_REQUEUE
    )]
    #[case::decode(Error::decode("ns/ms", Error::schema(None, None)), DECODE_REQUEUE)]
    #[case::timeout(Error::timeout("patch", "ns/ms", 30), TRANSIENT_REQUEUE)]
    #[case::serialization(Error::serialization("bad"), TRANSIENT_REQUEUE)]
    fn requeue_delay_by_error_class(#[case] error: Error, #[case] expected: Duration) {
        assert_eq!(requeue_delay(&error), expected);
    }

    #[test]
    fn error_policy_requeues() {
        let ms = Arc::new(MachineSet::new("workers", Default::default()));
        let ctx = Arc::new(ctx(MockObjectStore::new()));
        let action = error_policy(ms.clone(), &Error::conflict("ns/workers", "modified"), ctx.clone());
        assert_eq!(action, Action::requeue(CONFLICT_REQUEUE));

        let action = error_policy(ms, &Error::invalid_input("no cluster"), ctx);
        assert_eq!(action, Action::await_change());
    }
}
