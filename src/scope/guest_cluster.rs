//! Scope for an untyped guest cluster infrastructure object
//!
//! The guest cluster is held as a [`DynamicObject`]; only `spec.region` is
//! interpreted. Network, load balancer and bastion management are not
//! performed for guest clusters, so those accessors return defaults.

use std::collections::BTreeMap;
use std::sync::Arc;

use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, instrument};

use super::patch_helper::PatchHelper;
use super::types::{
    Bastion, CniIngressRule, FailureDomainSpec, Instance, LoadBalancerSpec, Network,
    SecurityGroup, SecurityGroupRole, Subnet, Tags, VpcSpec,
};
use super::ClusterScoper;
use crate::credentials::CredentialSource;
use crate::crd::{Cluster, CLUSTER_NAME_LABEL};
use crate::session::{ServiceEndpoint, SessionFactory, SessionHandle};
use crate::store::ObjectStore;
use crate::Error;

/// Inputs for [`GuestClusterScope::new`]
pub struct GuestClusterScopeParams {
    /// Store used to persist changes on close
    pub store: Arc<dyn ObjectStore>,
    /// Owning CAPI cluster
    pub cluster: Option<Cluster>,
    /// Guest cluster infrastructure object
    pub guest_cluster: Option<DynamicObject>,
    /// Name of the controller building the scope
    pub controller_name: String,
    /// Service endpoint overrides
    pub endpoints: Vec<ServiceEndpoint>,
    /// Where session credentials come from
    pub credentials: CredentialSource,
    /// Builds the session
    pub session_factory: Arc<dyn SessionFactory>,
}

/// Per-reconcile scope of a guest cluster
pub struct GuestClusterScope {
    store: Arc<dyn ObjectStore>,
    cluster: Cluster,
    guest_cluster: DynamicObject,
    session: SessionHandle,
    controller_name: String,
    patch_helper: PatchHelper,
}

impl std::fmt::Debug for GuestClusterScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestClusterScope")
            .field("cluster", &self.cluster.name_any())
            .field("guest_cluster", &self.patch_helper.reference().key())
            .field("region", &self.session.region())
            .field("controller_name", &self.controller_name)
            .finish()
    }
}

impl GuestClusterScope {
    /// Build a scope
    ///
    /// Fails with [`Error::InvalidInput`] when either object is absent,
    /// [`Error::Configuration`] when the guest cluster has no region and
    /// [`Error::SessionCreation`] when the session cannot be built. The
    /// snapshot is taken only after every check has passed.
    #[instrument(skip(params), fields(controller = %params.controller_name))]
    pub fn new(params: GuestClusterScopeParams) -> Result<Self, Error> {
        let cluster = params
            .cluster
            .ok_or_else(|| Error::invalid_input("cannot build scope without a Cluster"))?;
        let guest_cluster = params
            .guest_cluster
            .ok_or_else(|| Error::invalid_input("cannot build scope without a guest cluster"))?;

        let resource = object_key(&guest_cluster);
        let region = spec_region(&guest_cluster)
            .ok_or_else(|| Error::configuration(&resource, "spec.region is not set"))?;

        let session = params
            .session_factory
            .new_session(&region, &params.endpoints, &params.credentials)
            .map_err(|e| Error::session_creation(&resource, e))?;

        let patch_helper = PatchHelper::new(&guest_cluster)?;

        debug!(guest_cluster = %resource, region = %region, "built guest cluster scope");

        Ok(Self {
            store: params.store,
            cluster,
            guest_cluster,
            session,
            controller_name: params.controller_name,
            patch_helper,
        })
    }

    /// Guest cluster object, for changes persisted by [`close`](Self::close)
    pub fn guest_cluster_mut(&mut self) -> &mut DynamicObject {
        &mut self.guest_cluster
    }

    /// Persist changes made to the guest cluster since the scope was built
    ///
    /// Status changes are written through the status subresource. The first
    /// write carries the snapshot's resourceVersion, so a concurrent writer
    /// surfaces as [`Error::Conflict`]. Returns whether anything was sent.
    pub async fn close(self) -> Result<bool, Error> {
        self.patch_helper
            .patch(self.store.as_ref(), &self.guest_cluster)
            .await
    }
}

impl ClusterScoper for GuestClusterScope {
    fn name(&self) -> &str {
        self.cluster.metadata.name.as_deref().unwrap_or_default()
    }

    fn namespace(&self) -> &str {
        self.cluster.metadata.namespace.as_deref().unwrap_or_default()
    }

    fn region(&self) -> String {
        spec_region(&self.guest_cluster).unwrap_or_default()
    }

    fn controller_name(&self) -> &str {
        &self.controller_name
    }

    fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn additional_tags(&self) -> Tags {
        Tags::new()
    }

    fn api_server_port(&self) -> i32 {
        self.cluster.api_server_port()
    }

    fn control_plane_config_map_name(&self) -> String {
        format!(
            "{}-controlplane",
            self.cluster.metadata.uid.as_deref().unwrap_or_default()
        )
    }

    fn list_label_selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), self.name().to_string())])
    }

    fn network(&self) -> Option<Network> {
        None
    }

    fn vpc(&self) -> VpcSpec {
        VpcSpec::default()
    }

    fn subnets(&self) -> Vec<Subnet> {
        Vec::new()
    }

    fn set_subnets(&mut self, _subnets: Vec<Subnet>) {}

    fn cni_ingress_rules(&self) -> Vec<CniIngressRule> {
        Vec::new()
    }

    fn security_groups(&self) -> BTreeMap<SecurityGroupRole, SecurityGroup> {
        BTreeMap::new()
    }

    fn control_plane_load_balancer(&self) -> Option<LoadBalancerSpec> {
        None
    }

    fn set_failure_domain(&mut self, _id: &str, _spec: FailureDomainSpec) {}

    fn bastion(&self) -> Option<Bastion> {
        None
    }

    fn set_bastion_instance(&mut self, _instance: Instance) {}

    fn ssh_key_name(&self) -> Option<String> {
        None
    }

    fn image_lookup_format(&self) -> String {
        String::new()
    }

    fn image_lookup_org(&self) -> String {
        String::new()
    }

    fn image_lookup_base_os(&self) -> String {
        String::new()
    }
}

fn spec_region(obj: &DynamicObject) -> Option<String> {
    obj.data
        .get("spec")
        .and_then(|spec| spec.get("region"))
        .and_then(|region| region.as_str())
        .map(str::to_string)
}

fn object_key(obj: &DynamicObject) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AwsCredentials;
    use crate::crd::{ClusterNetwork, ClusterSpec};
    use crate::scope::LoadBalancerScheme;
    use crate::session::{AwsSessionFactory, MockSessionFactory};
    use crate::store::MockObjectStore;
    use serde_json::json;

    fn cluster() -> Cluster {
        let mut cluster = Cluster::new("guest", ClusterSpec::default());
        cluster.metadata.namespace = Some("clusters".into());
        cluster.metadata.uid = Some("1234-abcd".into());
        cluster
    }

    fn guest_cluster(spec: serde_json::Value) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha3",
            "kind": "AWSCluster",
            "metadata": {"name": "guest", "namespace": "clusters", "resourceVersion": "10"},
            "spec": spec
        }))
        .unwrap()
    }

    fn credentials() -> CredentialSource {
        CredentialSource::Static(AwsCredentials {
            access_key_id: "AKID".into(),
            secret_access_key: "SECRET".into(),
            session_token: None,
        })
    }

    fn params(
        store: MockObjectStore,
        cluster: Option<Cluster>,
        guest: Option<DynamicObject>,
        factory: Arc<dyn SessionFactory>,
    ) -> GuestClusterScopeParams {
        GuestClusterScopeParams {
            store: Arc::new(store),
            cluster,
            guest_cluster: guest,
            controller_name: "machineset-controller".into(),
            endpoints: Vec::new(),
            credentials: credentials(),
            session_factory: factory,
        }
    }

    fn untouched_factory() -> Arc<dyn SessionFactory> {
        let mut factory = MockSessionFactory::new();
        factory.expect_new_session().never();
        Arc::new(factory)
    }

    /// Story: a scope is never built from absent inputs, and no session is
    /// created trying
    #[test]
    fn absent_inputs_are_rejected_before_session_creation() {
        let err = GuestClusterScope::new(params(
            MockObjectStore::new(),
            None,
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            untouched_factory(),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));

        let err = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(cluster()),
            None,
            untouched_factory(),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn missing_region_is_configuration_error() {
        let err = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(cluster()),
            Some(guest_cluster(json!({}))),
            untouched_factory(),
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }), "{:?}", err);
        assert!(err.to_string().contains("clusters/guest"));
    }

    #[test]
    fn session_failure_is_wrapped() {
        let mut factory = MockSessionFactory::new();
        factory
            .expect_new_session()
            .withf(|region, _, _| region == "us-east-1")
            .times(1)
            .returning(|_, _, _| Err(Error::credential("no keys")));

        let err = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(cluster()),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(factory),
        ))
        .unwrap_err();
        match err {
            Error::SessionCreation { resource, source } => {
                assert_eq!(resource, "clusters/guest");
                assert!(matches!(*source, Error::Credential { .. }));
            }
            other => panic!("expected SessionCreation, got {:?}", other),
        }
    }

    /// Story: accessors project the owning cluster and fall back to
    /// declared defaults for infrastructure guest clusters do not manage
    #[test]
    fn accessors_project_cluster_state() {
        let scope = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(cluster()),
            Some(guest_cluster(json!({"region": "eu-west-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();

        assert_eq!(scope.name(), "guest");
        assert_eq!(scope.namespace(), "clusters");
        assert_eq!(scope.kubernetes_cluster_name(), "guest");
        assert_eq!(scope.region(), "eu-west-1");
        assert_eq!(scope.session().region(), "eu-west-1");
        assert_eq!(scope.controller_name(), "machineset-controller");
        assert_eq!(scope.api_server_port(), 6443);
        assert_eq!(scope.control_plane_config_map_name(), "1234-abcd-controlplane");
        assert_eq!(
            scope.list_label_selector(),
            BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), "guest".to_string())])
        );
        assert_eq!(
            scope.control_plane_load_balancer_scheme(),
            LoadBalancerScheme::InternetFacing
        );
        assert_eq!(scope.control_plane_load_balancer_scheme().to_string(), "internet-facing");
        assert!(scope.network().is_none());
        assert_eq!(scope.vpc(), VpcSpec::default());
        assert!(scope.subnets().is_empty());
        assert!(scope.security_groups().is_empty());
        assert!(scope.cni_ingress_rules().is_empty());
        assert!(scope.additional_tags().is_empty());
        assert!(scope.bastion().is_none());
        assert!(scope.ssh_key_name().is_none());
        assert!(scope.image_lookup_format().is_empty());
        assert!(scope.image_lookup_org().is_empty());
        assert!(scope.image_lookup_base_os().is_empty());
    }

    #[test]
    fn api_server_port_comes_from_cluster_network() {
        let mut owner = cluster();
        owner.spec.cluster_network = Some(ClusterNetwork {
            api_server_port: Some(443),
            service_domain: None,
        });
        let scope = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(owner),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();
        assert_eq!(scope.api_server_port(), 443);
    }

    #[test]
    fn unsupported_setters_change_nothing() {
        let mut scope = GuestClusterScope::new(params(
            MockObjectStore::new(),
            Some(cluster()),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();

        scope.set_subnets(vec![Subnet {
            id: "subnet-1".into(),
            ..Default::default()
        }]);
        scope.set_bastion_instance(Instance::default());
        scope.set_failure_domain("us-east-1a", FailureDomainSpec::default());

        assert!(scope.subnets().is_empty());
        assert!(scope.bastion().is_none());
    }

    /// Story: closing an untouched scope writes nothing
    #[tokio::test]
    async fn close_without_changes_makes_no_store_call() {
        let mut store = MockObjectStore::new();
        store.expect_patch().never();
        store.expect_patch_status().never();

        let scope = GuestClusterScope::new(params(
            store,
            Some(cluster()),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();
        assert!(!scope.close().await.unwrap());
    }

    /// Story: status recorded on a scope reaches the status subresource, not
    /// the main resource where the API server would drop it
    #[tokio::test]
    async fn close_writes_status_through_subresource() {
        let mut store = MockObjectStore::new();
        store.expect_patch().never();
        store
            .expect_patch_status()
            .withf(|reference, patch| {
                reference.kind == "AWSCluster"
                    && reference.key() == "clusters/guest"
                    && patch.resource_version.as_deref() == Some("10")
                    && patch.delta == json!({"status": {"ready": true}})
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut scope = GuestClusterScope::new(params(
            store,
            Some(cluster()),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();
        scope.guest_cluster_mut().data["status"] = json!({"ready": true});

        assert!(scope.close().await.unwrap());
    }

    /// Story: closing a modified scope sends only the change, guarded by the
    /// snapshot's resourceVersion, and surfaces conflicts
    #[tokio::test]
    async fn close_sends_delta_with_precondition() {
        let mut store = MockObjectStore::new();
        store
            .expect_patch()
            .withf(|reference, patch| {
                reference.kind == "AWSCluster"
                    && patch.resource_version.as_deref() == Some("10")
                    && patch.delta == json!({"metadata": {"labels": {"owner": "team-a"}}})
            })
            .times(1)
            .returning(|reference, _| Err(Error::conflict(reference.key(), "object has been modified")));
        store.expect_patch_status().never();

        let mut scope = GuestClusterScope::new(params(
            store,
            Some(cluster()),
            Some(guest_cluster(json!({"region": "us-east-1"}))),
            Arc::new(AwsSessionFactory),
        ))
        .unwrap();
        scope.guest_cluster_mut().metadata.labels =
            Some(BTreeMap::from([("owner".to_string(), "team-a".to_string())]));

        let err = scope.close().await.unwrap_err();
        assert!(err.is_conflict());
    }
}
