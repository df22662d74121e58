//! Per-reconcile scopes
//!
//! A scope bundles the object being reconciled, its owning cluster, a fresh
//! cloud session and a snapshot used to persist changes on close. Scopes are
//! built at the start of a reconcile and consumed at its end; nothing in them
//! outlives the reconcile.

mod guest_cluster;
mod patch_helper;
mod types;

pub use guest_cluster::{GuestClusterScope, GuestClusterScopeParams};
pub use patch_helper::PatchHelper;
pub use types::{
    Bastion, CniIngressRule, FailureDomainSpec, Instance, LoadBalancerScheme, LoadBalancerSpec,
    Network, SecurityGroup, SecurityGroupRole, Subnet, Tags, VpcSpec,
};

use std::collections::BTreeMap;

use crate::session::SessionHandle;

/// Read access to cluster-level state an actuator needs
///
/// Kinds that do not manage a given piece of infrastructure return its
/// default value and ignore the matching setter.
pub trait ClusterScoper {
    /// Name of the owning cluster
    fn name(&self) -> &str;

    /// Namespace of the owning cluster
    fn namespace(&self) -> &str;

    /// Cloud region
    fn region(&self) -> String;

    /// Name of the Kubernetes cluster
    fn kubernetes_cluster_name(&self) -> &str {
        self.name()
    }

    /// Name of the controller that built the scope
    fn controller_name(&self) -> &str;

    /// Session for building cloud clients
    fn session(&self) -> &SessionHandle;

    /// Tags applied to all created resources
    fn additional_tags(&self) -> Tags;

    /// Port the API server load balancer listens on
    fn api_server_port(&self) -> i32;

    /// ConfigMap coordinating control plane bootstrap
    fn control_plane_config_map_name(&self) -> String;

    /// Labels selecting every object of the cluster
    fn list_label_selector(&self) -> BTreeMap<String, String>;

    /// Cluster network
    fn network(&self) -> Option<Network>;

    /// Cluster VPC
    fn vpc(&self) -> VpcSpec;

    /// Cluster subnets
    fn subnets(&self) -> Vec<Subnet>;

    /// Replace the cluster subnets
    fn set_subnets(&mut self, subnets: Vec<Subnet>);

    /// Ingress rules the CNI requires
    fn cni_ingress_rules(&self) -> Vec<CniIngressRule>;

    /// Security groups keyed by role
    fn security_groups(&self) -> BTreeMap<SecurityGroupRole, SecurityGroup>;

    /// Control plane load balancer
    fn control_plane_load_balancer(&self) -> Option<LoadBalancerSpec>;

    /// Control plane load balancer scheme
    fn control_plane_load_balancer_scheme(&self) -> LoadBalancerScheme {
        self.control_plane_load_balancer()
            .and_then(|lb| lb.scheme)
            .unwrap_or_default()
    }

    /// Record a failure domain
    fn set_failure_domain(&mut self, id: &str, spec: FailureDomainSpec);

    /// Bastion configuration
    fn bastion(&self) -> Option<Bastion>;

    /// Record the bastion instance
    fn set_bastion_instance(&mut self, instance: Instance);

    /// SSH key pair for instances
    fn ssh_key_name(&self) -> Option<String>;

    /// Format string for AMI lookup
    fn image_lookup_format(&self) -> String;

    /// Organization owning looked-up AMIs
    fn image_lookup_org(&self) -> String;

    /// Base OS of looked-up AMIs
    fn image_lookup_base_os(&self) -> String;
}
