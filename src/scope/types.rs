//! Cluster infrastructure shapes exposed by scopes
//!
//! Scopes for kinds that do not manage a piece of infrastructure return the
//! `Default` value of these types.

use std::collections::BTreeMap;
use std::fmt;

/// Tags applied to every cloud resource a scope creates
pub type Tags = BTreeMap<String, String>;

/// Network state of a cluster
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Network {
    /// VPC configuration
    pub vpc: VpcSpec,
    /// Subnets in use
    pub subnets: Vec<Subnet>,
    /// Security groups keyed by role
    pub security_groups: BTreeMap<SecurityGroupRole, SecurityGroup>,
}

/// VPC configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VpcSpec {
    /// VPC id, empty when not yet created
    pub id: String,
    /// CIDR block
    pub cidr_block: String,
}

/// A subnet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subnet {
    /// Subnet id
    pub id: String,
    /// Availability zone
    pub availability_zone: String,
    /// CIDR block
    pub cidr_block: String,
    /// Whether instances get a public address
    pub is_public: bool,
}

/// Purpose of a security group
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecurityGroupRole {
    /// Bastion host
    Bastion,
    /// Control plane nodes
    ControlPlane,
    /// Worker nodes
    Node,
    /// API server load balancer
    ApiServerLb,
}

/// A security group
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SecurityGroup {
    /// Group id
    pub id: String,
    /// Group name
    pub name: String,
}

/// Ingress rule required by the CNI
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CniIngressRule {
    /// Rule description
    pub description: String,
    /// IP protocol
    pub protocol: String,
    /// First port of the range
    pub from_port: i64,
    /// Last port of the range
    pub to_port: i64,
}

/// Control plane load balancer configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadBalancerSpec {
    /// Scheme, internet-facing when unset
    pub scheme: Option<LoadBalancerScheme>,
}

/// Whether a load balancer is reachable from the internet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadBalancerScheme {
    /// Publicly reachable
    #[default]
    InternetFacing,
    /// Reachable only inside the VPC
    Internal,
}

impl fmt::Display for LoadBalancerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalancerScheme::InternetFacing => f.write_str("internet-facing"),
            LoadBalancerScheme::Internal => f.write_str("internal"),
        }
    }
}

/// Bastion host configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bastion {
    /// Whether a bastion is provisioned
    pub enabled: bool,
}

/// A provisioned instance
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instance {
    /// Instance id
    pub id: String,
    /// Instance type
    pub instance_type: String,
}

/// Failure domain description
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FailureDomainSpec {
    /// Whether control plane machines may be placed here
    pub control_plane: bool,
    /// Free-form attributes
    pub attributes: BTreeMap<String, String>,
}
