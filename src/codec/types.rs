//! In-memory provider configuration
//!
//! Every supported wire version converts into [`ProviderConfig`]. The current
//! schema (v1beta1) serializes it directly, so field names below are the
//! current wire names.

use serde::{Deserialize, Serialize};

/// Typed AWS machine provider configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// AMI to boot
    #[serde(default)]
    pub ami: AwsResourceReference,

    /// EC2 instance type (e.g., "m4.xlarge")
    #[serde(default)]
    pub instance_type: String,

    /// Tags applied to the instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagSpecification>,

    /// IAM instance profile attached to the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_instance_profile: Option<AwsResourceReference>,

    /// Secret holding the instance user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<SecretReference>,

    /// Secret holding the AWS credentials used to manage the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<SecretReference>,

    /// SSH key pair name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Index of the primary network interface
    #[serde(default)]
    pub device_index: i64,

    /// Whether to associate a public IP
    #[serde(rename = "publicIP", default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<bool>,

    /// Security groups attached to the instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<AwsResourceReference>,

    /// Subnet the instance is launched into
    #[serde(default)]
    pub subnet: AwsResourceReference,

    /// Region and availability zone
    #[serde(default)]
    pub placement: Placement,

    /// Load balancers the instance registers with
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_balancers: Vec<LoadBalancerReference>,

    /// Block device mappings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_devices: Vec<BlockDeviceMapping>,
}

/// Reference to an AWS resource by id, ARN, or filters
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsResourceReference {
    /// Resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Resource ARN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    /// Describe filters, used when neither id nor ARN is set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl AwsResourceReference {
    /// Reference a resource by a single filter
    pub fn by_filter(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            filters: vec![Filter {
                name: name.into(),
                values,
            }],
            ..Default::default()
        }
    }
}

/// EC2 describe filter
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Filter {
    /// Filter name (e.g., "tag:Name")
    pub name: String,
    /// Accepted values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Instance tag
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TagSpecification {
    /// Tag key
    pub name: String,
    /// Tag value
    pub value: String,
}

/// Reference to a secret in the resource's namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SecretReference {
    /// Secret name
    pub name: String,
}

/// Instance placement
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// AWS region
    #[serde(default)]
    pub region: String,

    /// Availability zone
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,

    /// Instance tenancy (default, dedicated, host)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<String>,
}

/// Load balancer registration
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct LoadBalancerReference {
    /// Load balancer name
    pub name: String,
    /// Load balancer type ("classic" or "network")
    #[serde(rename = "type")]
    pub type_: String,
}

/// Block device mapping
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockDeviceMapping {
    /// Device name (e.g., "/dev/xvda")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    /// EBS volume parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs: Option<EbsBlockDevice>,
}

/// EBS volume parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EbsBlockDevice {
    /// Volume size in GiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<i64>,

    /// Volume type (gp2, gp3, io1, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,

    /// Provisioned IOPS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,

    /// Whether the volume is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted: Option<bool>,
}
