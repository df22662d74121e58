//! Legacy `awsproviderconfig.k8s.io/v1alpha1` wire schema
//!
//! Objects written by older actuators still carry this version. It lacks key
//! names, device indexes, tenancy, load balancers and block devices, spells
//! the public IP flag `publicIp`, and keys tags by `key`.

use serde::{Deserialize, Serialize};

use super::types::{
    AwsResourceReference, Placement, ProviderConfig, SecretReference, TagSpecification,
};
use crate::Error;

/// apiVersion marker of this schema
pub const API_VERSION: &str = "awsproviderconfig.k8s.io/v1alpha1";

/// Wire representation of a v1alpha1 machine provider config
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineProviderConfig {
    /// AMI to boot
    #[serde(default)]
    pub ami: AwsResourceReference,
    /// EC2 instance type
    #[serde(default)]
    pub instance_type: String,
    /// Instance tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// IAM instance profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_instance_profile: Option<AwsResourceReference>,
    /// Secret holding user data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<SecretReference>,
    /// Secret holding AWS credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<SecretReference>,
    /// Whether to associate a public IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<bool>,
    /// Security groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<AwsResourceReference>,
    /// Subnet
    #[serde(default)]
    pub subnet: AwsResourceReference,
    /// Region and availability zone
    #[serde(default)]
    pub placement: LegacyPlacement,
}

/// v1alpha1 tag
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

/// v1alpha1 placement, without tenancy
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPlacement {
    /// AWS region
    #[serde(default)]
    pub region: String,
    /// Availability zone
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_zone: String,
}

impl From<AwsMachineProviderConfig> for ProviderConfig {
    fn from(legacy: AwsMachineProviderConfig) -> Self {
        Self {
            ami: legacy.ami,
            instance_type: legacy.instance_type,
            tags: legacy
                .tags
                .into_iter()
                .map(|t| TagSpecification {
                    name: t.key,
                    value: t.value,
                })
                .collect(),
            iam_instance_profile: legacy.iam_instance_profile,
            user_data_secret: legacy.user_data_secret,
            credentials_secret: legacy.credentials_secret,
            public_ip: legacy.public_ip,
            security_groups: legacy.security_groups,
            subnet: legacy.subnet,
            placement: Placement {
                region: legacy.placement.region,
                availability_zone: legacy.placement.availability_zone,
                tenancy: None,
            },
            ..Default::default()
        }
    }
}

impl TryFrom<&ProviderConfig> for AwsMachineProviderConfig {
    type Error = Error;

    /// Down-convert, refusing values that would lose fields
    fn try_from(config: &ProviderConfig) -> Result<Self, Self::Error> {
        let mut dropped = Vec::new();
        if config.key_name.is_some() {
            dropped.push("keyName");
        }
        if config.device_index != 0 {
            dropped.push("deviceIndex");
        }
        if config.placement.tenancy.is_some() {
            dropped.push("placement.tenancy");
        }
        if !config.load_balancers.is_empty() {
            dropped.push("loadBalancers");
        }
        if !config.block_devices.is_empty() {
            dropped.push("blockDevices");
        }
        if !dropped.is_empty() {
            return Err(Error::encode(
                API_VERSION,
                format!("fields not representable: {}", dropped.join(", ")),
            ));
        }

        Ok(Self {
            ami: config.ami.clone(),
            instance_type: config.instance_type.clone(),
            tags: config
                .tags
                .iter()
                .map(|t| Tag {
                    key: t.name.clone(),
                    value: t.value.clone(),
                })
                .collect(),
            iam_instance_profile: config.iam_instance_profile.clone(),
            user_data_secret: config.user_data_secret.clone(),
            credentials_secret: config.credentials_secret.clone(),
            public_ip: config.public_ip,
            security_groups: config.security_groups.clone(),
            subnet: config.subnet.clone(),
            placement: LegacyPlacement {
                region: config.placement.region.clone(),
                availability_zone: config.placement.availability_zone.clone(),
            },
        })
    }
}
