//! Provider configuration codec
//!
//! Provider configuration travels inside a resource's `providerSpec.value` as
//! an opaque JSON document tagged with `apiVersion` and `kind`. The codec
//! dispatches purely on that embedded marker, never on what the caller
//! expects, so objects stored under an older schema keep decoding while they
//! are migrated.
//!
//! # Example
//!
//! ```ignore
//! let codec = ProviderConfigCodec::new();
//! let spec = codec.encode_provider_spec(&config)?;
//! let decoded = codec.decode_provider_spec(&spec)?;
//! assert_eq!(decoded, config);
//! ```

mod types;
pub mod v1alpha1;

pub use types::{
    AwsResourceReference, BlockDeviceMapping, EbsBlockDevice, Filter, LoadBalancerReference,
    Placement, ProviderConfig, SecretReference, TagSpecification,
};

use serde::{Deserialize, Serialize};

use crate::crd::ProviderSpec;
use crate::Error;

/// Kind marker shared by every supported schema version
pub const PROVIDER_CONFIG_KIND: &str = "AWSMachineProviderConfig";

/// apiVersion marker of the current schema
pub const V1BETA1_API_VERSION: &str = "awsproviderconfig.openshift.io/v1beta1";

/// Schema versions the codec can read and write
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// Legacy `awsproviderconfig.k8s.io/v1alpha1`
    V1Alpha1,
    /// Current `awsproviderconfig.openshift.io/v1beta1`
    V1Beta1,
}

impl SchemaVersion {
    /// Version every encode is tagged with
    pub const CURRENT: SchemaVersion = SchemaVersion::V1Beta1;

    /// All registered versions
    pub const ALL: [SchemaVersion; 2] = [SchemaVersion::V1Alpha1, SchemaVersion::V1Beta1];

    /// The embedded apiVersion marker
    pub fn api_version(self) -> &'static str {
        match self {
            SchemaVersion::V1Alpha1 => v1alpha1::API_VERSION,
            SchemaVersion::V1Beta1 => V1BETA1_API_VERSION,
        }
    }

    /// Resolve an embedded `{apiVersion, kind}` marker
    pub fn from_marker(api_version: &str, kind: &str) -> Option<Self> {
        if kind != PROVIDER_CONFIG_KIND {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|v| v.api_version() == api_version)
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.api_version(), PROVIDER_CONFIG_KIND)
    }
}

/// A decoded payload, tagged with the schema it was stored under
#[derive(Clone, Debug, PartialEq)]
pub enum VersionedProviderConfig {
    /// Stored as v1alpha1
    V1Alpha1(v1alpha1::AwsMachineProviderConfig),
    /// Stored as v1beta1
    V1Beta1(ProviderConfig),
}

impl VersionedProviderConfig {
    /// The schema the payload was stored under
    pub fn version(&self) -> SchemaVersion {
        match self {
            VersionedProviderConfig::V1Alpha1(_) => SchemaVersion::V1Alpha1,
            VersionedProviderConfig::V1Beta1(_) => SchemaVersion::V1Beta1,
        }
    }

    /// Convert into the in-memory configuration
    pub fn into_config(self) -> ProviderConfig {
        match self {
            VersionedProviderConfig::V1Alpha1(legacy) => legacy.into(),
            VersionedProviderConfig::V1Beta1(config) => config,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Marker {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, T: Serialize> {
    api_version: &'a str,
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

/// Encodes and decodes AWS machine provider configuration
#[derive(Clone, Copy, Debug, Default)]
pub struct ProviderConfigCodec;

impl ProviderConfigCodec {
    /// Create a codec with every schema version registered
    pub fn new() -> Self {
        Self
    }

    /// Decode a payload, keeping the schema it was stored under
    pub fn decode_versioned(&self, raw: &[u8]) -> Result<VersionedProviderConfig, Error> {
        let value: serde_json::Value = serde_json::from_slice(raw)
            .map_err(|e| Error::malformed("unknown", format!("not a JSON document: {}", e)))?;
        if !value.is_object() {
            return Err(Error::malformed("unknown", "payload is not a JSON object"));
        }

        let marker: Marker = serde_json::from_value(value.clone())
            .map_err(|e| Error::malformed("unknown", format!("invalid type marker: {}", e)))?;
        let version = match (marker.api_version.as_deref(), marker.kind.as_deref()) {
            (Some(api_version), Some(kind)) => SchemaVersion::from_marker(api_version, kind),
            _ => None,
        }
        .ok_or_else(|| Error::schema(marker.api_version.clone(), marker.kind.clone()))?;

        let malformed = |e: serde_json::Error| Error::malformed(version.to_string(), e.to_string());
        match version {
            SchemaVersion::V1Alpha1 => serde_json::from_value(value)
                .map(VersionedProviderConfig::V1Alpha1)
                .map_err(malformed),
            SchemaVersion::V1Beta1 => serde_json::from_value(value)
                .map(VersionedProviderConfig::V1Beta1)
                .map_err(malformed),
        }
    }

    /// Decode a payload into the in-memory configuration
    pub fn decode(&self, raw: &[u8]) -> Result<ProviderConfig, Error> {
        self.decode_versioned(raw).map(VersionedProviderConfig::into_config)
    }

    /// Encode under the current schema version
    pub fn encode(&self, config: &ProviderConfig) -> Result<Vec<u8>, Error> {
        self.encode_as(config, SchemaVersion::CURRENT)
    }

    /// Encode under a specific schema version
    ///
    /// Fails if the value uses fields the target version cannot represent.
    pub fn encode_as(
        &self,
        config: &ProviderConfig,
        version: SchemaVersion,
    ) -> Result<Vec<u8>, Error> {
        let api_version = version.api_version();
        let result = match version {
            SchemaVersion::V1Alpha1 => {
                let legacy = v1alpha1::AwsMachineProviderConfig::try_from(config)?;
                serde_json::to_vec(&Envelope {
                    api_version,
                    kind: PROVIDER_CONFIG_KIND,
                    body: &legacy,
                })
            }
            SchemaVersion::V1Beta1 => serde_json::to_vec(&Envelope {
                api_version,
                kind: PROVIDER_CONFIG_KIND,
                body: config,
            }),
        };
        result.map_err(|e| Error::encode(version.to_string(), e.to_string()))
    }

    /// Decode the provider config embedded in a resource
    pub fn decode_provider_spec(&self, spec: &ProviderSpec) -> Result<ProviderConfig, Error> {
        let raw = spec
            .raw()?
            .ok_or_else(|| Error::malformed("unknown", "providerSpec.value is not set"))?;
        self.decode(&raw)
    }

    /// Encode a config into a resource's provider spec
    pub fn encode_provider_spec(&self, config: &ProviderConfig) -> Result<ProviderSpec, Error> {
        ProviderSpec::from_raw(&self.encode(config)?)
    }
}
