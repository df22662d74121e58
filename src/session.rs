//! Cloud session construction
//!
//! A session is the region, the effective service endpoints and resolved
//! credentials for one reconcile. Building one does no network I/O and
//! nothing is cached between calls.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
use mockall::automock;

use crate::credentials::{AwsCredentials, CredentialSource};
use crate::Error;

/// Regions a session may be created for
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "cn-north-1",
    "cn-northwest-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-west-1",
    "us-west-2",
];

/// Whether `region` is in [`KNOWN_REGIONS`]
pub fn is_known_region(region: &str) -> bool {
    KNOWN_REGIONS.contains(&region)
}

/// Endpoint override for one cloud service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service identifier, e.g. `ec2` or `elasticloadbalancing`
    pub service_id: String,
    /// Base URL requests are sent to
    pub url: String,
    /// Region used for request signing, if different from the session's
    pub signing_region: Option<String>,
}

impl ServiceEndpoint {
    /// Create an override without a signing region
    pub fn new(service_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            url: url.into(),
            signing_region: None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.service_id.trim().is_empty() {
            return Err(format!("endpoint override {} has an empty service id", self.url));
        }
        let host = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"));
        match host {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
            _ => Err(format!(
                "endpoint override for {} has invalid URL {:?}",
                self.service_id, self.url
            )),
        }
    }
}

impl FromStr for ServiceEndpoint {
    type Err = String;

    /// Parse `service=url` or `service=url@signing-region`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service_id, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected service=url[@region], got {:?}", s))?;
        let (url, signing_region) = match rest.rsplit_once('@') {
            Some((url, region)) if is_region_shaped(region) => (url, Some(region.to_string())),
            _ => (rest, None),
        };
        let endpoint = Self {
            service_id: service_id.trim().to_string(),
            url: url.trim().to_string(),
            signing_region,
        };
        endpoint.validate()?;
        Ok(endpoint)
    }
}

/// Whether `s` has the shape of a region name, e.g. `us-gov-west-1`
///
/// Keeps userinfo such as `https://user@host` from being read as a signing
/// region.
fn is_region_shaped(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    let lower = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase());
    match parts.as_slice() {
        [prefix, middle @ .., number] if !middle.is_empty() => {
            prefix.len() == 2
                && lower(prefix)
                && middle.iter().all(lower)
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.service_id, self.url)?;
        if let Some(region) = &self.signing_region {
            write!(f, "@{}", region)?;
        }
        Ok(())
    }
}

/// Effective client settings for one service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Region requests are signed for
    pub signing_region: String,
}

/// Per-reconcile cloud session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionHandle {
    region: String,
    endpoints: Vec<ServiceEndpoint>,
    credentials: AwsCredentials,
}

impl SessionHandle {
    /// Region the session targets
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint overrides in effect
    pub fn endpoints(&self) -> &[ServiceEndpoint] {
        &self.endpoints
    }

    /// Resolved credentials
    pub fn credentials(&self) -> &AwsCredentials {
        &self.credentials
    }

    /// Client settings for `service`, honoring overrides
    pub fn client_config(&self, service: &str) -> ClientConfig {
        match self.endpoints.iter().find(|e| e.service_id == service) {
            Some(endpoint) => ClientConfig {
                endpoint: endpoint.url.clone(),
                signing_region: endpoint
                    .signing_region
                    .clone()
                    .unwrap_or_else(|| self.region.clone()),
            },
            None => ClientConfig {
                endpoint: format!(
                    "https://{}.{}.{}",
                    service,
                    self.region,
                    partition_domain(&self.region)
                ),
                signing_region: self.region.clone(),
            },
        }
    }
}

fn partition_domain(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    }
}

/// Builds cloud sessions
#[cfg_attr(test, automock)]
pub trait SessionFactory: Send + Sync {
    /// Build a session for `region` with the given overrides and credentials
    ///
    /// Fails with [`Error::Configuration`] for an unknown region or invalid
    /// override and with [`Error::Credential`] when no credentials resolve.
    fn new_session(
        &self,
        region: &str,
        endpoints: &[ServiceEndpoint],
        credentials: &CredentialSource,
    ) -> Result<SessionHandle, Error>;
}

/// [`SessionFactory`] for AWS
#[derive(Clone, Copy, Debug, Default)]
pub struct AwsSessionFactory;

impl SessionFactory for AwsSessionFactory {
    fn new_session(
        &self,
        region: &str,
        endpoints: &[ServiceEndpoint],
        credentials: &CredentialSource,
    ) -> Result<SessionHandle, Error> {
        if region.is_empty() {
            return Err(Error::configuration("session", "region is empty"));
        }
        if !is_known_region(region) {
            return Err(Error::configuration(
                "session",
                format!("unknown region {:?}", region),
            ));
        }

        let mut seen = HashSet::new();
        for endpoint in endpoints {
            endpoint
                .validate()
                .map_err(|msg| Error::configuration("session", msg))?;
            if !seen.insert(endpoint.service_id.as_str()) {
                return Err(Error::configuration(
                    "session",
                    format!("duplicate endpoint override for {}", endpoint.service_id),
                ));
            }
        }

        let credentials = credentials.resolve()?;

        Ok(SessionHandle {
            region: region.to_string(),
            endpoints: endpoints.to_vec(),
            credentials,
        })
    }
}
