//! Cloud provider credentials
//!
//! Credentials are resolved at session construction time, never cached:
//! secrets rotate between reconciles and a stale key would fail silently at
//! the first API call.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::store::{ObjectStore, ResourceRef};
use crate::Error;

/// Environment variable holding the access key id
pub const AWS_ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key
pub const AWS_SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding an optional session token
pub const AWS_SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// Secret key holding the access key id
pub const AWS_CREDS_SECRET_ID_KEY: &str = "aws_access_key_id";
/// Secret key holding the secret access key
pub const AWS_CREDS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

/// AWS credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// AWS access key ID
    pub access_key_id: String,
    /// AWS secret access key
    pub secret_access_key: String,
    /// Optional session token for temporary credentials
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    /// Load credentials from the process environment
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an environment-style lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Some(Self {
            access_key_id: get(AWS_ACCESS_KEY_ID_ENV)?,
            secret_access_key: get(AWS_SECRET_ACCESS_KEY_ENV)?,
            session_token: get(AWS_SESSION_TOKEN_ENV),
        })
    }

    /// Load credentials from a secret's decoded data
    pub fn from_secret_data(data: &BTreeMap<String, String>) -> Option<Self> {
        let get = |key: &str| data.get(key).filter(|v| !v.is_empty()).cloned();
        Some(Self {
            access_key_id: get(AWS_CREDS_SECRET_ID_KEY)?,
            secret_access_key: get(AWS_CREDS_SECRET_ACCESS_KEY)?,
            session_token: None,
        })
    }
}

/// Secret data keys of an untyped v1 Secret, decoded
fn secret_object_data(obj: &kube::api::DynamicObject) -> Result<BTreeMap<String, String>, Error> {
    match obj.data.get("data") {
        Some(serde_json::Value::Object(data)) => decode_secret_values(data),
        Some(serde_json::Value::Null) | None => Ok(BTreeMap::new()),
        Some(_) => Err(Error::credential("secret data is not an object")),
    }
}

/// Decode base64 secret values taken from an untyped object
pub fn decode_secret_values(
    data: &serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<String, String>, Error> {
    data.iter()
        .map(|(key, value)| {
            let encoded = value
                .as_str()
                .ok_or_else(|| Error::credential(format!("secret key {} is not a string", key)))?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| Error::credential(format!("secret key {}: {}", key, e)))?;
            let text = String::from_utf8(bytes)
                .map_err(|_| Error::credential(format!("secret key {} is not valid UTF-8", key)))?;
            Ok((key.clone(), text))
        })
        .collect()
}

/// Where a session looks for credentials
#[derive(Clone, Debug, Default)]
pub enum CredentialSource {
    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the process
    #[default]
    Environment,
    /// Decoded data of a referenced secret, falling back to the environment
    Secret {
        /// `namespace/name` of the secret, for error messages
        name: String,
        /// Decoded secret data
        data: BTreeMap<String, String>,
    },
    /// Fixed credentials
    Static(AwsCredentials),
}

impl CredentialSource {
    /// Load the secret `namespace/name` through `store`
    ///
    /// A missing secret is not an error: resolution then falls back to the
    /// environment, as it does for a secret lacking either key.
    pub async fn from_secret_ref(
        store: &dyn ObjectStore,
        namespace: &str,
        name: &str,
    ) -> Result<Self, Error> {
        let reference = ResourceRef::new("v1", "Secret", namespace, name);
        let data = match store.get(&reference).await {
            Ok(obj) => secret_object_data(&obj)?,
            Err(e) if e.is_not_found() => {
                warn!(secret = %reference.key(), "credentials secret not found, using environment");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        debug!(secret = %reference.key(), keys = data.len(), "loaded credentials secret");
        Ok(CredentialSource::Secret {
            name: reference.key(),
            data,
        })
    }

    /// Resolve credentials now
    pub fn resolve(&self) -> Result<AwsCredentials, Error> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve credentials using an explicit environment lookup
    pub fn resolve_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<AwsCredentials, Error> {
        match self {
            CredentialSource::Static(creds) => Ok(creds.clone()),
            CredentialSource::Environment => AwsCredentials::from_lookup(env).ok_or_else(|| {
                Error::credential(format!(
                    "{} and {} are not set",
                    AWS_ACCESS_KEY_ID_ENV, AWS_SECRET_ACCESS_KEY_ENV
                ))
            }),
            CredentialSource::Secret { name, data } => AwsCredentials::from_secret_data(data)
                .or_else(|| AwsCredentials::from_lookup(env))
                .ok_or_else(|| {
                    Error::credential(format!(
                        "secret {} lacks {}/{} and the environment has no credentials",
                        name, AWS_CREDS_SECRET_ID_KEY, AWS_CREDS_SECRET_ACCESS_KEY
                    ))
                }),
        }
    }
}
