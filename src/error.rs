//! Error types for the reconciler
//!
//! Every fallible step returns one of these variants with enough context
//! (which step, which resource) for an operator to diagnose the failure from
//! the log line alone.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for reconciler operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested object does not exist in the store
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// `namespace/name` of the missing object
        name: String,
    },

    /// Missing or invalid region, endpoint override or other configuration
    #[error("configuration error for {resource}: {message}")]
    Configuration {
        /// Resource whose configuration is invalid
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// No usable credential source
    #[error("credential error: {message}")]
    Credential {
        /// Description of which sources were tried
        message: String,
    },

    /// Session factory failed while building a scope
    #[error("failed to create session for {resource}: {source}")]
    SessionCreation {
        /// Resource the scope was being built for
        resource: String,
        /// The session factory failure
        #[source]
        source: Box<Error>,
    },

    /// Provider config payload carries an unrecognised version/kind marker
    #[error("unrecognised provider config schema {api_version:?}/{kind:?}")]
    Schema {
        /// Embedded apiVersion, if any
        api_version: Option<String>,
        /// Embedded kind, if any
        kind: Option<String>,
    },

    /// Provider config payload cannot be parsed under the matched schema
    #[error("malformed provider config payload ({schema}): {message}")]
    MalformedPayload {
        /// Schema the payload was parsed against
        schema: String,
        /// Parser message
        message: String,
    },

    /// Provider config could not be serialized
    #[error("failed to encode provider config as {schema}: {message}")]
    Encode {
        /// Target schema
        schema: String,
        /// Description of what failed
        message: String,
    },

    /// Provider config decode failed during a reconcile
    #[error("failed to decode provider config of {resource}: {source}")]
    Decode {
        /// Resource whose payload failed to decode
        resource: String,
        /// The codec failure
        #[source]
        source: Box<Error>,
    },

    /// Optimistic concurrency violation on patch
    #[error("conflict patching {resource}: {message}")]
    Conflict {
        /// Resource that was concurrently modified
        resource: String,
        /// Store message
        message: String,
    },

    /// Required input was absent
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the missing input
        message: String,
    },

    /// A store call did not complete in time
    #[error("{operation} on {resource} timed out after {seconds}s")]
    Timeout {
        /// Store operation (get, patch, list)
        operation: String,
        /// Resource the call targeted
        resource: String,
        /// Elapsed timeout in seconds
        seconds: u64,
    },

    /// Kubernetes API error
    #[error("kubernetes error [{context}]: {source}")]
    Kube {
        /// Context where the error occurred (e.g., "get", "patch")
        context: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// Serialization/deserialization error outside the codec
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl From<kube::Error> for Error {
    fn from(source: kube::Error) -> Self {
        Self::Kube {
            context: UNKNOWN_CONTEXT.to_string(),
            source,
        }
    }
}

impl Error {
    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a configuration error with resource context
    pub fn configuration(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential {
            message: msg.into(),
        }
    }

    /// Wrap a session factory failure
    pub fn session_creation(resource: impl Into<String>, source: Error) -> Self {
        Self::SessionCreation {
            resource: resource.into(),
            source: Box::new(source),
        }
    }

    /// Create a schema error from the marker found in the payload
    pub fn schema(api_version: Option<String>, kind: Option<String>) -> Self {
        Self::Schema { api_version, kind }
    }

    /// Create a malformed payload error
    pub fn malformed(schema: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedPayload {
            schema: schema.into(),
            message: msg.into(),
        }
    }

    /// Create an encode error
    pub fn encode(schema: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Encode {
            schema: schema.into(),
            message: msg.into(),
        }
    }

    /// Wrap a codec failure with the resource being reconciled
    pub fn decode(resource: impl Into<String>, source: Error) -> Self {
        Self::Decode {
            resource: resource.into(),
            source: Box::new(source),
        }
    }

    /// Create a conflict error
    pub fn conflict(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(
        operation: impl Into<String>,
        resource: impl Into<String>,
        seconds: u64,
    ) -> Self {
        Self::Timeout {
            operation: operation.into(),
            resource: resource.into(),
            seconds,
        }
    }

    /// Wrap a kube-rs error with the operation that produced it
    pub fn kube(context: impl Into<String>, source: kube::Error) -> Self {
        Self::Kube {
            context: context.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// True for the benign "object is gone" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for optimistic concurrency violations
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is worth retrying
    ///
    /// Everything is retried except invalid input and encode faults, which are
    /// programming errors. Decode failures are retried because a conversion
    /// webhook may not have run yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::InvalidInput { .. } | Error::Encode { .. } => false,
            Error::Kube { source, .. } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code) && ae.code != 409 && ae.code != 429
            ),
            _ => true,
        }
    }

    /// True when the error cannot resolve without a human
    ///
    /// Only a payload whose marker no registered schema recognises qualifies.
    pub fn requires_operator(&self) -> bool {
        match self {
            Error::Schema { .. } => true,
            Error::Decode { source, .. } => source.requires_operator(),
            _ => false,
        }
    }

    /// Name of the resource this error is about, when known
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::NotFound { name, .. } => Some(name),
            Error::Configuration { resource, .. }
            | Error::SessionCreation { resource, .. }
            | Error::Decode { resource, .. }
            | Error::Conflict { resource, .. }
            | Error::Timeout { resource, .. } => Some(resource),
            _ => None,
        }
    }
}
