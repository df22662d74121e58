//! capa-reconciler - reconciliation core for AWS-backed cluster machines
//!
//! Drives MachineSets and guest clusters toward their declared state using a
//! versioned provider configuration embedded in each resource.
//!
//! # Architecture
//!
//! Every reconcile is level-triggered and self-contained:
//! - The object is fetched fresh from the [`store`]
//! - Its provider configuration is decoded by the [`codec`]
//! - Derived state is computed from static tables ([`instance_types`])
//! - Only the changed fields are written back as a merge [`patch`], guarded
//!   by the fetched resourceVersion
//!
//! Cloud-facing reconciles build a per-reconcile [`scope`] holding a fresh
//! [`session`] and a snapshot of the object, persisted on close.
//!
//! # Modules
//!
//! - [`controller`] - MachineSet reconciler and controller-runtime adapter
//! - [`codec`] - Versioned provider config encode/decode
//! - [`instance_types`] - Instance type capacity table
//! - [`scope`] - Per-reconcile scopes and snapshot-then-diff persistence
//! - [`session`] - Cloud session construction
//! - [`credentials`] - AWS credential resolution
//! - [`store`] - Object store abstraction over the Kubernetes API
//! - [`patch`] - JSON merge patch computation
//! - [`crd`] - Resource definitions
//! - [`config`] - Controller configuration
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod codec;
pub mod config;
pub mod controller;
pub mod crd;
pub mod credentials;
pub mod error;
pub mod instance_types;
pub mod patch;
pub mod scope;
pub mod session;
pub mod store;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
