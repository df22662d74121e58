//! Resource definitions reconciled by this crate
//!
//! Machines and machine sets carry the opaque provider spec; the CAPI
//! `Cluster` is the owner a guest cluster scope is built against.

mod cluster;
mod machine;

pub use cluster::{
    Cluster, ClusterNetwork, ClusterSpec, ClusterStatus, CLUSTER_NAME_LABEL,
    DEFAULT_API_SERVER_PORT,
};
pub use machine::{
    Machine, MachineSet, MachineSetSpec, MachineSetStatus, MachineSpec, MachineStatus,
    MachineTemplateMeta, MachineTemplateSpec, ProviderSpec,
};
