//! EC2 instance type capabilities
//!
//! Static table used to enrich machine sets with capacity annotations so that
//! the cluster autoscaler can scale from zero. Built once per process and
//! never mutated.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Compute capacity of one instance type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    /// Number of vCPUs
    pub vcpu: i64,
    /// Memory in MiB
    pub memory_mib: i64,
    /// Number of GPUs
    pub gpu: i64,
}

impl CapabilityDescriptor {
    /// Create a descriptor
    pub const fn new(vcpu: i64, memory_mib: i64, gpu: i64) -> Self {
        Self {
            vcpu,
            memory_mib,
            gpu,
        }
    }
}

const INSTANCE_TYPES: &[(&str, CapabilityDescriptor)] = &[
    ("a1.medium", CapabilityDescriptor::new(1, 2048, 0)),
    ("a1.large", CapabilityDescriptor::new(2, 4096, 0)),
    ("a1.xlarge", CapabilityDescriptor::new(4, 8192, 0)),
    ("a1.2xlarge", CapabilityDescriptor::new(8, 16384, 0)),
    ("a1.4xlarge", CapabilityDescriptor::new(16, 32768, 0)),
    ("c4.large", CapabilityDescriptor::new(2, 3840, 0)),
    ("c4.xlarge", CapabilityDescriptor::new(4, 7680, 0)),
    ("c4.2xlarge", CapabilityDescriptor::new(8, 15360, 0)),
    ("c4.4xlarge", CapabilityDescriptor::new(16, 30720, 0)),
    ("c4.8xlarge", CapabilityDescriptor::new(36, 61440, 0)),
    ("c5.large", CapabilityDescriptor::new(2, 4096, 0)),
    ("c5.xlarge", CapabilityDescriptor::new(4, 8192, 0)),
    ("c5.2xlarge", CapabilityDescriptor::new(8, 16384, 0)),
    ("c5.4xlarge", CapabilityDescriptor::new(16, 32768, 0)),
    ("c5.9xlarge", CapabilityDescriptor::new(36, 73728, 0)),
    ("c5.18xlarge", CapabilityDescriptor::new(72, 147456, 0)),
    ("g3.4xlarge", CapabilityDescriptor::new(16, 124928, 1)),
    ("g3.8xlarge", CapabilityDescriptor::new(32, 249856, 2)),
    ("g3.16xlarge", CapabilityDescriptor::new(64, 499712, 4)),
    ("g4dn.xlarge", CapabilityDescriptor::new(4, 16384, 1)),
    ("g4dn.2xlarge", CapabilityDescriptor::new(8, 32768, 1)),
    ("g4dn.4xlarge", CapabilityDescriptor::new(16, 65536, 1)),
    ("g4dn.12xlarge", CapabilityDescriptor::new(48, 196608, 4)),
    ("g4dn.metal", CapabilityDescriptor::new(96, 393216, 8)),
    ("i3.large", CapabilityDescriptor::new(2, 15616, 0)),
    ("i3.xlarge", CapabilityDescriptor::new(4, 31232, 0)),
    ("i3.2xlarge", CapabilityDescriptor::new(8, 62464, 0)),
    ("i3.4xlarge", CapabilityDescriptor::new(16, 124928, 0)),
    ("m4.large", CapabilityDescriptor::new(2, 8192, 0)),
    ("m4.xlarge", CapabilityDescriptor::new(4, 16384, 0)),
    ("m4.2xlarge", CapabilityDescriptor::new(8, 32768, 0)),
    ("m4.4xlarge", CapabilityDescriptor::new(16, 65536, 0)),
    ("m4.10xlarge", CapabilityDescriptor::new(40, 163840, 0)),
    ("m4.16xlarge", CapabilityDescriptor::new(64, 262144, 0)),
    ("m5.large", CapabilityDescriptor::new(2, 8192, 0)),
    ("m5.xlarge", CapabilityDescriptor::new(4, 16384, 0)),
    ("m5.2xlarge", CapabilityDescriptor::new(8, 32768, 0)),
    ("m5.4xlarge", CapabilityDescriptor::new(16, 65536, 0)),
    ("m5.8xlarge", CapabilityDescriptor::new(32, 131072, 0)),
    ("m5.12xlarge", CapabilityDescriptor::new(48, 196608, 0)),
    ("m5.16xlarge", CapabilityDescriptor::new(64, 262144, 0)),
    ("m5.24xlarge", CapabilityDescriptor::new(96, 393216, 0)),
    ("m5a.large", CapabilityDescriptor::new(2, 8192, 0)),
    ("m5a.xlarge", CapabilityDescriptor::new(4, 16384, 0)),
    ("m5a.2xlarge", CapabilityDescriptor::new(8, 32768, 0)),
    ("p2.xlarge", CapabilityDescriptor::new(4, 62464, 1)),
    ("p2.8xlarge", CapabilityDescriptor::new(32, 499712, 8)),
    ("p2.16xlarge", CapabilityDescriptor::new(64, 749568, 16)),
    ("p3.2xlarge", CapabilityDescriptor::new(8, 62464, 1)),
    ("p3.8xlarge", CapabilityDescriptor::new(32, 249856, 4)),
    ("p3.16xlarge", CapabilityDescriptor::new(64, 499712, 8)),
    ("p3dn.24xlarge", CapabilityDescriptor::new(96, 786432, 8)),
    ("r4.large", CapabilityDescriptor::new(2, 15616, 0)),
    ("r4.xlarge", CapabilityDescriptor::new(4, 31232, 0)),
    ("r4.2xlarge", CapabilityDescriptor::new(8, 62464, 0)),
    ("r5.large", CapabilityDescriptor::new(2, 16384, 0)),
    ("r5.xlarge", CapabilityDescriptor::new(4, 32768, 0)),
    ("r5.2xlarge", CapabilityDescriptor::new(8, 65536, 0)),
    ("r5.4xlarge", CapabilityDescriptor::new(16, 131072, 0)),
    ("t2.micro", CapabilityDescriptor::new(1, 1024, 0)),
    ("t2.small", CapabilityDescriptor::new(1, 2048, 0)),
    ("t2.medium", CapabilityDescriptor::new(2, 4096, 0)),
    ("t2.large", CapabilityDescriptor::new(2, 8192, 0)),
    ("t2.xlarge", CapabilityDescriptor::new(4, 16384, 0)),
    ("t3.micro", CapabilityDescriptor::new(2, 1024, 0)),
    ("t3.small", CapabilityDescriptor::new(2, 2048, 0)),
    ("t3.medium", CapabilityDescriptor::new(2, 4096, 0)),
    ("t3.large", CapabilityDescriptor::new(2, 8192, 0)),
    ("t3.xlarge", CapabilityDescriptor::new(4, 16384, 0)),
    ("t3.2xlarge", CapabilityDescriptor::new(8, 32768, 0)),
];

fn table() -> &'static HashMap<&'static str, CapabilityDescriptor> {
    static TABLE: OnceLock<HashMap<&'static str, CapabilityDescriptor>> = OnceLock::new();
    TABLE.get_or_init(|| INSTANCE_TYPES.iter().copied().collect())
}

/// Look up an instance type
///
/// Unknown types yield a zero descriptor: annotation enrichment is best
/// effort and never fails a reconcile.
pub fn lookup(instance_type: &str) -> CapabilityDescriptor {
    table().get(instance_type).copied().unwrap_or_default()
}

/// Whether the table knows an instance type
pub fn is_known(instance_type: &str) -> bool {
    table().contains_key(instance_type)
}
