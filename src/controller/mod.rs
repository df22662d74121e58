//! Controller implementations
//!
//! Controllers follow the level-triggered observe-diff-act loop: every
//! reconcile reads current state, computes the desired delta and writes only
//! that delta.

mod machineset;

pub use machineset::{
    apply_capacity_annotations, capacity_annotations, error_policy, reconcile, reconcile_ref,
    requeue_delay, Context, ReconcileOutcome, CONFIGURATION_REQUEUE, CONFLICT_REQUEUE,
    DECODE_REQUEUE, DEFAULT_CONTROLLER_NAME, GPU_ANNOTATION, MEMORY_ANNOTATION,
    TRANSIENT_REQUEUE, VCPU_ANNOTATION,
};
