//! Snapshot-then-diff persistence
//!
//! A [`PatchHelper`] captures an object when a scope is built. On close the
//! live object is diffed against that snapshot and only the difference is
//! sent, guarded by the snapshot's resourceVersion.

use kube::api::DynamicObject;
use serde_json::Value;
use tracing::debug;

use crate::patch::merge_diff;
use crate::store::{MergePatch, ObjectStore, ResourceRef};
use crate::Error;

/// Pre-mutation snapshot of one object
#[derive(Clone, Debug)]
pub struct PatchHelper {
    reference: ResourceRef,
    before: Value,
    resource_version: Option<String>,
}

impl PatchHelper {
    /// Snapshot `obj`
    ///
    /// The object must carry apiVersion and kind so it can be patched later.
    pub fn new(obj: &DynamicObject) -> Result<Self, Error> {
        let reference = ResourceRef::for_dynamic(obj).ok_or_else(|| {
            Error::invalid_input(format!(
                "object {} has no apiVersion/kind",
                obj.metadata.name.as_deref().unwrap_or("<unnamed>")
            ))
        })?;
        let before = serde_json::to_value(obj)
            .map_err(|e| Error::serialization_for_kind(reference.kind.clone(), e.to_string()))?;

        Ok(Self {
            reference,
            before,
            resource_version: obj.metadata.resource_version.clone(),
        })
    }

    /// Object the snapshot belongs to
    pub fn reference(&self) -> &ResourceRef {
        &self.reference
    }

    /// Merge patch from the snapshot to `live`
    pub fn diff(&self, live: &DynamicObject) -> Result<MergePatch, Error> {
        let after = serde_json::to_value(live).map_err(|e| {
            Error::serialization_for_kind(self.reference.kind.clone(), e.to_string())
        })?;
        Ok(MergePatch::new(
            merge_diff(&self.before, &after),
            self.resource_version.clone(),
        ))
    }

    /// Persist the changes made to `live` since the snapshot
    ///
    /// Status changes go to the status subresource; everything else goes to
    /// the main resource, which is written first. The first write carries the
    /// snapshot's resourceVersion. A status write that follows a main write
    /// cannot, since the main write has already moved the version on.
    ///
    /// Returns whether a store call was made; an unchanged object is not
    /// written.
    pub async fn patch(&self, store: &dyn ObjectStore, live: &DynamicObject) -> Result<bool, Error> {
        let (main, status) = self.diff(live)?.split_status();
        let main = (!main.is_empty()).then_some(main);

        if main.is_none() && status.is_none() {
            debug!(resource = %self.reference, "no changes to persist");
            return Ok(false);
        }

        if let Some(main) = &main {
            store.patch(&self.reference, main).await?;
        }
        if let Some(mut status) = status {
            if main.is_some() {
                status.resource_version = None;
            }
            store.patch_status(&self.reference, &status).await?;
        }
        Ok(true)
    }
}
