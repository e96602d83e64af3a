//! Drift detection / update planning.
//!
//! Generic field-comparison rules shared by every kind's update planner:
//!
//! - a desired value that is unset (None, empty string, empty map) is
//!   skipped; absence in the spec never forces an update back to empty
//! - a desired value that differs from the current remote value is copied
//!   into the patch
//! - map-typed fields (free-form tags) are replaced wholesale when any key
//!   differs; there is no per-key tag diffing
//! - immutable fields are simply never offered to the builder
//!
//! The adapter builds a kind-specific patch struct with one builder pass and
//! finishes with [`PatchBuilder::finish`], which yields `None` when nothing
//! drifted so the orchestrator can skip the remote Update entirely.

use std::collections::BTreeMap;

/// Accumulates "does anything differ" across field comparisons.
#[derive(Debug, Default)]
pub struct PatchBuilder {
    changed: bool,
}

impl PatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare one mutable field with `PartialEq` equality.
    ///
    /// `current` is optional because remote representations may omit fields
    /// the service never populated; a set desired value still wins then.
    pub fn field<T: PartialEq + Clone>(
        &mut self,
        desired: Option<&T>,
        current: Option<&T>,
        slot: &mut Option<T>,
    ) {
        let Some(desired) = desired else {
            return;
        };
        if current != Some(desired) {
            *slot = Some(desired.clone());
            self.changed = true;
        }
    }

    /// Compare a string field. Empty desired strings count as unset.
    pub fn text(&mut self, desired: Option<&str>, current: &str, slot: &mut Option<String>) {
        let Some(desired) = desired else {
            return;
        };
        if desired.is_empty() {
            return;
        }
        if desired != current {
            *slot = Some(desired.to_string());
            self.changed = true;
        }
    }

    /// Compare a free-form tag map. Replaced wholesale when any key differs;
    /// an empty desired map counts as unset.
    pub fn tags(
        &mut self,
        desired: Option<&BTreeMap<String, String>>,
        current: &BTreeMap<String, String>,
        slot: &mut Option<BTreeMap<String, String>>,
    ) {
        let Some(desired) = desired else {
            return;
        };
        if desired.is_empty() {
            return;
        }
        if desired != current {
            *slot = Some(desired.clone());
            self.changed = true;
        }
    }

    /// Whether any compared field drifted.
    pub fn needs_update(&self) -> bool {
        self.changed
    }

    /// Yield the populated patch, or `None` when no field drifted.
    pub fn finish<P>(self, patch: P) -> Option<P> {
        self.changed.then_some(patch)
    }
}
