//! Document encoding and merge-write helpers.
//!
//! Profiles are stored as JSON documents. Writers never send the whole
//! document back: they send a merge patch holding only the fields they
//! changed, so features that touch disjoint parts of the same profile do
//! not overwrite each other.

use serde_json::{Map, Value};

use super::types::UserProfile;
use crate::error::{CoreError, Result};

impl UserProfile {
    /// Decode a stored document. Fails closed on any unknown, mistyped or
    /// missing non-optional field instead of defaulting it.
    pub fn from_document(doc: &Value) -> Result<Self> {
        serde_json::from_value(doc.clone())
            .map_err(|e| CoreError::Parse(format!("profile document rejected: {e}")))
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Apply a JSON merge patch (RFC 7396) to `target` in place.
///
/// Objects merge recursively, `null` removes a key, anything else
/// replaces the target value wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_map) = target else {
        return;
    };

    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
        } else {
            merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
        }
    }
}

/// Key under which every achievement category stores its unlocked thresholds.
const UNLOCKED_KEY: &str = "unlockedMilestones";

/// [`merge_patch`] for profile documents.
///
/// Unlocked milestone sets only grow: a patch carrying a smaller
/// `unlockedMilestones` array than the stored one (a writer working from
/// an older read) is unioned with the stored set instead of replacing it.
pub fn merge_profile_patch(target: &mut Value, patch: &Value) {
    let before = target.clone();
    merge_patch(target, patch);
    keep_unlocked(&before, target);
}

fn keep_unlocked(before: &Value, after: &mut Value) {
    let (Value::Object(before), Value::Object(after)) = (before, after) else {
        return;
    };
    for (key, old) in before {
        if key == UNLOCKED_KEY {
            match after.get_mut(key) {
                Some(new) => union_unlocked(old, new),
                None => {
                    after.insert(key.clone(), old.clone());
                }
            }
        } else if let Some(new) = after.get_mut(key) {
            keep_unlocked(old, new);
        }
    }
}

/// Union thresholds from `old` into `new`. Social milestones nest one
/// set per counter, so objects are unioned key by key.
fn union_unlocked(old: &Value, new: &mut Value) {
    match (old, new) {
        (Value::Array(old), Value::Array(new)) => {
            for threshold in old {
                if !new.contains(threshold) {
                    new.push(threshold.clone());
                }
            }
            new.sort_by_key(Value::as_u64);
        }
        (Value::Object(old), Value::Object(new)) => {
            for (key, old) in old {
                match new.get_mut(key) {
                    Some(new) => union_unlocked(old, new),
                    None => {
                        new.insert(key.clone(), old.clone());
                    }
                }
            }
        }
        _ => {}
    }
}

/// Compute the merge patch that turns `old` into `new`.
///
/// Returns `None` when the two documents are equal.
pub fn diff_patch(old: &Value, new: &Value) -> Option<Value> {
    if old == new {
        return None;
    }

    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut patch = Map::new();
            for (key, new_value) in new_map {
                match old_map.get(key) {
                    Some(old_value) => {
                        if let Some(child) = diff_patch(old_value, new_value) {
                            patch.insert(key.clone(), child);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Some(Value::Object(patch))
        }
        _ => Some(new.clone()),
    }
}
