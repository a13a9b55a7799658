//! JSON manifest persistence with optional merge-on-write.
//!
//! Every manifest the pipeline produces goes through this module, which
//! guarantees a reproducible on-disk form: `serde_json` pretty printing
//! (2-space indent) over `BTreeMap`-backed objects, so reruns over unchanged
//! content produce byte-identical files and clean diffs.
//!
//! ## Merge-on-write
//!
//! With `keep_order` enabled, [`write_manifest`] loads any previous manifest
//! at the destination and carries the user's manual ordering forward via
//! [`merge_order`](crate::ordering::merge_order) — the top-level `order`
//! field for leaf manifests, `items.order` for composite ones. The previous
//! read is strictly best-effort: a missing or unparsable file means "nothing
//! to merge", never an error.
//!
//! [`read_manifest`] is the strict counterpart used between pipeline stages,
//! where a missing or corrupt manifest is fatal for the caller.

use crate::ordering::merge_order;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of the best-effort read of a previously written manifest.
///
/// Only `Ok` participates in merging; the other two outcomes fall back to
/// "no previous data" deliberately, each for its own stated reason.
#[derive(Debug)]
pub enum PreviousManifest {
    Ok(Value),
    NotFound,
    Unreadable,
}

/// Read a previous manifest for merging. Never fails.
pub fn load_previous(path: &Path) -> PreviousManifest {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return PreviousManifest::NotFound;
        }
        Err(_) => return PreviousManifest::Unreadable,
    };
    match serde_json::from_str(&content) {
        Ok(value) => PreviousManifest::Ok(value),
        Err(_) => PreviousManifest::Unreadable,
    }
}

/// Read and deserialize a manifest. Failure is fatal for the caller.
pub fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize `data` to `path`, creating parent directories and overwriting
/// any previous file. With `keep_order`, a previous manifest's ordering is
/// merged in first (see module docs).
pub fn write_manifest<T: Serialize>(
    path: &Path,
    data: &T,
    keep_order: bool,
) -> Result<(), StoreError> {
    let mut value = serde_json::to_value(data)?;

    if keep_order && let PreviousManifest::Ok(previous) = load_previous(path) {
        merge_orders(&previous, &mut value, path);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

/// Apply the order merge wherever both documents carry an order:
/// the top-level `order` field, and `items.order`.
fn merge_orders(previous: &Value, fresh: &mut Value, path: &Path) {
    merge_order_field(previous, fresh, path);
    if let (Some(prev_items), Some(fresh_items)) =
        (previous.get("items"), fresh.get_mut("items"))
    {
        merge_order_field(prev_items, fresh_items, path);
    }
}

fn merge_order_field(previous: &Value, fresh: &mut Value, path: &Path) {
    let Some(previous_order) = string_array(previous.get("order")) else {
        return;
    };
    let Some(fresh_order) = string_array(fresh.get("order")) else {
        return;
    };

    let merged = merge_order(&previous_order, &fresh_order);
    if !merged.preserved {
        println!(
            "Previous ordering in {} no longer matches its contents, using fresh order",
            path.display()
        );
    }
    fresh["order"] = Value::from(merged.order);
}

fn string_array(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect()
}
