use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::model::CimObject;

/// Read a JSON array of CIM objects, each tagged with `"kind"`
/// (`qualifier_declaration`, `class` or `instance`).
pub fn load_objects_file(path: impl AsRef<Path>) -> Result<Vec<CimObject>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read object file {}", path.display()))?;
    let objects: Vec<CimObject> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse object file {}", path.display()))?;
    log::info!("Read {} object(s) from {}", objects.len(), path.display());
    Ok(objects)
}
