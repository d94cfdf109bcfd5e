//! JSON query capability.
//!
//! Manifest and state documents are read through [`JsonQuery`]. The built-in
//! implementation parses with `serde_json`; [`JqQuery`] delegates to an
//! external `jq`-compatible binary for pipelines that pin that tool.

use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use preserve_core::{FileAttributes, Manifest, StateResource};

use crate::error::{io_err, CollectError};
use crate::state::{command_summary, probe};

/// Extracts preservation data from JSON documents on disk.
pub trait JsonQuery {
    /// Fails with [`CollectError::ToolMissing`] when the capability cannot run.
    fn ensure_available(&self) -> Result<(), CollectError>;

    /// The manifest's `preserved_files` array.
    fn preserved_files(&self, manifest: &Path) -> Result<Vec<String>, CollectError>;

    /// Every resource instance in a state export, unfiltered.
    fn state_resources(&self, state_dump: &Path) -> Result<Vec<StateResource>, CollectError>;
}

// ---------------------------------------------------------------------------
// Built-in (serde_json)
// ---------------------------------------------------------------------------

/// In-process JSON parsing. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinJsonQuery;

impl JsonQuery for BuiltinJsonQuery {
    fn ensure_available(&self) -> Result<(), CollectError> {
        Ok(())
    }

    fn preserved_files(&self, manifest: &Path) -> Result<Vec<String>, CollectError> {
        let bytes = std::fs::read(manifest).map_err(|e| io_err(manifest, e))?;
        parse_manifest(manifest, &bytes)
    }

    fn state_resources(&self, state_dump: &Path) -> Result<Vec<StateResource>, CollectError> {
        let bytes = std::fs::read(state_dump).map_err(|e| io_err(state_dump, e))?;
        let doc: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CollectError::MalformedState(e.to_string()))?;
        if !doc.is_object() {
            return Err(CollectError::MalformedState(
                "expected a JSON object at the top level".to_string(),
            ));
        }
        Ok(resources_from_document(&doc))
    }
}

fn parse_manifest(path: &Path, bytes: &[u8]) -> Result<Vec<String>, CollectError> {
    serde_json::from_slice::<Manifest>(bytes)
        .map(|m| m.preserved_files)
        .map_err(|e| CollectError::MalformedManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Walks both export shapes: `values.root_module` (with nested
/// `child_modules`) and the raw state `resources[].instances[]` layout.
pub fn resources_from_document(doc: &Value) -> Vec<StateResource> {
    let mut out = Vec::new();
    if let Some(root) = doc.pointer("/values/root_module") {
        walk_module(root, &mut out);
    }
    if let Some(resources) = doc.get("resources").and_then(Value::as_array) {
        for resource in resources {
            let mode = str_field(resource, "mode");
            let resource_type = str_field(resource, "type");
            let address = match (resource_type.as_deref(), str_field(resource, "name")) {
                (Some(t), Some(n)) => Some(format!("{t}.{n}")),
                _ => None,
            };
            let instances = resource.get("instances").and_then(Value::as_array);
            for instance in instances.into_iter().flatten() {
                if let Some(r) = build_resource(
                    address.clone(),
                    mode.clone(),
                    resource_type.clone(),
                    instance.get("attributes"),
                ) {
                    out.push(r);
                }
            }
        }
    }
    out
}

fn walk_module(module: &Value, out: &mut Vec<StateResource>) {
    let resources = module.get("resources").and_then(Value::as_array);
    for resource in resources.into_iter().flatten() {
        if let Some(r) = build_resource(
            str_field(resource, "address"),
            str_field(resource, "mode"),
            str_field(resource, "type"),
            resource.get("values"),
        ) {
            out.push(r);
        }
    }
    let children = module.get("child_modules").and_then(Value::as_array);
    for child in children.into_iter().flatten() {
        walk_module(child, out);
    }
}

fn build_resource(
    address: Option<String>,
    mode: Option<String>,
    resource_type: Option<String>,
    attributes: Option<&Value>,
) -> Option<StateResource> {
    let (Some(mode), Some(resource_type)) = (mode, resource_type) else {
        debug!("skipping state entry without mode/type");
        return None;
    };
    let attributes = attributes
        .map(|attrs| FileAttributes {
            filename: str_field(attrs, "filename"),
            content: str_field(attrs, "content"),
            content_base64: str_field(attrs, "content_base64"),
            file_permission: str_field(attrs, "file_permission"),
            directory_permission: str_field(attrs, "directory_permission"),
        })
        .unwrap_or_default();
    Some(StateResource {
        address,
        mode,
        resource_type,
        attributes,
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

// ---------------------------------------------------------------------------
// External jq
// ---------------------------------------------------------------------------

const MANIFEST_FILTER: &str = "{preserved_files: (.preserved_files // [])}";

const STATE_FILTER: &str = "[\
(.values.root_module? // empty | recurse(.child_modules[]?) | .resources[]? \
| {address: .address, mode: .mode, type: .type, values: .values}), \
(.resources[]? | . as $r | .instances[]? \
| {address: (($r.type // \"\") + \".\" + ($r.name // \"\")), mode: $r.mode, type: $r.type, values: .attributes})\
]";

/// Delegates JSON traversal to an external `jq`-compatible binary.
#[derive(Debug, Clone)]
pub struct JqQuery {
    binary: String,
}

impl JqQuery {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, filter: &str, input: &Path) -> Result<Vec<u8>, String> {
        let out = Command::new(&self.binary)
            .arg("-c")
            .arg(filter)
            .arg(input)
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.binary))?;
        if !out.status.success() {
            return Err(command_summary(&out));
        }
        Ok(out.stdout)
    }
}

impl JsonQuery for JqQuery {
    fn ensure_available(&self) -> Result<(), CollectError> {
        probe(&self.binary, &["--version"]).map_err(|reason| CollectError::ToolMissing {
            tool: self.binary.clone(),
            reason,
        })
    }

    fn preserved_files(&self, manifest: &Path) -> Result<Vec<String>, CollectError> {
        let bytes = self
            .run(MANIFEST_FILTER, manifest)
            .map_err(|message| CollectError::MalformedManifest {
                path: manifest.to_path_buf(),
                message,
            })?;
        parse_manifest(manifest, &bytes)
    }

    fn state_resources(&self, state_dump: &Path) -> Result<Vec<StateResource>, CollectError> {
        let bytes = self
            .run(STATE_FILTER, state_dump)
            .map_err(CollectError::MalformedState)?;
        let entries: Vec<Value> = serde_json::from_slice(&bytes)
            .map_err(|e| CollectError::MalformedState(e.to_string()))?;
        Ok(entries
            .iter()
            .filter_map(|entry| {
                build_resource(
                    str_field(entry, "address"),
                    str_field(entry, "mode"),
                    str_field(entry, "type"),
                    entry.get("values"),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn show_json_layout_walks_child_modules() {
        let doc = json!({
            "values": {"root_module": {
                "resources": [
                    {"address": "local_file.a", "mode": "managed", "type": "local_file",
                     "values": {"filename": "out/a.txt", "content": "hi", "file_permission": "0644"}}
                ],
                "child_modules": [{
                    "resources": [
                        {"address": "module.m.local_file.b", "mode": "managed", "type": "local_file",
                         "values": {"filename": "out/b.txt", "content_base64": "aGk="}}
                    ]
                }]
            }}
        });
        let resources = resources_from_document(&doc);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1].attributes.filename.as_deref(), Some("out/b.txt"));
        assert!(resources[1].has_inline_content());
        assert!(resources[0].attributes.directory_permission.is_none());
    }

    #[test]
    fn raw_state_layout_reads_instances() {
        let doc = json!({
            "resources": [
                {"mode": "managed", "type": "local_file", "name": "cfg",
                 "instances": [{"attributes": {"filename": "./cfg.ini", "content": null}}]},
                {"mode": "data", "type": "local_file", "name": "in",
                 "instances": [{"attributes": {"filename": "in.txt"}}]}
            ]
        });
        let resources = resources_from_document(&doc);
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].address.as_deref(), Some("local_file.cfg"));
        assert!(resources[0].attributes.content.is_none());
        assert!(!resources[1].is_managed_local_file());
    }

    #[test]
    fn entries_without_mode_are_skipped() {
        let doc = json!({"resources": [{"type": "local_file", "instances": [{"attributes": {}}]}]});
        assert!(resources_from_document(&doc).is_empty());
    }

    #[test]
    fn missing_jq_is_tool_missing() {
        let err = JqQuery::new("preserve-no-such-jq").ensure_available().unwrap_err();
        assert!(matches!(err, CollectError::ToolMissing { .. }));
    }
}
