//! Import manifest reading and application.
//!
//! Rancher serves the agent registration bundle as a multi-document YAML
//! stream. `YamlDocumentReader` splits it on `---` separator lines,
//! `parse_document` turns each document into `ManifestObject` envelopes and
//! `apply_manifest` creates them one by one on the workload cluster.
//!
//! Application stops at the first parse or create failure. Objects created
//! before the failure are left in place; the next reconcile picks up from
//! there since existing objects count as success.

use crate::client::{is_already_exists, RemoteClusterClient};
use crate::error::{ControllerError, ManifestError};
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use std::io::BufRead;
use tracing::{debug, info};

const DOCUMENT_SEPARATOR: &str = "---";

/// One Kubernetes object taken from an import manifest.
#[derive(Debug, Clone)]
pub struct ManifestObject {
    pub api_version: String,
    pub kind: String,
    /// `metadata.name`. Unset when the server generates the name.
    pub name: Option<String>,
    /// `metadata.generateName` prefix.
    pub generate_name: Option<String>,
    pub namespace: Option<String>,
    /// Full object as it appeared in the manifest.
    pub object: DynamicObject,
}

impl ManifestObject {
    /// Group, version and kind of the object. Core objects have an empty group.
    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = match self.api_version.rsplit_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        };
        GroupVersionKind::gvk(group, version, &self.kind)
    }

    /// Name for logs: the object name, or the generate-name prefix.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.generate_name.as_deref())
            .unwrap_or_default()
    }

    fn from_value(value: serde_json::Value, document: usize) -> Result<Self, ManifestError> {
        let invalid = |reason: String| ManifestError::InvalidObject { document, reason };

        let field = |path: &[&str]| -> Option<String> {
            let mut current = &value;
            for key in path {
                current = current.get(key)?;
            }
            current.as_str().map(str::to_string)
        };

        let api_version = field(&["apiVersion"])
            .filter(|v| !v.is_empty())
            .ok_or_else(|| invalid("missing apiVersion".to_string()))?;
        let kind = field(&["kind"])
            .filter(|k| !k.is_empty())
            .ok_or_else(|| invalid("missing kind".to_string()))?;
        let name = field(&["metadata", "name"]).filter(|n| !n.is_empty());
        let generate_name = field(&["metadata", "generateName"]).filter(|n| !n.is_empty());
        if name.is_none() && generate_name.is_none() {
            return Err(invalid(format!(
                "{} has neither metadata.name nor metadata.generateName",
                kind
            )));
        }
        if name.is_none() {
            debug!("{} will get a server generated name with prefix {:?}", kind, generate_name);
        }
        let namespace = field(&["metadata", "namespace"]).filter(|n| !n.is_empty());

        let object: DynamicObject =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            api_version,
            kind,
            name,
            generate_name,
            namespace,
            object,
        })
    }
}

/// Splits a YAML stream into raw documents.
///
/// A separator is a line starting with `---`; only whitespace or a comment
/// may follow it on the same line.
pub struct YamlDocumentReader<R> {
    reader: R,
    line: usize,
    done: bool,
}

impl<R: BufRead> YamlDocumentReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            done: false,
        }
    }

    /// Reads the next non-empty document. `Ok(None)` at end of stream.
    pub fn next_document(&mut self) -> Result<Option<String>, ManifestError> {
        if self.done {
            return Ok(None);
        }

        let mut buffer = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                self.done = true;
                return Ok((!buffer.is_empty()).then_some(buffer));
            }
            self.line += 1;

            if let Some(rest) = line.strip_prefix(DOCUMENT_SEPARATOR) {
                let trimmed = rest.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    return Err(ManifestError::Syntax {
                        line: self.line,
                        content: line.trim_end().to_string(),
                    });
                }
                if !buffer.is_empty() {
                    return Ok(Some(buffer));
                }
                continue;
            }

            buffer.push_str(&line);
        }
    }
}

/// Parses one raw document into zero or more objects.
///
/// Blank and comment-only documents yield nothing. `*List` kinds expand to
/// their `items`.
pub fn parse_document(raw: &str, document: usize) -> Result<Vec<ManifestObject>, ManifestError> {
    let has_content = raw.lines().any(|l| {
        let l = l.trim();
        !l.is_empty() && !l.starts_with('#')
    });
    if !has_content {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_yaml::from_str(raw)
        .map_err(|source| ManifestError::Parse { document, source })?;

    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(_) => {
            let is_list = value
                .get("kind")
                .and_then(|k| k.as_str())
                .is_some_and(|k| k.ends_with("List"));

            match value.get("items") {
                Some(serde_json::Value::Array(items)) if is_list => items
                    .iter()
                    .cloned()
                    .map(|item| ManifestObject::from_value(item, document))
                    .collect(),
                _ => Ok(vec![ManifestObject::from_value(value, document)?]),
            }
        }
        _ => Err(ManifestError::InvalidObject {
            document,
            reason: "document is not a mapping".to_string(),
        }),
    }
}

/// Counts of objects handled by `apply_manifest`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub created: usize,
    pub already_existing: usize,
}

/// Creates every object of a manifest stream on the workload cluster.
///
/// Objects that already exist are logged and skipped. Any other failure
/// aborts; later documents are not read.
pub async fn apply_manifest<R: BufRead>(
    client: &dyn RemoteClusterClient,
    reader: R,
) -> Result<ApplyOutcome, ControllerError> {
    let mut documents = YamlDocumentReader::new(reader);
    let mut outcome = ApplyOutcome::default();
    let mut index = 0;

    while let Some(raw) = documents.next_document()? {
        index += 1;
        let objects = parse_document(&raw, index)?;
        debug!("Manifest document {} holds {} object(s)", index, objects.len());

        for object in objects {
            let namespace = object.namespace.as_deref().unwrap_or("");
            match client.create(&object).await {
                Ok(()) => {
                    outcome.created += 1;
                    info!(
                        "Created {} {} (namespace: {:?})",
                        object.kind,
                        object.display_name(),
                        namespace
                    );
                }
                Err(e) if is_already_exists(&e) => {
                    outcome.already_existing += 1;
                    info!(
                        "{} {} already exists (namespace: {:?})",
                        object.kind,
                        object.display_name(),
                        namespace
                    );
                }
                Err(source) => {
                    return Err(ControllerError::RemoteCreate {
                        name: object.display_name().to_string(),
                        kind: object.kind,
                        source,
                    });
                }
            }
        }
    }

    Ok(outcome)
}
