//! Deployment manifest reader for multi-document YAML files.

use crate::error::AnalysisError;
use crate::model::{Container, Manifest, SourceFile};
use serde_yaml_ng::Value;
use std::collections::{BTreeMap, BTreeSet};

struct YamlDocument<'a> {
    text: &'a str,
    /// 1-based line of the document's first line.
    line: usize,
}

/// Every document in the file that declares `apiVersion` and `kind`.
pub fn read_manifests(file: &SourceFile) -> Result<Vec<Manifest>, AnalysisError> {
    let mut out = Vec::new();
    for doc in split_documents(&file.text) {
        if doc.text.trim().is_empty() {
            continue;
        }
        let value: Value = serde_yaml_ng::from_str(doc.text).map_err(|err| {
            let line = err
                .location()
                .map(|loc| doc.line + loc.line().saturating_sub(1))
                .unwrap_or(doc.line);
            AnalysisError::parse(&file.path, Some(line), err.to_string())
        })?;
        if let Some(manifest) = manifest_from_value(&value, &file.path, doc.line) {
            out.push(manifest);
        }
    }
    Ok(out)
}

fn manifest_from_value(value: &Value, file: &str, line: usize) -> Option<Manifest> {
    let map = value.as_mapping()?;
    let api_version = map.get("apiVersion")?.as_str()?;
    let kind = map.get("kind")?.as_str()?;
    let metadata = map.get("metadata").and_then(Value::as_mapping);
    let field = |key: &str| {
        metadata
            .and_then(|meta| meta.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let labels = metadata
        .and_then(|meta| meta.get("labels"))
        .and_then(Value::as_mapping)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_text(v)?)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    let mut refs = References::default();
    refs.walk(value);

    Some(Manifest {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        name: field("name").unwrap_or_default(),
        namespace: field("namespace").unwrap_or_else(|| "default".to_string()),
        labels,
        containers: find_containers(&kind.to_ascii_lowercase(), value),
        config_maps: refs.config_maps.into_iter().collect(),
        secrets: refs.secrets.into_iter().collect(),
        services: refs.services.into_iter().collect(),
        file: file.to_string(),
        line,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn pod_spec<'v>(kind: &str, value: &'v Value) -> Option<&'v Value> {
    let spec = value.get("spec")?;
    match kind {
        "deployment" | "statefulset" | "daemonset" | "replicaset" | "job" => {
            spec.get("template")?.get("spec")
        }
        "cronjob" => spec.get("jobTemplate")?.get("spec")?.get("template")?.get("spec"),
        "pod" => Some(spec),
        _ => None,
    }
}

fn find_containers(kind: &str, value: &Value) -> Vec<Container> {
    let Some(spec) = pod_spec(kind, value) else {
        return Vec::new();
    };
    let mut containers = Vec::new();
    for key in ["initContainers", "containers"] {
        let Some(list) = spec.get(key).and_then(Value::as_sequence) else {
            continue;
        };
        for item in list {
            if let Some(name) = item.get("name").and_then(Value::as_str) {
                containers.push(Container {
                    name: name.to_string(),
                    image: item.get("image").and_then(Value::as_str).map(str::to_string),
                });
            }
        }
    }
    containers
}

#[derive(Default)]
struct References {
    config_maps: BTreeSet<String>,
    secrets: BTreeSet<String>,
    services: BTreeSet<String>,
}

impl References {
    fn walk(&mut self, value: &Value) {
        match value {
            Value::Mapping(map) => {
                for (key, child) in map {
                    if let Some(key) = key.as_str() {
                        self.record(key, child);
                    }
                    self.walk(child);
                }
            }
            Value::Sequence(items) => items.iter().for_each(|item| self.walk(item)),
            Value::Tagged(tagged) => self.walk(&tagged.value),
            _ => {}
        }
    }

    fn record(&mut self, key: &str, value: &Value) {
        let name = || value.get("name").and_then(Value::as_str).map(str::to_string);
        match key {
            "configMapRef" | "configMapKeyRef" | "configMap" => {
                self.config_maps.extend(name());
            }
            "secretRef" | "secretKeyRef" => self.secrets.extend(name()),
            // volume source: `secret: { secretName: ... }`
            "secret" => self.secrets.extend(
                value
                    .get("secretName")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
            "serviceName" => self
                .services
                .extend(value.as_str().map(str::to_string)),
            // ingress backend: `service: { name: ... }`
            "service" => self.services.extend(name()),
            _ => {}
        }
    }
}

fn split_documents(source: &str) -> Vec<YamlDocument<'_>> {
    let mut documents = Vec::new();
    let mut start = 0usize;
    let mut start_line = 1usize;
    let mut offset = 0usize;
    for (idx, line) in source.split_inclusive('\n').enumerate() {
        if is_doc_separator(line) {
            documents.push(YamlDocument {
                text: &source[start..offset],
                line: start_line,
            });
            start = offset + line.len();
            start_line = idx + 2;
        }
        offset += line.len();
    }
    documents.push(YamlDocument {
        text: &source[start..],
        line: start_line,
    });
    documents
}

fn is_doc_separator(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("---") else {
        return false;
    };
    rest.is_empty() || rest.starts_with(['\n', '\r', ' ', '\t'])
}
