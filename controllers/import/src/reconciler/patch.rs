//! JSON merge patch (RFC 7386) computation for CAPI clusters.
//!
//! The patch carries the resource version of the snapshot it was computed
//! from, so the API server rejects it with a conflict if the cluster changed
//! in between.

use crds::CapiCluster;
use serde_json::{Map, Value};

/// Computes the merge patch turning `original` into `modified`.
///
/// Returns `None` when the two are equal. Arrays and scalars are replaced
/// wholesale; removed keys are set to null.
pub fn merge_diff(original: &Value, modified: &Value) -> Option<Value> {
    match (original, modified) {
        (Value::Object(orig), Value::Object(modi)) => {
            let mut patch = Map::new();

            for (key, new_value) in modi {
                match orig.get(key) {
                    Some(old_value) => {
                        if let Some(diff) = merge_diff(old_value, new_value) {
                            patch.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in orig.keys() {
                if !modi.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }

            (!patch.is_empty()).then_some(Value::Object(patch))
        }
        _ if original == modified => None,
        _ => Some(modified.clone()),
    }
}

/// Computes the optimistic-lock merge patch for a CAPI cluster.
///
/// Status is written through its own subresource and is left out.
pub fn cluster_patch(
    original: &CapiCluster,
    modified: &CapiCluster,
) -> Result<Option<Value>, serde_json::Error> {
    let mut original_value = serde_json::to_value(original)?;
    let mut modified_value = serde_json::to_value(modified)?;
    for value in [&mut original_value, &mut modified_value] {
        if let Value::Object(map) = value {
            map.remove("status");
        }
    }

    let Some(mut patch) = merge_diff(&original_value, &modified_value) else {
        return Ok(None);
    };

    if let (Some(resource_version), Value::Object(map)) =
        (original.metadata.resource_version.as_ref(), &mut patch)
    {
        let metadata = map
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(metadata) = metadata {
            metadata.insert(
                "resourceVersion".to_string(),
                Value::String(resource_version.clone()),
            );
        }
    }

    Ok(Some(patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_capi_cluster;
    use kube::ResourceExt;
    use serde_json::json;

    #[test]
    fn test_merge_diff_equal() {
        let value = json!({"a": 1, "b": {"c": [1, 2]}});
        assert_eq!(merge_diff(&value, &value), None);
    }

    #[test]
    fn test_merge_diff_nested_change() {
        let original = json!({"a": 1, "b": {"c": "x", "d": "y"}});
        let modified = json!({"a": 1, "b": {"c": "x", "d": "z", "e": true}});
        assert_eq!(
            merge_diff(&original, &modified),
            Some(json!({"b": {"d": "z", "e": true}}))
        );
    }

    #[test]
    fn test_merge_diff_removed_key() {
        let original = json!({"a": 1, "b": 2});
        let modified = json!({"a": 1});
        assert_eq!(merge_diff(&original, &modified), Some(json!({"b": null})));
    }

    #[test]
    fn test_merge_diff_array_replaced() {
        let original = json!({"list": [1, 2, 3]});
        let modified = json!({"list": [1, 3]});
        assert_eq!(merge_diff(&original, &modified), Some(json!({"list": [1, 3]})));
    }

    #[test]
    fn test_cluster_patch_unchanged() {
        let cluster = create_test_capi_cluster("workload", "fleet", true, &[]);
        assert_eq!(cluster_patch(&cluster, &cluster.clone()).unwrap(), None);
    }

    #[test]
    fn test_cluster_patch_annotation() {
        let original = create_test_capi_cluster("workload", "fleet", true, &[]);
        let mut modified = original.clone();
        modified
            .annotations_mut()
            .insert("imported".to_string(), "true".to_string());

        let patch = cluster_patch(&original, &modified).unwrap().unwrap();
        assert_eq!(
            patch,
            json!({
                "metadata": {
                    "annotations": {"imported": "true"},
                    "resourceVersion": "1000"
                }
            })
        );
    }

    #[test]
    fn test_cluster_patch_ignores_status() {
        let original = create_test_capi_cluster("workload", "fleet", true, &[]);
        let mut modified = original.clone();
        if let Some(status) = modified.status.as_mut() {
            status.phase = Some("Provisioned".to_string());
        }
        assert_eq!(cluster_patch(&original, &modified).unwrap(), None);
    }
}
