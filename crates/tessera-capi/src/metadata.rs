//! Metadata propagation
//!
//! Pure functions computing the labels, annotations and namespace every
//! object of a request shares. Label maps are never mutated in place: each
//! helper returns a fresh map so no two objects alias the same labels.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use tessera_common::Result;

use crate::constants::{
    ANNOTATION_CLUSTER_DESCRIPTION, ANNOTATION_SUBNET_SIZE, DEFAULT_NAMESPACE,
    LABEL_CAPI_CLUSTER_NAME, LABEL_CAPI_ROLE, LABEL_CLUSTER, LABEL_ORGANIZATION,
    LABEL_RELEASE_VERSION, LABEL_WATCH_FILTER,
};
use crate::model::ObjectGraph;
use crate::release::{uses_org_namespace, SchemaGeneration};
use crate::request::ClusterRequest;

/// Labels every object composed for `request` must carry
pub fn shared_labels(
    request: &ClusterRequest,
    generation: SchemaGeneration,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_RELEASE_VERSION.to_string(), request.release_version.clone()),
        (LABEL_CLUSTER.to_string(), request.name.clone()),
        (LABEL_CAPI_CLUSTER_NAME.to_string(), request.name.clone()),
        (LABEL_ORGANIZATION.to_string(), request.owner.clone()),
        (LABEL_WATCH_FILTER.to_string(), generation.watch_filter().to_string()),
    ])
}

/// Labels for the cluster object: caller labels under the shared set
///
/// Shared labels win on conflict so a caller cannot detach the cluster from
/// its release or organization.
pub fn cluster_labels(
    request: &ClusterRequest,
    shared: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut labels = request.labels.clone();
    labels.extend(shared.iter().map(|(k, v)| (k.clone(), v.clone())));
    labels
}

/// Copy of `labels` with the role label set
pub fn with_role(labels: &BTreeMap<String, String>, role: &str) -> BTreeMap<String, String> {
    let mut labels = labels.clone();
    labels.insert(LABEL_CAPI_ROLE.to_string(), role.to_string());
    labels
}

/// Annotations for the cluster object
pub fn description_annotations(request: &ClusterRequest) -> BTreeMap<String, String> {
    BTreeMap::from([(
        ANNOTATION_CLUSTER_DESCRIPTION.to_string(),
        request.description.clone(),
    )])
}

/// Subnet size annotation, present only when the request overrides it
pub fn subnet_size_annotation(request: &ClusterRequest) -> Option<(String, String)> {
    request
        .control_plane_subnet
        .as_ref()
        .filter(|size| !size.is_empty())
        .map(|size| (ANNOTATION_SUBNET_SIZE.to_string(), size.clone()))
}

/// Set one annotation, keeping any others already present
pub fn annotate(meta: &mut ObjectMeta, key: String, value: String) {
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(key, value);
}

/// Namespace the objects of `request` end up in
pub fn target_namespace(request: &ClusterRequest, generation: SchemaGeneration) -> Result<String> {
    match generation {
        SchemaGeneration::Modern => Ok(request.organization_namespace()),
        SchemaGeneration::Legacy if uses_org_namespace(&request.release_version)? => {
            Ok(request.organization_namespace())
        }
        SchemaGeneration::Legacy => Ok(DEFAULT_NAMESPACE.to_string()),
    }
}

/// Merge the graph's shared labels into every object
///
/// Shared values replace whatever an object already had under the same key;
/// other labels (roles, caller labels) are kept.
pub fn apply_shared_labels(graph: &mut ObjectGraph) {
    let shared = graph.shared_labels().clone();
    for object in graph.iter_mut() {
        let meta = object.metadata_mut();
        let mut labels = meta.labels.clone().unwrap_or_default();
        labels.extend(shared.iter().map(|(k, v)| (k.clone(), v.clone())));
        meta.labels = Some(labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::capi::Cluster;

    fn request() -> ClusterRequest {
        ClusterRequest {
            name: "a1b2c".into(),
            owner: "acme".into(),
            release_version: "20.0.0".into(),
            description: "prod cluster".into(),
            ..Default::default()
        }
    }

    #[test]
    fn shared_labels_cover_release_cluster_and_org() {
        let labels = shared_labels(&request(), SchemaGeneration::Modern);
        assert_eq!(labels[LABEL_RELEASE_VERSION], "20.0.0");
        assert_eq!(labels[LABEL_CLUSTER], "a1b2c");
        assert_eq!(labels[LABEL_CAPI_CLUSTER_NAME], "a1b2c");
        assert_eq!(labels[LABEL_ORGANIZATION], "acme");
        assert_eq!(labels[LABEL_WATCH_FILTER], "capi");
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn shared_labels_win_over_caller_labels() {
        let mut req = request();
        req.labels = BTreeMap::from([
            ("team".to_string(), "platform".to_string()),
            (LABEL_ORGANIZATION.to_string(), "intruder".to_string()),
        ]);
        let shared = shared_labels(&req, SchemaGeneration::Modern);
        let labels = cluster_labels(&req, &shared);

        assert_eq!(labels["team"], "platform");
        assert_eq!(labels[LABEL_ORGANIZATION], "acme");
        assert_eq!(req.labels[LABEL_ORGANIZATION], "intruder");
    }

    #[test]
    fn with_role_leaves_the_input_untouched() {
        let shared = shared_labels(&request(), SchemaGeneration::Modern);
        let bastion = with_role(&shared, "bastion");
        assert_eq!(bastion[LABEL_CAPI_ROLE], "bastion");
        assert!(!shared.contains_key(LABEL_CAPI_ROLE));
    }

    #[test]
    fn subnet_annotation_only_when_overridden() {
        let mut req = request();
        assert!(subnet_size_annotation(&req).is_none());
        req.control_plane_subnet = Some(String::new());
        assert!(subnet_size_annotation(&req).is_none());
        req.control_plane_subnet = Some("24".into());
        assert_eq!(
            subnet_size_annotation(&req),
            Some((ANNOTATION_SUBNET_SIZE.to_string(), "24".to_string()))
        );
    }

    #[test]
    fn target_namespace_follows_layout() {
        let mut req = request();
        assert_eq!(
            target_namespace(&req, SchemaGeneration::Modern).unwrap(),
            "org-acme"
        );
        req.release_version = "16.1.0".into();
        assert_eq!(
            target_namespace(&req, SchemaGeneration::Legacy).unwrap(),
            "org-acme"
        );
        req.release_version = "15.0.0".into();
        assert_eq!(
            target_namespace(&req, SchemaGeneration::Legacy).unwrap(),
            "default"
        );
    }

    #[test]
    fn apply_shared_labels_overrides_generator_values() {
        let req = request();
        let shared = shared_labels(&req, SchemaGeneration::Modern);
        let mut cluster = Cluster::new("a1b2c", "org-acme");
        cluster.metadata.labels = Some(BTreeMap::from([
            (LABEL_CLUSTER.to_string(), "stale".to_string()),
            ("extra".to_string(), "kept".to_string()),
        ]));

        let mut graph = ObjectGraph::new(SchemaGeneration::Modern, shared);
        graph.push("cluster", cluster);
        apply_shared_labels(&mut graph);

        let object = graph.get("cluster").unwrap();
        assert_eq!(object.label(LABEL_CLUSTER), Some("a1b2c"));
        assert_eq!(object.label("extra"), Some("kept"));
    }
}
