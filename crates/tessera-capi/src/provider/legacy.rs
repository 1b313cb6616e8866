//! Legacy schema builder
//!
//! Builds the four provider-specific objects the legacy AWS operator
//! reconciles, straight from the request. No generator is involved.

use k8s_openapi::api::core::v1::ObjectReference;
use tracing::debug;

use tessera_common::Result;

use super::GraphBuilder;
use crate::constants::{
    DEFAULT_NAMESPACE, LABEL_CONTROL_PLANE, LEGACY_CREDENTIAL_SECRET_NAME,
    LEGACY_CREDENTIAL_SECRET_NAMESPACE, LEGACY_INFRASTRUCTURE_API_VERSION,
    LEGACY_MASTER_INSTANCE_TYPE,
};
use crate::metadata::{
    annotate, cluster_labels, description_annotations, shared_labels, subnet_size_annotation,
    target_namespace,
};
use crate::model::capi::Cluster;
use crate::model::legacy::{
    AwsControlPlane, AwsControlPlaneSpec, CredentialSecret, G8sControlPlane, G8sControlPlaneSpec,
    LegacyAwsCluster, LegacyAwsClusterSpec, LegacyClusterSettings, LegacyMaster, LegacyPods,
    LegacyProviderSettings,
};
use crate::model::ObjectGraph;
use crate::relocate::relocate;
use crate::release::SchemaGeneration;
use crate::request::{generate_id, ClusterRequest};

pub const FIELD_CLUSTER: &str = "cluster";
pub const FIELD_AWS_CLUSTER: &str = "aws_cluster";
pub const FIELD_G8S_CONTROL_PLANE: &str = "g8s_control_plane";
pub const FIELD_AWS_CONTROL_PLANE: &str = "aws_control_plane";

/// Builds legacy object graphs
pub struct LegacyBuilder {
    control_plane_id: fn() -> String,
}

impl Default for LegacyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyBuilder {
    pub fn new() -> Self {
        Self {
            control_plane_id: generate_id,
        }
    }

    #[cfg(test)]
    fn with_control_plane_id(control_plane_id: fn() -> String) -> Self {
        Self { control_plane_id }
    }
}

fn reference(kind: &str, name: &str, namespace: &str) -> ObjectReference {
    ObjectReference {
        api_version: Some(LEGACY_INFRASTRUCTURE_API_VERSION.to_string()),
        kind: Some(kind.to_string()),
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn pods(request: &ClusterRequest) -> Option<LegacyPods> {
    let cidr_block = request.pods_cidr.clone().unwrap_or_default();
    if cidr_block.is_empty() && !request.external_snat {
        return None;
    }
    Some(LegacyPods {
        cidr_block,
        external_snat: request.external_snat.then_some(true),
    })
}

impl GraphBuilder for LegacyBuilder {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::Legacy
    }

    fn build_graph(&self, request: &ClusterRequest) -> Result<ObjectGraph> {
        let ns = DEFAULT_NAMESPACE;
        let name = request.name.as_str();
        let control_plane_id = (self.control_plane_id)();
        let shared = shared_labels(request, SchemaGeneration::Legacy);

        let mut control_plane_labels = shared.clone();
        control_plane_labels.insert(LABEL_CONTROL_PLANE.to_string(), control_plane_id.clone());

        let mut cluster = Cluster::new(name, ns);
        cluster.metadata.labels = Some(cluster_labels(request, &shared));
        for (key, value) in description_annotations(request) {
            annotate(&mut cluster.metadata, key, value);
        }
        cluster.spec.infrastructure_ref = Some(reference("AWSCluster", name, ns));

        // A single zone pins the master; several are spread by the control plane
        let master_zone = match request.control_plane_azs.as_slice() {
            [zone] => zone.clone(),
            _ => String::new(),
        };
        let mut aws_cluster = LegacyAwsCluster::new(
            name,
            ns,
            LegacyAwsClusterSpec {
                cluster: LegacyClusterSettings {
                    description: request.description.clone(),
                    ..Default::default()
                },
                provider: LegacyProviderSettings {
                    credential_secret: CredentialSecret {
                        name: LEGACY_CREDENTIAL_SECRET_NAME.to_string(),
                        namespace: LEGACY_CREDENTIAL_SECRET_NAMESPACE.to_string(),
                    },
                    master: LegacyMaster {
                        availability_zone: master_zone,
                        instance_type: LEGACY_MASTER_INSTANCE_TYPE.to_string(),
                    },
                    pods: pods(request),
                    region: String::new(),
                },
            },
        );
        aws_cluster.metadata.labels = Some(shared.clone());
        if let Some((key, value)) = subnet_size_annotation(request) {
            annotate(&mut aws_cluster.metadata, key, value);
        }

        let replicas = request.control_plane_replicas().unwrap_or(1) as i32;
        let mut g8s_control_plane = G8sControlPlane::new(
            &control_plane_id,
            ns,
            G8sControlPlaneSpec {
                replicas,
                infrastructure_ref: reference("AWSControlPlane", &control_plane_id, ns),
            },
        );
        g8s_control_plane.metadata.labels = Some(control_plane_labels.clone());

        let mut aws_control_plane = AwsControlPlane::new(
            &control_plane_id,
            ns,
            AwsControlPlaneSpec {
                availability_zones: request.control_plane_azs.clone(),
                instance_type: LEGACY_MASTER_INSTANCE_TYPE.to_string(),
            },
        );
        aws_control_plane.metadata.labels = Some(control_plane_labels);

        let mut graph = ObjectGraph::new(SchemaGeneration::Legacy, shared);
        graph.push(FIELD_CLUSTER, cluster);
        graph.push(FIELD_AWS_CLUSTER, aws_cluster);
        graph.push(FIELD_G8S_CONTROL_PLANE, g8s_control_plane);
        graph.push(FIELD_AWS_CONTROL_PLANE, aws_control_plane);

        let target = target_namespace(request, SchemaGeneration::Legacy)?;
        if target != ns {
            graph = relocate(&graph, &target);
        }
        debug!(objects = graph.len(), namespace = %target, "built legacy object graph");
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ANNOTATION_SUBNET_SIZE;
    use crate::model::ResourceObject;

    fn fixed_id() -> String {
        "x9y8z".to_string()
    }

    fn request(release: &str) -> ClusterRequest {
        ClusterRequest {
            name: "a1b2c".into(),
            owner: "acme".into(),
            release_version: release.into(),
            control_plane_azs: vec!["eu-west-1a".into(), "eu-west-1b".into(), "eu-west-1c".into()],
            description: "legacy cluster".into(),
            file_name: "cluster.yaml".into(),
            ..Default::default()
        }
    }

    fn build(request: &ClusterRequest) -> ObjectGraph {
        LegacyBuilder::with_control_plane_id(fixed_id)
            .build_graph(request)
            .expect("graph should build")
    }

    #[test]
    fn builds_four_consistent_objects() {
        let graph = build(&request("15.1.0"));
        assert_eq!(graph.len(), 4);
        graph.validate().expect("graph should be consistent");
        assert!(graph.iter().all(|o| o.namespace() == Some("default")));
    }

    #[test]
    fn cluster_references_the_single_infrastructure_cluster() {
        let graph = build(&request("15.1.0"));
        let Some(ResourceObject::Cluster(cluster)) = graph.get(FIELD_CLUSTER) else {
            panic!("expected cluster");
        };
        let infra = cluster.spec.infrastructure_ref.as_ref().unwrap();
        assert_eq!(infra.kind.as_deref(), Some("AWSCluster"));
        assert_eq!(infra.name.as_deref(), Some("a1b2c"));
        assert!(graph.find("AWSCluster", "a1b2c").is_some());
    }

    #[test]
    fn tenant_layout_moves_everything_to_the_org_namespace() {
        let graph = build(&request("16.0.0"));
        graph.validate().expect("graph should be consistent");
        assert!(graph.iter().all(|o| o.namespace() == Some("org-acme")));

        let Some(ResourceObject::G8sControlPlane(cp)) = graph.get(FIELD_G8S_CONTROL_PLANE) else {
            panic!("expected G8sControlPlane");
        };
        assert_eq!(cp.spec.infrastructure_ref.namespace.as_deref(), Some("org-acme"));
    }

    #[test]
    fn replicas_follow_zones() {
        let graph = build(&request("15.1.0"));
        let Some(ResourceObject::G8sControlPlane(cp)) = graph.get(FIELD_G8S_CONTROL_PLANE) else {
            panic!("expected G8sControlPlane");
        };
        assert_eq!(cp.spec.replicas, 3);

        let mut single = request("15.1.0");
        single.control_plane_azs = vec!["eu-west-1a".into()];
        let graph = build(&single);
        let Some(ResourceObject::LegacyAwsCluster(cluster)) = graph.get(FIELD_AWS_CLUSTER) else {
            panic!("expected AWSCluster");
        };
        assert_eq!(cluster.spec.provider.master.availability_zone, "eu-west-1a");
    }

    #[test]
    fn control_plane_objects_carry_the_control_plane_id() {
        let graph = build(&request("15.1.0"));
        for field in [FIELD_G8S_CONTROL_PLANE, FIELD_AWS_CONTROL_PLANE] {
            let object = graph.get(field).unwrap();
            assert_eq!(object.name(), "x9y8z");
            assert_eq!(object.label(LABEL_CONTROL_PLANE), Some("x9y8z"));
        }
    }

    #[test]
    fn legacy_flags_reach_the_infrastructure_cluster() {
        let mut req = request("15.1.0");
        req.pods_cidr = Some("10.2.0.0/16".into());
        req.external_snat = true;
        req.control_plane_subnet = Some("24".into());
        let graph = build(&req);

        let Some(ResourceObject::LegacyAwsCluster(cluster)) = graph.get(FIELD_AWS_CLUSTER) else {
            panic!("expected AWSCluster");
        };
        let pods = cluster.spec.provider.pods.as_ref().unwrap();
        assert_eq!(pods.cidr_block, "10.2.0.0/16");
        assert_eq!(pods.external_snat, Some(true));
        assert_eq!(
            cluster.metadata.annotations.as_ref().unwrap()[ANNOTATION_SUBNET_SIZE],
            "24"
        );
    }

    #[test]
    fn no_subnet_annotation_without_override() {
        let graph = build(&request("15.1.0"));
        let aws_cluster = graph.get(FIELD_AWS_CLUSTER).unwrap();
        assert!(aws_cluster.metadata().annotations.is_none());
        let Some(ResourceObject::LegacyAwsCluster(cluster)) = graph.get(FIELD_AWS_CLUSTER) else {
            panic!("expected AWSCluster");
        };
        assert!(cluster.spec.provider.pods.is_none());
    }
}
