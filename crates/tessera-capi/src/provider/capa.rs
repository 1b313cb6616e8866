//! Modern schema builder (upstream Cluster API with CAPA)
//!
//! Starts from the base object set the generator produces, types the four
//! objects tessera knows how to complete, fills in what the generator
//! cannot set and adds the identity and bastion objects it never emits.

use kube::core::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use tessera_common::{Error, Result};

use super::bastion::{self, BastionParams};
use super::GraphBuilder;
use crate::bootstrap::{admin_user, control_plane_files, RESTART_SSHD_COMMAND};
use crate::constants::{control_plane_instance_profile, CAPA_ENV_VARS, ROLE_CONTROL_PLANE};
use crate::env::EnvGuard;
use crate::generator::{GenerateOptions, TemplateGenerator};
use crate::keys::{require_sso_public_key, KeySource};
use crate::metadata::{
    annotate, apply_shared_labels, cluster_labels, description_annotations, shared_labels,
    subnet_size_annotation, with_role,
};
use crate::model::capa::{
    AllowedNamespaces, AwsCluster, AwsClusterRoleIdentity, AwsClusterRoleIdentitySpec,
    AwsIdentityReference, AwsMachineTemplate, SubnetSpec, CLUSTER_ROLE_IDENTITY_KIND,
};
use crate::model::capi::{Cluster, KubeadmControlPlane};
use crate::model::{ObjectGraph, RecognizedKind, ResourceObject};
use crate::release::SchemaGeneration;
use crate::request::ClusterRequest;

pub const FIELD_CLUSTER: &str = "cluster";
pub const FIELD_AWS_CLUSTER: &str = "aws_cluster";
pub const FIELD_KUBEADM_CONTROL_PLANE: &str = "kubeadm_control_plane";
pub const FIELD_AWS_MACHINE_TEMPLATE: &str = "aws_machine_template";
pub const FIELD_AWS_CLUSTER_ROLE_IDENTITY: &str = "aws_cluster_role_identity";
pub const FIELD_BASTION_BOOTSTRAP_SECRET: &str = "bastion_bootstrap_secret";
pub const FIELD_BASTION_MACHINE_DEPLOYMENT: &str = "bastion_machine_deployment";
pub const FIELD_BASTION_AWS_MACHINE_TEMPLATE: &str = "bastion_aws_machine_template";

/// Builds CAPA object graphs from a generated base set
pub struct CapaBuilder {
    generator: Box<dyn TemplateGenerator>,
    keys: Box<dyn KeySource>,
}

impl CapaBuilder {
    pub fn new(generator: Box<dyn TemplateGenerator>, keys: Box<dyn KeySource>) -> Self {
        Self { generator, keys }
    }

    fn generate(&self, request: &ClusterRequest, namespace: &str) -> Result<Vec<DynamicObject>> {
        let options =
            GenerateOptions::capa(&request.name, namespace, request.control_plane_replicas());
        let _env = EnvGuard::neutralize(CAPA_ENV_VARS);
        self.generator.generate(&options)
    }
}

/// The typed base objects the builder completes
#[derive(Default)]
struct BaseSet {
    aws_cluster: Option<AwsCluster>,
    machine_template: Option<AwsMachineTemplate>,
    cluster: Option<Cluster>,
    control_plane: Option<KubeadmControlPlane>,
}

impl BaseSet {
    fn classify(objects: &[DynamicObject]) -> Result<Self> {
        let mut base = Self::default();
        for object in objects {
            let Some(kind) = RecognizedKind::classify(object) else {
                warn!(
                    kind = object.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default(),
                    name = %object.name_any(),
                    "dropping unrecognized base object"
                );
                continue;
            };
            debug!(kind = kind.as_str(), name = %object.name_any(), "classified base object");

            match kind.convert(object)? {
                ResourceObject::AwsCluster(o) => place(&mut base.aws_cluster, o, kind)?,
                ResourceObject::AwsMachineTemplate(o) => place(&mut base.machine_template, o, kind)?,
                ResourceObject::Cluster(o) => place(&mut base.cluster, o, kind)?,
                ResourceObject::KubeadmControlPlane(o) => place(&mut base.control_plane, o, kind)?,
                other => {
                    return Err(Error::generation(format!(
                        "{} converted to unexpected {}",
                        kind.as_str(),
                        other.kind_name()
                    )))
                }
            }
        }
        Ok(base)
    }
}

fn place<T>(slot: &mut Option<T>, object: T, kind: RecognizedKind) -> Result<()> {
    if slot.replace(object).is_some() {
        return Err(Error::generation(format!(
            "base object set contains more than one {}",
            kind.as_str()
        )));
    }
    Ok(())
}

fn required<T>(slot: Option<T>, kind: RecognizedKind) -> Result<T> {
    slot.ok_or_else(|| Error::generation(format!("base object set has no {}", kind.as_str())))
}

impl GraphBuilder for CapaBuilder {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::Modern
    }

    fn build_graph(&self, request: &ClusterRequest) -> Result<ObjectGraph> {
        let sso_public_key = require_sso_public_key(self.keys.as_ref())?;
        let namespace = request.organization_namespace();
        let shared = shared_labels(request, SchemaGeneration::Modern);

        let objects = self.generate(request, &namespace)?;
        info!(count = objects.len(), cluster = %request.name, "received base object set");
        let base = BaseSet::classify(&objects)?;

        let mut aws_cluster = required(base.aws_cluster, RecognizedKind::AwsCluster)?;
        aws_cluster.metadata.labels = Some(shared.clone());
        aws_cluster.spec.identity_ref = Some(AwsIdentityReference {
            kind: CLUSTER_ROLE_IDENTITY_KIND.to_string(),
            name: request.name.clone(),
        });
        for zone in &request.control_plane_azs {
            let subnets = &mut aws_cluster.spec.network_spec.subnets;
            subnets.push(SubnetSpec::in_zone(zone, false));
            subnets.push(SubnetSpec::in_zone(zone, true));
        }
        if let Some((key, value)) = subnet_size_annotation(request) {
            annotate(&mut aws_cluster.metadata, key, value);
        }
        let region = aws_cluster.spec.region.clone();

        // The IAM controller creates instance profiles for templates with this role
        let mut machine_template =
            required(base.machine_template, RecognizedKind::AwsMachineTemplate)?;
        machine_template.metadata.labels = Some(with_role(&shared, ROLE_CONTROL_PLANE));
        machine_template.spec.template.spec.iam_instance_profile =
            Some(control_plane_instance_profile(&request.name));

        let mut cluster = required(base.cluster, RecognizedKind::Cluster)?;
        cluster.metadata.labels = Some(cluster_labels(request, &shared));
        for (key, value) in description_annotations(request) {
            annotate(&mut cluster.metadata, key, value);
        }

        let mut control_plane = required(base.control_plane, RecognizedKind::KubeadmControlPlane)?;
        control_plane.metadata.labels = Some(shared.clone());
        let config = &mut control_plane.spec.kubeadm_config_spec;
        config.files = control_plane_files(&sso_public_key);
        config.post_kubeadm_commands = vec![RESTART_SSHD_COMMAND.to_string()];
        config.users = vec![admin_user()];

        let mut identity = AwsClusterRoleIdentity::new(
            &request.name,
            &namespace,
            AwsClusterRoleIdentitySpec {
                source_identity_ref: Some(AwsIdentityReference::default()),
                allowed_namespaces: Some(AllowedNamespaces {
                    list: vec![namespace.clone()],
                }),
                ..Default::default()
            },
        );
        identity.metadata.labels = Some(shared.clone());

        let bastion = bastion::build(&BastionParams {
            cluster_name: &request.name,
            namespace: &namespace,
            region: &region,
            sso_public_key: &sso_public_key,
            shared_labels: &shared,
        })?;

        let mut graph = ObjectGraph::new(SchemaGeneration::Modern, shared);
        graph.push(FIELD_CLUSTER, cluster);
        graph.push(FIELD_AWS_CLUSTER, aws_cluster);
        graph.push(FIELD_KUBEADM_CONTROL_PLANE, control_plane);
        graph.push(FIELD_AWS_MACHINE_TEMPLATE, machine_template);
        graph.push(FIELD_AWS_CLUSTER_ROLE_IDENTITY, identity);
        graph.push(FIELD_BASTION_BOOTSTRAP_SECRET, bastion.secret);
        graph.push(FIELD_BASTION_MACHINE_DEPLOYMENT, bastion.machine_deployment);
        graph.push(FIELD_BASTION_AWS_MACHINE_TEMPLATE, bastion.machine_template);
        apply_shared_labels(&mut graph);

        debug!(objects = graph.len(), "built capa object graph");
        Ok(graph)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::{
        ANNOTATION_CLUSTER_DESCRIPTION, ANNOTATION_SUBNET_SIZE, LABEL_CAPI_ROLE, LABEL_CLUSTER,
    };
    use crate::generator::{parse_objects, MockTemplateGenerator};
    use crate::keys::{MockKeySource, StaticKeySource};

    /// Base object set shaped like `clusterctl generate cluster` output
    pub(crate) fn base_objects(name: &str, namespace: &str, replicas: Option<i64>) -> String {
        let replicas = replicas.unwrap_or(1);
        format!(
            r#"apiVersion: cluster.x-k8s.io/v1alpha3
kind: Cluster
metadata:
  name: {name}
  namespace: {namespace}
  labels:
    {LABEL_CLUSTER}: stale
spec:
  clusterNetwork:
    pods:
      cidrBlocks: ["192.168.0.0/16"]
  infrastructureRef:
    apiVersion: infrastructure.cluster.x-k8s.io/v1alpha3
    kind: AWSCluster
    name: {name}
  controlPlaneRef:
    apiVersion: controlplane.cluster.x-k8s.io/v1alpha3
    kind: KubeadmControlPlane
    name: {name}-control-plane
---
apiVersion: infrastructure.cluster.x-k8s.io/v1alpha3
kind: AWSCluster
metadata:
  name: {name}
  namespace: {namespace}
spec:
  region: eu-west-1
  sshKeyName: ""
---
apiVersion: controlplane.cluster.x-k8s.io/v1alpha3
kind: KubeadmControlPlane
metadata:
  name: {name}-control-plane
  namespace: {namespace}
spec:
  replicas: {replicas}
  version: v1.19.9
  infrastructureTemplate:
    apiVersion: infrastructure.cluster.x-k8s.io/v1alpha3
    kind: AWSMachineTemplate
    name: {name}-control-plane
  kubeadmConfigSpec:
    initConfiguration:
      nodeRegistration:
        name: "{{{{ ds.meta_data.local_hostname }}}}"
---
apiVersion: infrastructure.cluster.x-k8s.io/v1alpha3
kind: AWSMachineTemplate
metadata:
  name: {name}-control-plane
  namespace: {namespace}
spec:
  template:
    spec:
      instanceType: ""
      iamInstanceProfile: control-plane.cluster-api-provider-aws.sigs.k8s.io
      sshKeyName: ""
---
apiVersion: exp.cluster.x-k8s.io/v1alpha3
kind: MachinePool
metadata:
  name: {name}-mp-0
  namespace: {namespace}
spec:
  clusterName: {name}
"#
        )
    }

    pub(crate) fn request() -> ClusterRequest {
        ClusterRequest {
            name: "a1b2c".into(),
            owner: "acme".into(),
            release_version: "20.0.0".into(),
            control_plane_azs: vec!["eu-west-1a".into(), "eu-west-1b".into(), "eu-west-1c".into()],
            control_plane_subnet: Some("25".into()),
            description: "production".into(),
            file_name: "cluster.yaml".into(),
            ..Default::default()
        }
    }

    fn key_source() -> Box<dyn KeySource> {
        Box::new(StaticKeySource::new(Some("c3NvLWtleQ==".into())))
    }

    fn generator_returning(yaml: String) -> MockTemplateGenerator {
        let mut generator = MockTemplateGenerator::new();
        generator
            .expect_generate()
            .returning(move |_| parse_objects(&yaml));
        generator
    }

    fn build(request: &ClusterRequest) -> ObjectGraph {
        let generator = generator_returning(base_objects("a1b2c", "org-acme", Some(3)));
        CapaBuilder::new(Box::new(generator), key_source())
            .build_graph(request)
            .expect("graph should build")
    }

    #[test]
    fn produces_eight_consistent_objects() {
        let graph = build(&request());
        assert_eq!(graph.len(), 8);
        graph.validate().expect("graph should be consistent");
        assert!(graph.iter().all(|o| o.namespace() == Some("org-acme")));
    }

    #[test]
    fn unrecognized_base_objects_are_dropped() {
        let graph = build(&request());
        assert!(graph.iter().all(|o| !o.name().ends_with("-mp-0")));
    }

    #[test]
    fn infrastructure_cluster_gets_identity_and_subnets() {
        let graph = build(&request());
        let Some(ResourceObject::AwsCluster(cluster)) = graph.get(FIELD_AWS_CLUSTER) else {
            panic!("expected AWSCluster");
        };

        let identity = cluster.spec.identity_ref.as_ref().unwrap();
        assert_eq!(identity.kind, "AWSClusterRoleIdentity");
        assert_eq!(identity.name, "a1b2c");

        let subnets = &cluster.spec.network_spec.subnets;
        assert_eq!(subnets.len(), 6);
        assert_eq!(subnets.iter().filter(|s| s.is_public).count(), 3);
        assert_eq!(subnets[0].availability_zone, "eu-west-1a");
        assert!(!subnets[0].is_public);
        assert!(subnets[1].is_public);

        let annotations = cluster.metadata.annotations.as_ref().unwrap();
        assert_eq!(annotations[ANNOTATION_SUBNET_SIZE], "25");
    }

    #[test]
    fn control_plane_template_is_wired_for_iam() {
        let graph = build(&request());
        let Some(ResourceObject::AwsMachineTemplate(template)) = graph.get(FIELD_AWS_MACHINE_TEMPLATE)
        else {
            panic!("expected AWSMachineTemplate");
        };
        assert_eq!(
            template.spec.template.spec.iam_instance_profile.as_deref(),
            Some("control-plane-a1b2c")
        );
        assert_eq!(
            template.metadata.labels.as_ref().unwrap()[LABEL_CAPI_ROLE],
            "control-plane"
        );
    }

    #[test]
    fn cluster_gets_caller_labels_and_description() {
        let mut req = request();
        req.labels.insert("team".into(), "platform".into());
        let graph = build(&req);

        let cluster = graph.get(FIELD_CLUSTER).unwrap();
        assert_eq!(cluster.label("team"), Some("platform"));
        assert_eq!(cluster.label(LABEL_CLUSTER), Some("a1b2c"));
        let annotations = cluster.metadata().annotations.as_ref().unwrap();
        assert_eq!(annotations[ANNOTATION_CLUSTER_DESCRIPTION], "production");
    }

    #[test]
    fn control_plane_gets_bootstrap_files_user_and_command() {
        let graph = build(&request());
        let Some(ResourceObject::KubeadmControlPlane(kcp)) = graph.get(FIELD_KUBEADM_CONTROL_PLANE)
        else {
            panic!("expected KubeadmControlPlane");
        };
        let config = &kcp.spec.kubeadm_config_spec;
        assert_eq!(config.files.len(), 3);
        assert_eq!(config.post_kubeadm_commands, vec!["service ssh restart"]);
        assert_eq!(config.users[0].name, "giantswarm");
        assert!(config.extra.contains_key("initConfiguration"));
        assert_eq!(kcp.spec.replicas, Some(3));
    }

    #[test]
    fn identity_is_limited_to_the_organization_namespace() {
        let graph = build(&request());
        let Some(ResourceObject::AwsClusterRoleIdentity(identity)) =
            graph.get(FIELD_AWS_CLUSTER_ROLE_IDENTITY)
        else {
            panic!("expected AWSClusterRoleIdentity");
        };
        assert_eq!(
            identity.spec.allowed_namespaces.as_ref().unwrap().list,
            vec!["org-acme"]
        );

        let value = serde_json::to_value(identity).expect("identity should serialize");
        assert_eq!(
            value["spec"]["sourceIdentityRef"],
            serde_json::json!({ "kind": "", "name": "" })
        );
        assert!(value["spec"].get("roleARN").is_none());
    }

    #[test]
    fn generator_is_called_with_fixed_options_and_replica_count() {
        let mut generator = MockTemplateGenerator::new();
        generator
            .expect_generate()
            .withf(|options| {
                options.cluster_name == "a1b2c"
                    && options.target_namespace == "org-acme"
                    && options.kubernetes_version == "v1.19.9"
                    && options.infrastructure_provider == "aws:v0.6.8"
                    && options.flavor == "machinepool"
                    && options.control_plane_machine_count.is_none()
            })
            .times(1)
            .returning(|_| parse_objects(&base_objects("a1b2c", "org-acme", None)));

        let mut req = request();
        req.control_plane_azs.clear();
        let graph = CapaBuilder::new(Box::new(generator), key_source())
            .build_graph(&req)
            .expect("graph should build");

        let Some(ResourceObject::KubeadmControlPlane(kcp)) = graph.get(FIELD_KUBEADM_CONTROL_PLANE)
        else {
            panic!("expected KubeadmControlPlane");
        };
        assert_eq!(kcp.spec.replicas, Some(1));
    }

    #[test]
    fn missing_key_aborts_before_generation() {
        let mut generator = MockTemplateGenerator::new();
        generator.expect_generate().times(0);
        let mut keys = MockKeySource::new();
        keys.expect_sso_public_key().returning(|| None);

        let err = CapaBuilder::new(Box::new(generator), Box::new(keys))
            .build_graph(&request())
            .expect_err("missing key should fail");
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    #[test]
    fn conversion_failure_aborts_the_build() {
        let broken = base_objects("a1b2c", "org-acme", Some(3))
            .replace("region: eu-west-1", "region: [eu-west-1]");
        let err = CapaBuilder::new(Box::new(generator_returning(broken)), key_source())
            .build_graph(&request())
            .expect_err("broken AWSCluster should fail");
        assert_eq!(err.kind(), Some("AWSCluster"));
    }

    #[test]
    fn missing_base_kind_is_a_generation_error() {
        let yaml = base_objects("a1b2c", "org-acme", Some(3));
        let without_template: String = yaml
            .split("---\n")
            .filter(|doc| !doc.contains("kind: AWSMachineTemplate"))
            .collect::<Vec<_>>()
            .join("---\n");
        let err = CapaBuilder::new(Box::new(generator_returning(without_template)), key_source())
            .build_graph(&request())
            .expect_err("missing template should fail");
        assert!(err.to_string().contains("AWSMachineTemplate"));
    }

    #[test]
    fn generator_failure_propagates() {
        let mut generator = MockTemplateGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(Error::generation("clusterctl exited with 1")));

        let _lock = crate::env::lock_environment();
        let previous: Vec<_> = CAPA_ENV_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();
        for name in CAPA_ENV_VARS {
            std::env::set_var(name, format!("stale-{name}"));
        }

        let err = CapaBuilder::new(Box::new(generator), key_source())
            .build_graph(&request())
            .expect_err("generator failure should propagate");
        assert!(matches!(err, Error::Generation { .. }));

        for name in CAPA_ENV_VARS {
            assert_eq!(
                std::env::var(name).ok(),
                Some(format!("stale-{name}")),
                "{name} should be restored after a failed generation"
            );
        }
        for (name, value) in previous {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }

    #[test]
    fn generator_runs_with_a_blank_environment() {
        let mut generator = MockTemplateGenerator::new();
        generator.expect_generate().returning(|_| {
            for name in CAPA_ENV_VARS {
                assert_eq!(std::env::var(name).as_deref(), Ok(""), "{name} should be blank");
            }
            parse_objects(&base_objects("a1b2c", "org-acme", Some(3)))
        });
        CapaBuilder::new(Box::new(generator), key_source())
            .build_graph(&request())
            .expect("graph should build");
    }
}
