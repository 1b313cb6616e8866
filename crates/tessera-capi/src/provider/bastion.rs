//! Bastion node pool
//!
//! A single always-on machine outside the managed control plane and worker
//! pools, used for SSH access to the cluster. It is made of three objects
//! that reference each other by the same name: a bootstrap secret, a machine
//! deployment and a machine template.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use tessera_common::Result;

use crate::bootstrap::bastion_ignition;
use crate::constants::{
    bastion_resource_name, capa_cluster_owned_tag, flatcar_account_id, BASTION_IMAGE_FORMAT,
    BASTION_INSTANCE_TYPE, BASTION_MACHINE_VERSION, BOOTSTRAP_SECRET_TYPE, CAPA_API_VERSION,
    CAPA_ROLE_TAG, LABEL_CAPI_CLUSTER_NAME, LABEL_CAPI_DEPLOYMENT_NAME, ROLE_BASTION,
};
use crate::metadata::with_role;
use crate::model::capa::{AwsMachineSpec, AwsMachineTemplate, AwsResourceReference, CloudInit, Filter};
use crate::model::capi::{
    Bootstrap, MachineDeployment, MachineDeploymentSpec, MachineDeploymentStrategy,
    MachineRollingUpdateDeployment, MachineSpec, MachineTemplateMeta, MachineTemplateSpec,
};
use crate::model::object_meta;

/// Key of the bootstrap data inside the secret
const BOOTSTRAP_DATA_KEY: &str = "value";

/// The three objects making up a cluster's bastion
#[derive(Clone, Debug, PartialEq)]
pub struct BastionPool {
    pub secret: Secret,
    pub machine_deployment: MachineDeployment,
    pub machine_template: AwsMachineTemplate,
}

/// Inputs the bastion needs from the rest of the graph
pub struct BastionParams<'a> {
    pub cluster_name: &'a str,
    pub namespace: &'a str,
    /// Region resolved from the infrastructure cluster, used for image lookup
    pub region: &'a str,
    pub sso_public_key: &'a str,
    pub shared_labels: &'a BTreeMap<String, String>,
}

/// Build the bastion pool for a cluster
pub fn build(params: &BastionParams<'_>) -> Result<BastionPool> {
    let name = bastion_resource_name(params.cluster_name);
    let labels = with_role(params.shared_labels, ROLE_BASTION);

    let mut secret = bootstrap_secret(params, &name)?;
    secret.metadata.labels = Some(labels.clone());

    let mut machine_deployment = machine_deployment(params, &name);
    machine_deployment.metadata.labels = Some(labels.clone());

    let mut machine_template = machine_template(params, &name);
    machine_template.metadata.labels = Some(labels);

    Ok(BastionPool {
        secret,
        machine_deployment,
        machine_template,
    })
}

fn bootstrap_secret(params: &BastionParams<'_>, name: &str) -> Result<Secret> {
    let ignition = bastion_ignition(params.cluster_name, params.sso_public_key)?;
    Ok(Secret {
        metadata: object_meta(name, params.namespace),
        type_: Some(BOOTSTRAP_SECRET_TYPE.to_string()),
        string_data: Some(BTreeMap::from([(BOOTSTRAP_DATA_KEY.to_string(), ignition)])),
        ..Default::default()
    })
}

fn machine_deployment(params: &BastionParams<'_>, name: &str) -> MachineDeployment {
    let selector_labels = BTreeMap::from([
        (LABEL_CAPI_CLUSTER_NAME.to_string(), params.cluster_name.to_string()),
        (LABEL_CAPI_DEPLOYMENT_NAME.to_string(), name.to_string()),
    ]);

    MachineDeployment::new(
        name,
        params.namespace,
        MachineDeploymentSpec {
            cluster_name: params.cluster_name.to_string(),
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels.clone()),
                ..Default::default()
            },
            strategy: Some(MachineDeploymentStrategy {
                type_: "RollingUpdate".to_string(),
                rolling_update: Some(MachineRollingUpdateDeployment {
                    max_surge: Some(IntOrString::Int(1)),
                    max_unavailable: Some(IntOrString::Int(1)),
                }),
            }),
            template: MachineTemplateSpec {
                metadata: MachineTemplateMeta {
                    labels: selector_labels,
                },
                spec: MachineSpec {
                    cluster_name: params.cluster_name.to_string(),
                    bootstrap: Bootstrap {
                        config_ref: None,
                        data_secret_name: Some(name.to_string()),
                    },
                    infrastructure_ref: ObjectReference {
                        api_version: Some(CAPA_API_VERSION.to_string()),
                        kind: Some("AWSMachineTemplate".to_string()),
                        name: Some(name.to_string()),
                        ..Default::default()
                    },
                    // The bastion never runs Kubernetes, but AMI lookup needs a version
                    version: Some(BASTION_MACHINE_VERSION.to_string()),
                },
            },
        },
    )
}

fn machine_template(params: &BastionParams<'_>, name: &str) -> AwsMachineTemplate {
    AwsMachineTemplate::new(
        name,
        params.namespace,
        AwsMachineSpec {
            instance_type: BASTION_INSTANCE_TYPE.to_string(),
            iam_instance_profile: Some(String::new()),
            ssh_key_name: Some(String::new()),
            public_ip: Some(true),
            // Ignition rejects encrypted or compressed user data
            uncompressed_user_data: Some(true),
            cloud_init: Some(CloudInit {
                insecure_skip_secrets_manager: true,
                ..Default::default()
            }),
            additional_security_groups: vec![AwsResourceReference::by_filters(vec![
                Filter::tag(CAPA_ROLE_TAG, ROLE_BASTION),
                Filter::tag(capa_cluster_owned_tag(params.cluster_name), "owned"),
            ])],
            subnet: Some(AwsResourceReference::by_filters(vec![Filter::tag(
                CAPA_ROLE_TAG,
                "public",
            )])),
            image_lookup_org: Some(flatcar_account_id(params.region).to_string()),
            image_lookup_format: Some(BASTION_IMAGE_FORMAT.to_string()),
            ..Default::default()
        },
    )
}
