//! Cluster API Provider AWS types (v1alpha3)

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use super::Extra;
use crate::constants::CAPA_API_VERSION;

/// Kind of the identity an AWSCluster assumes
pub const CLUSTER_ROLE_IDENTITY_KIND: &str = "AWSClusterRoleIdentity";

/// CAPA AWSCluster
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsCluster {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: AwsClusterSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsClusterSpec {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_name: Option<String>,
    #[serde(default)]
    pub network_spec: NetworkSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_ref: Option<AwsIdentityReference>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<SubnetSpec>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A subnet CAPA should create (or adopt) for the cluster
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl SubnetSpec {
    /// Subnet in the given zone, public or private
    pub fn in_zone(zone: &str, is_public: bool) -> Self {
        Self {
            availability_zone: zone.to_string(),
            is_public,
            ..Default::default()
        }
    }
}

/// Reference to an AWS identity object
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsIdentityReference {
    pub kind: String,
    pub name: String,
}

/// CAPA AWSMachineTemplate
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineTemplate {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: AwsMachineTemplateSpec,
}

impl AwsMachineTemplate {
    /// Create an AWSMachineTemplate with the given identity and machine spec
    pub fn new(name: &str, namespace: &str, machine: AwsMachineSpec) -> Self {
        Self {
            api_version: CAPA_API_VERSION.to_string(),
            kind: "AWSMachineTemplate".to_string(),
            metadata: super::object_meta(name, namespace),
            spec: AwsMachineTemplateSpec {
                template: AwsMachineTemplateResource { spec: machine },
            },
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineTemplateSpec {
    pub template: AwsMachineTemplateResource,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineTemplateResource {
    pub spec: AwsMachineSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachineSpec {
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_instance_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_name: Option<String>,
    #[serde(rename = "publicIP", default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncompressed_user_data: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<CloudInit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_security_groups: Vec<AwsResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<AwsResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_lookup_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_lookup_format: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// How user data reaches the instance
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudInit {
    #[serde(default)]
    pub insecure_skip_secrets_manager: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Selects an AWS resource by ID or by tag filters
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsResourceReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl AwsResourceReference {
    /// Reference selecting resources by tag filters only
    pub fn by_filters(filters: Vec<Filter>) -> Self {
        Self { id: None, filters }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    /// Filter matching a single tag value
    pub fn tag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
        }
    }
}

/// CAPA AWSClusterRoleIdentity
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsClusterRoleIdentity {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: AwsClusterRoleIdentitySpec,
}

impl AwsClusterRoleIdentity {
    /// Create an identity with the given identity and spec
    pub fn new(name: &str, namespace: &str, spec: AwsClusterRoleIdentitySpec) -> Self {
        Self {
            api_version: CAPA_API_VERSION.to_string(),
            kind: CLUSTER_ROLE_IDENTITY_KIND.to_string(),
            metadata: super::object_meta(name, namespace),
            spec,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsClusterRoleIdentitySpec {
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_identity_ref: Option<AwsIdentityReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_namespaces: Option<AllowedNamespaces>,
}

/// Namespaces whose clusters may use an identity
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AllowedNamespaces {
    #[serde(default)]
    pub list: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aws_cluster_requires_region() {
        let result = serde_json::from_value::<AwsCluster>(serde_json::json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha3",
            "kind": "AWSCluster",
            "metadata": { "name": "a1b2c" },
            "spec": { "sshKeyName": "default" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn aws_cluster_keeps_generator_fields() {
        let cluster: AwsCluster = serde_json::from_value(serde_json::json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha3",
            "kind": "AWSCluster",
            "metadata": { "name": "a1b2c" },
            "spec": {
                "region": "eu-west-1",
                "sshKeyName": "",
                "bastion": { "enabled": false },
                "networkSpec": { "vpc": { "cidrBlock": "10.0.0.0/16" } }
            }
        }))
        .expect("AWSCluster should deserialize");

        assert_eq!(cluster.spec.region, "eu-west-1");
        assert!(cluster.spec.extra.contains_key("bastion"));
        assert!(cluster.spec.network_spec.extra.contains_key("vpc"));

        let value = serde_json::to_value(&cluster).expect("AWSCluster should serialize");
        assert_eq!(value["spec"]["bastion"]["enabled"], false);
        assert_eq!(value["spec"]["networkSpec"]["vpc"]["cidrBlock"], "10.0.0.0/16");
    }

    #[test]
    fn machine_spec_uses_capa_field_names() {
        let spec = AwsMachineSpec {
            instance_type: "t3.small".into(),
            iam_instance_profile: Some("control-plane-a1b2c".into()),
            public_ip: Some(true),
            uncompressed_user_data: Some(true),
            ..Default::default()
        };
        let value = serde_json::to_value(&spec).expect("spec should serialize");
        assert_eq!(value["publicIP"], true);
        assert_eq!(value["iamInstanceProfile"], "control-plane-a1b2c");
        assert_eq!(value["uncompressedUserData"], true);
        assert!(value.get("subnet").is_none());
    }

    #[test]
    fn identity_serializes_allowed_namespace_list() {
        let identity = AwsClusterRoleIdentity::new(
            "a1b2c",
            "org-acme",
            AwsClusterRoleIdentitySpec {
                allowed_namespaces: Some(AllowedNamespaces {
                    list: vec!["org-acme".into()],
                }),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&identity).expect("identity should serialize");
        assert_eq!(value["kind"], "AWSClusterRoleIdentity");
        assert_eq!(value["spec"]["allowedNamespaces"]["list"][0], "org-acme");
        assert!(value["spec"].get("roleARN").is_none());
    }
}
