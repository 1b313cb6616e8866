//! Provider-specific cluster types reconciled by the legacy AWS operator

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::constants::LEGACY_INFRASTRUCTURE_API_VERSION;

/// Legacy AWSCluster (`infrastructure.giantswarm.io`)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAwsCluster {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: LegacyAwsClusterSpec,
}

impl LegacyAwsCluster {
    /// Create a legacy AWSCluster with the given identity and spec
    pub fn new(name: &str, namespace: &str, spec: LegacyAwsClusterSpec) -> Self {
        Self {
            api_version: LEGACY_INFRASTRUCTURE_API_VERSION.to_string(),
            kind: "AWSCluster".to_string(),
            metadata: super::object_meta(name, namespace),
            spec,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAwsClusterSpec {
    pub cluster: LegacyClusterSettings,
    pub provider: LegacyProviderSettings,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyClusterSettings {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dns: LegacyDns,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDns {
    #[serde(default)]
    pub domain: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProviderSettings {
    pub credential_secret: CredentialSecret,
    pub master: LegacyMaster,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<LegacyPods>,
    #[serde(default)]
    pub region: String,
}

/// Secret holding the AWS credentials the operator assumes
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CredentialSecret {
    pub name: String,
    pub namespace: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMaster {
    #[serde(default)]
    pub availability_zone: String,
    pub instance_type: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPods {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cidr_block: String,
    #[serde(rename = "externalSNAT", default, skip_serializing_if = "Option::is_none")]
    pub external_snat: Option<bool>,
}

/// G8sControlPlane, the provider-independent control plane
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct G8sControlPlane {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: G8sControlPlaneSpec,
}

impl G8sControlPlane {
    /// Create a G8sControlPlane with the given identity and spec
    pub fn new(name: &str, namespace: &str, spec: G8sControlPlaneSpec) -> Self {
        Self {
            api_version: LEGACY_INFRASTRUCTURE_API_VERSION.to_string(),
            kind: "G8sControlPlane".to_string(),
            metadata: super::object_meta(name, namespace),
            spec,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct G8sControlPlaneSpec {
    pub replicas: i32,
    pub infrastructure_ref: ObjectReference,
}

/// AWSControlPlane, the AWS half of a legacy control plane
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsControlPlane {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: AwsControlPlaneSpec,
}

impl AwsControlPlane {
    /// Create an AWSControlPlane with the given identity and spec
    pub fn new(name: &str, namespace: &str, spec: AwsControlPlaneSpec) -> Self {
        Self {
            api_version: LEGACY_INFRASTRUCTURE_API_VERSION.to_string(),
            kind: "AWSControlPlane".to_string(),
            metadata: super::object_meta(name, namespace),
            spec,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsControlPlaneSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability_zones: Vec<String>,
    pub instance_type: String,
}
