//! Organization CRD
//!
//! An Organization is the tenant boundary on a management cluster. Each one
//! owns a namespace (`org-<name>`) that its clusters are placed into.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Organization is a cluster-scoped tenant.
///
/// Example:
/// ```yaml
/// apiVersion: security.giantswarm.io/v1alpha1
/// kind: Organization
/// metadata:
///   name: acme
/// spec: {}
/// status:
///   namespace: org-acme
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "security.giantswarm.io",
    version = "v1alpha1",
    kind = "Organization",
    status = "OrganizationStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Namespace","type":"string","jsonPath":".status.namespace"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSpec {}

/// Observed state of an Organization
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationStatus {
    /// Namespace created for this organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{Resource, ResourceExt};

    #[test]
    fn organization_is_cluster_scoped() {
        let org = Organization::new("acme", OrganizationSpec::default());
        assert_eq!(org.name_any(), "acme");
        assert!(org.namespace().is_none());
        assert_eq!(Organization::api_version(&()), "security.giantswarm.io/v1alpha1");
        assert_eq!(Organization::kind(&()), "Organization");
    }

    #[test]
    fn status_namespace_roundtrips_from_json() {
        let org: Organization = serde_json::from_value(serde_json::json!({
            "apiVersion": "security.giantswarm.io/v1alpha1",
            "kind": "Organization",
            "metadata": { "name": "acme" },
            "spec": {},
            "status": { "namespace": "org-acme" }
        }))
        .expect("organization should deserialize");

        assert_eq!(
            org.status.and_then(|s| s.namespace).as_deref(),
            Some("org-acme")
        );
    }
}
