//! Centralized constants for the tessera-capi crate
//!
//! Label keys, API versions and fixed values shared by both schema
//! generations live here so the builders cannot drift apart.

// =============================================================================
// API Versions
// =============================================================================

/// CAPI core API version (Cluster, MachineDeployment)
pub const CAPI_API_VERSION: &str = "cluster.x-k8s.io/v1alpha3";

/// CAPA infrastructure API version
pub const CAPA_API_VERSION: &str = "infrastructure.cluster.x-k8s.io/v1alpha3";

/// Legacy provider-specific infrastructure API version
pub const LEGACY_INFRASTRUCTURE_API_VERSION: &str = "infrastructure.giantswarm.io/v1alpha3";

// =============================================================================
// Labels and Annotations
// =============================================================================

/// Release the cluster runs
pub const LABEL_RELEASE_VERSION: &str = "release.giantswarm.io/version";

/// Cluster ID
pub const LABEL_CLUSTER: &str = "giantswarm.io/cluster";

/// Owning organization
pub const LABEL_ORGANIZATION: &str = "giantswarm.io/organization";

/// Legacy control plane ID
pub const LABEL_CONTROL_PLANE: &str = "giantswarm.io/control-plane";

/// Upstream CAPI cluster name label
pub const LABEL_CAPI_CLUSTER_NAME: &str = "cluster.x-k8s.io/cluster-name";

/// Upstream CAPI machine deployment label
pub const LABEL_CAPI_DEPLOYMENT_NAME: &str = "cluster.x-k8s.io/deployment-name";

/// Label controllers use to pick which objects they reconcile
pub const LABEL_WATCH_FILTER: &str = "cluster.x-k8s.io/watch-filter";

/// Role of a machine-related object, consumed by the IAM controller
pub const LABEL_CAPI_ROLE: &str = "cluster.x-k8s.io/role";

/// Role label value for the managed control plane
pub const ROLE_CONTROL_PLANE: &str = "control-plane";

/// Role label value for the auxiliary bastion node pool
pub const ROLE_BASTION: &str = "bastion";

/// Free-form cluster description
pub const ANNOTATION_CLUSTER_DESCRIPTION: &str = "cluster.giantswarm.io/description";

/// Subnet size override for the control plane network
pub const ANNOTATION_SUBNET_SIZE: &str = "aws.giantswarm.io/subnet-size";

// =============================================================================
// Base Object Generation
// =============================================================================

/// Kubernetes version requested from the generator
pub const CAPA_KUBERNETES_VERSION: &str = "v1.19.9";

/// Infrastructure provider requested from the generator
pub const CAPA_INFRASTRUCTURE_PROVIDER: &str = "aws:v0.6.8";

/// Deployment flavor requested from the generator
pub const CAPA_FLAVOR: &str = "machinepool";

/// Environment variables the generator substitutes into its templates
pub const CAPA_ENV_VARS: &[&str] = &[
    "AWS_REGION",
    "AWS_SUBNET",
    "AWS_CONTROL_PLANE_MACHINE_TYPE",
    "AWS_NODE_MACHINE_TYPE",
    "AWS_SSH_KEY_NAME",
];

// =============================================================================
// Fixed Values
// =============================================================================

/// Legacy master instance type
pub const LEGACY_MASTER_INSTANCE_TYPE: &str = "m5.xlarge";

/// Legacy provider credential secret
pub const LEGACY_CREDENTIAL_SECRET_NAME: &str = "credential-default";

/// Namespace of the legacy provider credential secret
pub const LEGACY_CREDENTIAL_SECRET_NAMESPACE: &str = "giantswarm";

/// Namespace for legacy clusters outside the organization layout
pub const DEFAULT_NAMESPACE: &str = "default";

/// Bastion instance type
pub const BASTION_INSTANCE_TYPE: &str = "t3.small";

/// Bastion machines do not run Kubernetes, but AMI lookup needs a version
pub const BASTION_MACHINE_VERSION: &str = "v0.0.0";

/// Image name pattern for bastion AMI lookup
pub const BASTION_IMAGE_FORMAT: &str = "Flatcar-stable-*";

/// Secret type CAPI expects for bootstrap data
pub const BOOTSTRAP_SECRET_TYPE: &str = "cluster.x-k8s.io/secret";

/// Non-root administrative account on every node
pub const ADMIN_USER: &str = "giantswarm";

/// Tag carrying the CAPA role of an AWS resource
pub const CAPA_ROLE_TAG: &str = "tag:sigs.k8s.io/cluster-api-provider-aws/role";

/// Flatcar image owner account in AWS China regions
const FLATCAR_CHINA_ACCOUNT_ID: &str = "306934455918";

/// Flatcar image owner account in every other region
const FLATCAR_ACCOUNT_ID: &str = "075585003325";

// =============================================================================
// Helper Functions
// =============================================================================

/// Tag marking AWS resources owned by the given cluster
pub fn capa_cluster_owned_tag(cluster_name: &str) -> String {
    format!("tag:sigs.k8s.io/cluster-api-provider-aws/cluster/{cluster_name}")
}

/// IAM instance profile for a cluster's control plane machines
pub fn control_plane_instance_profile(cluster_name: &str) -> String {
    format!("control-plane-{cluster_name}")
}

/// Name shared by every bastion resource of a cluster
pub fn bastion_resource_name(cluster_name: &str) -> String {
    format!("{cluster_name}-bastion")
}

/// AWS account publishing Flatcar images in the given region
pub fn flatcar_account_id(region: &str) -> &'static str {
    if region.starts_with("cn-") {
        FLATCAR_CHINA_ACCOUNT_ID
    } else {
        FLATCAR_ACCOUNT_ID
    }
}
