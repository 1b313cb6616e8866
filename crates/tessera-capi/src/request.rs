//! Cluster request
//!
//! Everything a caller supplies to compose one cluster's manifests.

use std::collections::BTreeMap;

use rand::Rng;

use tessera_common::organization_namespace;

/// Input for one manifest composition
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterRequest {
    /// Cluster name (also used as cluster ID)
    pub name: String,
    /// Owning organization
    pub owner: String,
    /// Release identifier; selects the schema generation
    pub release_version: String,
    /// Availability zones for the control plane; the length sets the replica count
    pub control_plane_azs: Vec<String>,
    /// Pod CIDR override (legacy generation only)
    pub pods_cidr: Option<String>,
    /// Whether pod traffic leaves through an external SNAT (legacy generation only)
    pub external_snat: bool,
    /// Control plane subnet size override
    pub control_plane_subnet: Option<String>,
    /// Caller-supplied labels for the cluster object
    pub labels: BTreeMap<String, String>,
    /// Human-readable description
    pub description: String,
    /// Identifier of the output file, used to name the rendered template
    pub file_name: String,
}

impl ClusterRequest {
    /// Namespace of the owning organization
    pub fn organization_namespace(&self) -> String {
        organization_namespace(&self.owner)
    }

    /// Control plane replica count implied by the availability zones
    ///
    /// `None` when no zones were given, leaving the count to the generator.
    pub fn control_plane_replicas(&self) -> Option<i64> {
        match self.control_plane_azs.len() {
            0 => None,
            n => Some(n as i64),
        }
    }
}

/// Length of generated cluster and control plane IDs
const ID_LENGTH: usize = 5;

/// Generate a short resource ID
///
/// IDs start with a letter so they are valid DNS labels and never parse as
/// numbers.
pub fn generate_id() -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::rng();
    let mut id = String::with_capacity(ID_LENGTH);
    id.push(LETTERS[rng.random_range(0..LETTERS.len())] as char);
    for _ in 1..ID_LENGTH {
        id.push(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char);
    }
    id
}
