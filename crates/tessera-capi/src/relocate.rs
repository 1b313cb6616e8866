//! Namespace relocation
//!
//! Moves a composed graph into a tenant namespace. Every object and every
//! embedded infrastructure reference ends up in the target namespace; other
//! references are rewritten only when they name a namespace.

use k8s_openapi::api::core::v1::ObjectReference;
use tracing::debug;

use crate::model::{ObjectGraph, ResourceObject};

/// Return a copy of `graph` with every object moved into `namespace`
///
/// Applying it twice with the same namespace gives the same graph as
/// applying it once.
pub fn relocate(graph: &ObjectGraph, namespace: &str) -> ObjectGraph {
    let mut relocated = graph.clone();
    for object in relocated.iter_mut() {
        object.metadata_mut().namespace = Some(namespace.to_string());
        relocate_references(object, namespace);
    }
    debug!(namespace, objects = relocated.len(), "relocated object graph");
    relocated
}

fn relocate_references(object: &mut ResourceObject, namespace: &str) {
    match object {
        ResourceObject::Cluster(cluster) => {
            if let Some(r) = cluster.spec.infrastructure_ref.as_mut() {
                pin_namespace(r, namespace);
            }
            if let Some(r) = cluster.spec.control_plane_ref.as_mut() {
                rewrite_namespace(r, namespace);
            }
        }
        ResourceObject::G8sControlPlane(cp) => pin_namespace(&mut cp.spec.infrastructure_ref, namespace),
        ResourceObject::KubeadmControlPlane(kcp) => {
            pin_namespace(&mut kcp.spec.infrastructure_template, namespace)
        }
        ResourceObject::MachineDeployment(md) => {
            let machine = &mut md.spec.template.spec;
            pin_namespace(&mut machine.infrastructure_ref, namespace);
            if let Some(r) = machine.bootstrap.config_ref.as_mut() {
                rewrite_namespace(r, namespace);
            }
        }
        ResourceObject::AwsCluster(_)
        | ResourceObject::AwsMachineTemplate(_)
        | ResourceObject::AwsClusterRoleIdentity(_)
        | ResourceObject::Secret(_)
        | ResourceObject::LegacyAwsCluster(_)
        | ResourceObject::AwsControlPlane(_) => {}
    }
}

/// Infrastructure references always name the target namespace
fn pin_namespace(reference: &mut ObjectReference, namespace: &str) {
    reference.namespace = Some(namespace.to_string());
}

// Other references without a namespace resolve to the referrer's namespace
fn rewrite_namespace(reference: &mut ObjectReference, namespace: &str) {
    if reference.namespace.is_some() {
        reference.namespace = Some(namespace.to_string());
    }
}
