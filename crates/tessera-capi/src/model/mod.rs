//! Object model for composed cluster manifests
//!
//! Every object tessera emits is one [`ResourceObject`] variant. Objects are
//! collected into an [`ObjectGraph`], which knows the shared label set and
//! can check its own consistency before anything is serialized.

pub mod capa;
pub mod capi;
pub mod legacy;

use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::core::v1::{ObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;

use tessera_common::{Error, Result};

use crate::constants::{bastion_resource_name, LABEL_CAPI_ROLE, ROLE_BASTION, ROLE_CONTROL_PLANE};
use crate::release::SchemaGeneration;

use self::capa::{AwsCluster, AwsClusterRoleIdentity, AwsMachineTemplate};
use self::capi::{Cluster, KubeadmControlPlane, MachineDeployment};
use self::legacy::{AwsControlPlane, G8sControlPlane, LegacyAwsCluster};

/// Fields emitted by the generator that tessera passes through untouched
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Metadata carrying only a name and namespace
pub fn object_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Role an object plays in a cluster, independent of schema generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Cluster,
    InfrastructureCluster,
    ControlPlane,
    InfrastructureControlPlane,
    MachineTemplate,
    MachineDeployment,
    Identity,
    Secret,
}

/// Base object kinds the modern builder knows how to type
///
/// Anything else the generator returns is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecognizedKind {
    AwsCluster,
    AwsMachineTemplate,
    Cluster,
    KubeadmControlPlane,
}

impl RecognizedKind {
    /// Classify an untyped object by its `kind`
    pub fn classify(object: &DynamicObject) -> Option<Self> {
        match object.types.as_ref()?.kind.as_str() {
            "AWSCluster" => Some(Self::AwsCluster),
            "AWSMachineTemplate" => Some(Self::AwsMachineTemplate),
            "Cluster" => Some(Self::Cluster),
            "KubeadmControlPlane" => Some(Self::KubeadmControlPlane),
            _ => None,
        }
    }

    /// Kubernetes kind string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsCluster => "AWSCluster",
            Self::AwsMachineTemplate => "AWSMachineTemplate",
            Self::Cluster => "Cluster",
            Self::KubeadmControlPlane => "KubeadmControlPlane",
        }
    }

    /// Convert an untyped object of this kind into its typed form
    pub fn convert(&self, object: &DynamicObject) -> Result<ResourceObject> {
        Ok(match self {
            Self::AwsCluster => ResourceObject::AwsCluster(self.typed(object)?),
            Self::AwsMachineTemplate => ResourceObject::AwsMachineTemplate(self.typed(object)?),
            Self::Cluster => ResourceObject::Cluster(self.typed(object)?),
            Self::KubeadmControlPlane => ResourceObject::KubeadmControlPlane(self.typed(object)?),
        })
    }

    fn typed<T: DeserializeOwned>(&self, object: &DynamicObject) -> Result<T> {
        let value =
            serde_json::to_value(object).map_err(|e| Error::conversion(self.as_str(), e))?;
        serde_json::from_value(value).map_err(|e| Error::conversion(self.as_str(), e))
    }
}

/// Any object that can appear in a composed graph
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceObject {
    Cluster(Cluster),
    AwsCluster(AwsCluster),
    KubeadmControlPlane(KubeadmControlPlane),
    AwsMachineTemplate(AwsMachineTemplate),
    AwsClusterRoleIdentity(AwsClusterRoleIdentity),
    MachineDeployment(MachineDeployment),
    Secret(Secret),
    LegacyAwsCluster(LegacyAwsCluster),
    G8sControlPlane(G8sControlPlane),
    AwsControlPlane(AwsControlPlane),
}

impl ResourceObject {
    /// Generation-independent role of this object
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Cluster(_) => ObjectKind::Cluster,
            Self::AwsCluster(_) | Self::LegacyAwsCluster(_) => ObjectKind::InfrastructureCluster,
            Self::KubeadmControlPlane(_) | Self::G8sControlPlane(_) => ObjectKind::ControlPlane,
            Self::AwsControlPlane(_) => ObjectKind::InfrastructureControlPlane,
            Self::AwsMachineTemplate(_) => ObjectKind::MachineTemplate,
            Self::MachineDeployment(_) => ObjectKind::MachineDeployment,
            Self::AwsClusterRoleIdentity(_) => ObjectKind::Identity,
            Self::Secret(_) => ObjectKind::Secret,
        }
    }

    /// Kubernetes kind string
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Cluster(_) => "Cluster",
            Self::AwsCluster(_) | Self::LegacyAwsCluster(_) => "AWSCluster",
            Self::KubeadmControlPlane(_) => "KubeadmControlPlane",
            Self::AwsMachineTemplate(_) => "AWSMachineTemplate",
            Self::AwsClusterRoleIdentity(_) => "AWSClusterRoleIdentity",
            Self::MachineDeployment(_) => "MachineDeployment",
            Self::Secret(_) => "Secret",
            Self::G8sControlPlane(_) => "G8sControlPlane",
            Self::AwsControlPlane(_) => "AWSControlPlane",
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Cluster(o) => &o.metadata,
            Self::AwsCluster(o) => &o.metadata,
            Self::KubeadmControlPlane(o) => &o.metadata,
            Self::AwsMachineTemplate(o) => &o.metadata,
            Self::AwsClusterRoleIdentity(o) => &o.metadata,
            Self::MachineDeployment(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
            Self::LegacyAwsCluster(o) => &o.metadata,
            Self::G8sControlPlane(o) => &o.metadata,
            Self::AwsControlPlane(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Cluster(o) => &mut o.metadata,
            Self::AwsCluster(o) => &mut o.metadata,
            Self::KubeadmControlPlane(o) => &mut o.metadata,
            Self::AwsMachineTemplate(o) => &mut o.metadata,
            Self::AwsClusterRoleIdentity(o) => &mut o.metadata,
            Self::MachineDeployment(o) => &mut o.metadata,
            Self::Secret(o) => &mut o.metadata,
            Self::LegacyAwsCluster(o) => &mut o.metadata,
            Self::G8sControlPlane(o) => &mut o.metadata,
            Self::AwsControlPlane(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// References from this object to other objects in the same graph
    pub fn references(&self) -> Vec<GraphRef> {
        let mut refs = Vec::new();
        match self {
            Self::Cluster(o) => {
                refs.extend(o.spec.infrastructure_ref.as_ref().and_then(GraphRef::from_object));
                refs.extend(o.spec.control_plane_ref.as_ref().and_then(GraphRef::from_object));
            }
            Self::AwsCluster(o) => {
                refs.extend(o.spec.identity_ref.as_ref().map(|r| GraphRef {
                    kind: r.kind.clone(),
                    name: r.name.clone(),
                }));
            }
            Self::KubeadmControlPlane(o) => {
                refs.extend(GraphRef::from_object(&o.spec.infrastructure_template));
            }
            Self::G8sControlPlane(o) => {
                refs.extend(GraphRef::from_object(&o.spec.infrastructure_ref));
            }
            Self::MachineDeployment(o) => {
                let machine = &o.spec.template.spec;
                refs.extend(GraphRef::from_object(&machine.infrastructure_ref));
                refs.extend(
                    machine
                        .bootstrap
                        .config_ref
                        .as_ref()
                        .and_then(GraphRef::from_object),
                );
                refs.extend(machine.bootstrap.data_secret_name.as_ref().map(|name| GraphRef {
                    kind: "Secret".to_string(),
                    name: name.clone(),
                }));
            }
            Self::AwsMachineTemplate(_)
            | Self::AwsClusterRoleIdentity(_)
            | Self::Secret(_)
            | Self::LegacyAwsCluster(_)
            | Self::AwsControlPlane(_) => {}
        }
        refs
    }

    /// Serialize this object as a YAML document
    pub fn to_yaml(&self) -> Result<String> {
        let result = match self {
            Self::Cluster(o) => serde_yaml::to_string(o),
            Self::AwsCluster(o) => serde_yaml::to_string(o),
            Self::KubeadmControlPlane(o) => serde_yaml::to_string(o),
            Self::AwsMachineTemplate(o) => serde_yaml::to_string(o),
            Self::AwsClusterRoleIdentity(o) => serde_yaml::to_string(o),
            Self::MachineDeployment(o) => serde_yaml::to_string(o),
            Self::Secret(o) => serde_yaml::to_string(o),
            Self::LegacyAwsCluster(o) => serde_yaml::to_string(o),
            Self::G8sControlPlane(o) => serde_yaml::to_string(o),
            Self::AwsControlPlane(o) => serde_yaml::to_string(o),
        };
        result.map_err(|e| Error::serialization_for_kind(self.kind_name(), e.to_string()))
    }
}

macro_rules! impl_from_object {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ResourceObject {
                fn from(object: $ty) -> Self {
                    Self::$variant(object)
                }
            }
        )*
    };
}

impl_from_object! {
    Cluster => Cluster,
    AwsCluster => AwsCluster,
    KubeadmControlPlane => KubeadmControlPlane,
    AwsMachineTemplate => AwsMachineTemplate,
    AwsClusterRoleIdentity => AwsClusterRoleIdentity,
    MachineDeployment => MachineDeployment,
    Secret => Secret,
    LegacyAwsCluster => LegacyAwsCluster,
    G8sControlPlane => G8sControlPlane,
    AwsControlPlane => AwsControlPlane,
}

/// A by-name reference to another object in the graph
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphRef {
    pub kind: String,
    pub name: String,
}

impl GraphRef {
    fn from_object(reference: &ObjectReference) -> Option<Self> {
        Some(Self {
            kind: reference.kind.clone()?,
            name: reference.name.clone()?,
        })
    }
}

/// One object and the template field it is rendered into
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEntry {
    pub field: &'static str,
    pub object: ResourceObject,
}

/// Every object composed for one cluster request
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectGraph {
    generation: SchemaGeneration,
    shared_labels: BTreeMap<String, String>,
    entries: Vec<GraphEntry>,
}

impl ObjectGraph {
    /// Create an empty graph whose objects must all carry `shared_labels`
    pub fn new(generation: SchemaGeneration, shared_labels: BTreeMap<String, String>) -> Self {
        Self {
            generation,
            shared_labels,
            entries: Vec::new(),
        }
    }

    pub fn generation(&self) -> SchemaGeneration {
        self.generation
    }

    pub fn shared_labels(&self) -> &BTreeMap<String, String> {
        &self.shared_labels
    }

    /// Add an object rendered into the given template field
    pub fn push(&mut self, field: &'static str, object: impl Into<ResourceObject>) {
        self.entries.push(GraphEntry {
            field,
            object: object.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceObject> {
        self.entries.iter().map(|e| &e.object)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResourceObject> {
        self.entries.iter_mut().map(|e| &mut e.object)
    }

    /// Object rendered into the given template field
    pub fn get(&self, field: &str) -> Option<&ResourceObject> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .map(|e| &e.object)
    }

    /// Object with the given Kubernetes kind and name
    pub fn find(&self, kind: &str, name: &str) -> Option<&ResourceObject> {
        self.iter()
            .find(|o| o.kind_name() == kind && o.name() == name)
    }

    /// The single cluster object, if present
    pub fn cluster(&self) -> Option<&ResourceObject> {
        self.iter().find(|o| o.kind() == ObjectKind::Cluster)
    }

    /// Check every consistency rule a graph must satisfy before rendering
    pub fn validate(&self) -> Result<()> {
        self.check_cardinality()?;
        self.check_identities()?;
        self.check_namespaces()?;
        self.check_labels()?;
        self.check_references()
    }

    /// Serialize every object into its template field
    pub fn to_fragments(&self) -> Result<BTreeMap<String, String>> {
        self.entries
            .iter()
            .map(|e| Ok((e.field.to_string(), e.object.to_yaml()?)))
            .collect()
    }

    fn check_cardinality(&self) -> Result<()> {
        for kind in [ObjectKind::Cluster, ObjectKind::InfrastructureCluster] {
            let count = self.iter().filter(|o| o.kind() == kind).count();
            if count != 1 {
                return Err(Error::graph(format!(
                    "expected exactly one {kind:?} object, found {count}"
                )));
            }
        }
        Ok(())
    }

    fn check_identities(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut fields = BTreeSet::new();
        for entry in &self.entries {
            let o = &entry.object;
            if !seen.insert((o.kind_name(), o.name(), o.namespace())) {
                return Err(Error::graph(format!(
                    "duplicate {} {:?} in namespace {:?}",
                    o.kind_name(),
                    o.name(),
                    o.namespace()
                )));
            }
            if !fields.insert(entry.field) {
                return Err(Error::graph(format!(
                    "template field {} is used twice",
                    entry.field
                )));
            }
        }
        Ok(())
    }

    // Every object follows the cluster object's namespace, including the
    // bastion pool, so checking against it covers both layouts.
    fn check_namespaces(&self) -> Result<()> {
        let expected = self.cluster().and_then(|c| c.namespace());
        for o in self.iter() {
            if o.namespace() != expected {
                return Err(Error::graph(format!(
                    "{} {} is in namespace {:?}, cluster is in {:?}",
                    o.kind_name(),
                    o.name(),
                    o.namespace(),
                    expected
                )));
            }
        }
        Ok(())
    }

    fn check_labels(&self) -> Result<()> {
        for o in self.iter() {
            for (key, value) in &self.shared_labels {
                if o.label(key) != Some(value.as_str()) {
                    return Err(Error::graph(format!(
                        "{} {} is missing shared label {key}={value}",
                        o.kind_name(),
                        o.name()
                    )));
                }
            }
        }

        if self.generation != SchemaGeneration::Modern {
            return Ok(());
        }

        let cluster_name = self.cluster().map(|c| c.name()).unwrap_or_default();
        let bastion = bastion_resource_name(cluster_name);
        for o in self.iter().filter(|o| o.name() == bastion) {
            if o.label(LABEL_CAPI_ROLE) != Some(ROLE_BASTION) {
                return Err(Error::graph(format!(
                    "{} {} is missing the bastion role label",
                    o.kind_name(),
                    o.name()
                )));
            }
        }

        let control_plane_templates = self.iter().filter_map(|o| match o {
            ResourceObject::KubeadmControlPlane(kcp) => kcp.spec.infrastructure_template.name.as_deref(),
            _ => None,
        });
        for name in control_plane_templates {
            let template = self.find("AWSMachineTemplate", name);
            if template.and_then(|t| t.label(LABEL_CAPI_ROLE)) != Some(ROLE_CONTROL_PLANE) {
                return Err(Error::graph(format!(
                    "AWSMachineTemplate {name} is missing the control-plane role label"
                )));
            }
        }
        Ok(())
    }

    fn check_references(&self) -> Result<()> {
        for o in self.iter() {
            for r in o.references() {
                if self.find(&r.kind, &r.name).is_none() {
                    return Err(Error::graph(format!(
                        "{} {} references {} {} which is not in the graph",
                        o.kind_name(),
                        o.name(),
                        r.kind,
                        r.name
                    )));
                }
            }
        }
        Ok(())
    }
}
