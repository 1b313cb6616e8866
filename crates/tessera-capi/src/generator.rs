//! Base object set generation
//!
//! The modern builder starts from the object set `clusterctl generate cluster`
//! produces for the CAPA provider. The generator is a black box behind
//! [`TemplateGenerator`] so the builder can be tested without it.

use std::path::PathBuf;
use std::process::Command;

use kube::core::DynamicObject;
use serde::Deserialize;
use tracing::{debug, info};

use tessera_common::{Error, Result};

use crate::constants::{CAPA_FLAVOR, CAPA_INFRASTRUCTURE_PROVIDER, CAPA_KUBERNETES_VERSION};

/// Parameters for one base object set
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
    pub cluster_name: String,
    pub target_namespace: String,
    pub kubernetes_version: String,
    /// Provider and version, e.g. `aws:v0.6.8`
    pub infrastructure_provider: String,
    pub flavor: String,
    /// `None` leaves the count to the generator's default
    pub control_plane_machine_count: Option<i64>,
}

impl GenerateOptions {
    /// Options with the fixed CAPA version, provider and flavor
    pub fn capa(
        cluster_name: &str,
        target_namespace: &str,
        control_plane_machine_count: Option<i64>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            target_namespace: target_namespace.to_string(),
            kubernetes_version: CAPA_KUBERNETES_VERSION.to_string(),
            infrastructure_provider: CAPA_INFRASTRUCTURE_PROVIDER.to_string(),
            flavor: CAPA_FLAVOR.to_string(),
            control_plane_machine_count,
        }
    }
}

/// Produces the untyped base object set for a cluster
#[cfg_attr(test, mockall::automock)]
pub trait TemplateGenerator: Send + Sync {
    fn generate(&self, options: &GenerateOptions) -> Result<Vec<DynamicObject>>;
}

/// Generator shelling out to `clusterctl`
#[derive(Clone, Debug)]
pub struct ClusterctlGenerator {
    binary: PathBuf,
}

impl Default for ClusterctlGenerator {
    fn default() -> Self {
        Self::new("clusterctl")
    }
}

impl ClusterctlGenerator {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(options: &GenerateOptions) -> Vec<String> {
        let mut args = vec![
            "generate".to_string(),
            "cluster".to_string(),
            options.cluster_name.clone(),
            "--target-namespace".to_string(),
            options.target_namespace.clone(),
            "--kubernetes-version".to_string(),
            options.kubernetes_version.clone(),
            "--infrastructure".to_string(),
            options.infrastructure_provider.clone(),
            "--flavor".to_string(),
            options.flavor.clone(),
        ];
        if let Some(count) = options.control_plane_machine_count {
            args.push("--control-plane-machine-count".to_string());
            args.push(count.to_string());
        }
        args
    }
}

impl TemplateGenerator for ClusterctlGenerator {
    fn generate(&self, options: &GenerateOptions) -> Result<Vec<DynamicObject>> {
        let args = Self::args(options);
        info!(binary = %self.binary.display(), cluster = %options.cluster_name, "generating base object set");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| {
                Error::generation(format!("failed to run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(Error::generation(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_objects(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse a multi-document YAML stream into untyped objects
///
/// Empty documents are skipped; any other document that is not a
/// Kubernetes object fails the whole parse.
pub fn parse_objects(yaml: &str) -> Result<Vec<DynamicObject>> {
    let mut objects = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(yaml) {
        let value = serde_yaml::Value::deserialize(doc)
            .map_err(|e| Error::generation(format!("invalid generator output: {e}")))?;
        if value.is_null() {
            continue;
        }
        let object: DynamicObject = serde_yaml::from_value(value)
            .map_err(|e| Error::generation(format!("invalid object in generator output: {e}")))?;
        objects.push(object);
    }
    debug!(count = objects.len(), "parsed base object set");
    Ok(objects)
}
