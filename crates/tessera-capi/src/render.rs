//! Manifest bundle rendering
//!
//! Each schema generation has one fixed bundle template with a named field
//! per object. Fields are filled with already-serialized YAML fragments.

use std::collections::BTreeMap;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use tracing::debug;

use tessera_common::{Error, Result};

use crate::release::SchemaGeneration;

const LEGACY_TEMPLATE: &str = "legacy";
const CAPA_TEMPLATE: &str = "capa";

/// Four documents: cluster, infrastructure cluster and both control plane halves
const LEGACY_BUNDLE: &str = "\
---
{{ cluster }}---
{{ aws_cluster }}---
{{ g8s_control_plane }}---
{{ aws_control_plane }}";

/// Generator-derived objects first, then the identity and the bastion pool
const CAPA_BUNDLE: &str = "\
---
{{ cluster }}---
{{ aws_cluster }}---
{{ kubeadm_control_plane }}---
{{ aws_machine_template }}---
{{ aws_cluster_role_identity }}---
{{ bastion_bootstrap_secret }}---
{{ bastion_machine_deployment }}---
{{ bastion_aws_machine_template }}";

/// Renders object fragments into a manifest bundle
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer with both bundle templates compiled
    ///
    /// # Panics
    ///
    /// Panics if a bundle template fails to compile. Both are compile-time
    /// constants, so this only happens if one of them is edited into an
    /// invalid state.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(LEGACY_TEMPLATE, LEGACY_BUNDLE)
            .expect("legacy bundle template is hardcoded and valid");
        env.add_template(CAPA_TEMPLATE, CAPA_BUNDLE)
            .expect("capa bundle template is hardcoded and valid");
        Self { env }
    }

    /// Render the bundle for `generation` from named fragments
    ///
    /// `file_name` identifies the output in error messages. Every field the
    /// template names must be present in `fragments`.
    pub fn render(
        &self,
        generation: SchemaGeneration,
        file_name: &str,
        fragments: &BTreeMap<String, String>,
    ) -> Result<String> {
        let name = match generation {
            SchemaGeneration::Legacy => LEGACY_TEMPLATE,
            SchemaGeneration::Modern => CAPA_TEMPLATE,
        };
        let template = self
            .env
            .get_template(name)
            .map_err(|e| Error::template(format!("{file_name}: {e}")))?;
        let rendered = template
            .render(fragments)
            .map_err(|e| Error::template(format!("{file_name}: {e}")))?;
        debug!(%generation, file_name, bytes = rendered.len(), "rendered manifest bundle");
        Ok(rendered)
    }
}
