//! Schema generation dispatch
//!
//! Each schema generation implements [`GraphBuilder`]. The [`Composer`]
//! picks one per request from its release, rejects flags the chosen
//! generation cannot honor, and renders the validated graph.
//!
//! # Example
//!
//! ```text
//! let composer = Composer::aws(Box::new(ClusterctlGenerator::default()), Box::new(EnvKeySource));
//! let bundle = composer.compose(&request)?;
//! ```

mod bastion;
mod capa;
mod legacy;

pub use bastion::{BastionParams, BastionPool};
pub use capa::CapaBuilder;
pub use legacy::LegacyBuilder;

#[cfg(test)]
use mockall::automock;
use tracing::info;

use tessera_common::{Error, Result};

use crate::generator::TemplateGenerator;
use crate::keys::KeySource;
use crate::model::ObjectGraph;
use crate::release::SchemaGeneration;
use crate::render::TemplateRenderer;
use crate::request::ClusterRequest;

/// Builds the object graph for one schema generation
#[cfg_attr(test, automock)]
pub trait GraphBuilder: Send + Sync {
    /// Generation this builder produces
    fn generation(&self) -> SchemaGeneration;

    /// Build every object for `request`
    fn build_graph(&self, request: &ClusterRequest) -> Result<ObjectGraph>;
}

/// Single entry point composing manifest bundles for either generation
pub struct Composer {
    legacy: Box<dyn GraphBuilder>,
    modern: Box<dyn GraphBuilder>,
    renderer: TemplateRenderer,
}

impl Composer {
    pub fn new(legacy: Box<dyn GraphBuilder>, modern: Box<dyn GraphBuilder>) -> Self {
        Self {
            legacy,
            modern,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Composer for AWS with the standard builders
    pub fn aws(generator: Box<dyn TemplateGenerator>, keys: Box<dyn KeySource>) -> Self {
        Self::new(
            Box::new(LegacyBuilder::new()),
            Box::new(CapaBuilder::new(generator, keys)),
        )
    }

    /// Pick the builder for `request`
    ///
    /// Flags only the legacy generation understands are rejected when the
    /// release selects the modern one.
    pub fn select(&self, request: &ClusterRequest) -> Result<&dyn GraphBuilder> {
        match SchemaGeneration::for_release(&request.release_version)? {
            SchemaGeneration::Legacy => Ok(self.legacy.as_ref()),
            SchemaGeneration::Modern => {
                if request.external_snat {
                    return Err(Error::unsupported_flag(
                        "--external-snat",
                        &request.release_version,
                    ));
                }
                if request.pods_cidr.as_deref().is_some_and(|c| !c.is_empty()) {
                    return Err(Error::unsupported_flag("--pods-cidr", &request.release_version));
                }
                Ok(self.modern.as_ref())
            }
        }
    }

    /// Build and validate the object graph for `request`
    pub fn build(&self, request: &ClusterRequest) -> Result<ObjectGraph> {
        let builder = self.select(request)?;
        info!(
            cluster = %request.name,
            release = %request.release_version,
            generation = %builder.generation(),
            "composing cluster manifests"
        );
        let graph = builder.build_graph(request)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Compose the complete manifest bundle for `request`
    ///
    /// Either the whole bundle is returned or an error; never a partial one.
    pub fn compose(&self, request: &ClusterRequest) -> Result<String> {
        let graph = self.build(request)?;
        let fragments = graph.to_fragments()?;
        self.renderer
            .render(graph.generation(), &request.file_name, &fragments)
    }
}
