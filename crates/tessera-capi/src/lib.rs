//! Cluster API manifest composition for AWS
//!
//! This crate provides:
//! - Object model for the legacy and CAPA schema generations
//! - Builders for both generations behind a single [`Composer`]
//! - Namespace relocation, metadata propagation and bundle rendering
//! - The `clusterctl` base object generator and environment guard

pub mod bootstrap;
pub mod constants;
pub mod env;
pub mod generator;
pub mod keys;
pub mod metadata;
pub mod model;
pub mod provider;
pub mod relocate;
pub mod release;
pub mod render;
pub mod request;

pub use generator::{parse_objects, ClusterctlGenerator, GenerateOptions, TemplateGenerator};
pub use keys::{ChainedKeySource, EnvKeySource, KeySource, StaticKeySource};
pub use model::{ObjectGraph, ObjectKind, ResourceObject};
pub use provider::{CapaBuilder, Composer, GraphBuilder, LegacyBuilder};
pub use relocate::relocate;
pub use release::SchemaGeneration;
pub use render::TemplateRenderer;
pub use request::{generate_id, ClusterRequest};

#[cfg(test)]
pub use generator::MockTemplateGenerator;
