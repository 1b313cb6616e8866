//! Common types for tessera: errors, CRDs and the organization read service

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod organization;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix of every organization namespace
pub const ORGANIZATION_NAMESPACE_PREFIX: &str = "org-";

/// Namespace holding an organization's clusters
pub fn organization_namespace(organization: &str) -> String {
    format!("{ORGANIZATION_NAMESPACE_PREFIX}{organization}")
}
