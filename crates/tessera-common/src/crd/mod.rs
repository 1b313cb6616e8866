//! Custom Resource Definitions read by tessera

mod organization;

pub use organization::{Organization, OrganizationSpec, OrganizationStatus};
