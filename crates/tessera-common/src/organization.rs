//! Organization read service
//!
//! A read-through wrapper over the management cluster's Organization
//! resources: either every organization, or one by name.

use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::crd::Organization;
use crate::{Error, Result};

const RESOURCE: &str = "organization";

/// Source of Organization resources
///
/// Abstracts the Kubernetes API so the service can be tested without a cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// List every organization in the store
    async fn list(&self) -> Result<Vec<Organization>>;
}

/// Store backed by the Kubernetes API
pub struct KubeOrganizationStore {
    client: Client,
}

impl KubeOrganizationStore {
    /// Create a store using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrganizationStore for KubeOrganizationStore {
    async fn list(&self) -> Result<Vec<Organization>> {
        let api: Api<Organization> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// Options for [`OrganizationService::get`]
#[derive(Clone, Debug, Default)]
pub struct GetOptions {
    /// Restrict the lookup to a single organization
    pub name: Option<String>,
}

impl GetOptions {
    /// Look up a single organization by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Result of an organization lookup
#[derive(Clone, Debug, PartialEq)]
pub enum OrganizationResource {
    /// A single organization, returned for a named lookup
    Single(Organization),
    /// Every organization, returned when no name was given
    Collection(Vec<Organization>),
}

impl OrganizationResource {
    /// Organizations contained in this result
    pub fn items(&self) -> &[Organization] {
        match self {
            Self::Single(org) => std::slice::from_ref(org),
            Self::Collection(orgs) => orgs,
        }
    }
}

/// Service answering organization lookups
pub struct OrganizationService<S: OrganizationStore + ?Sized> {
    store: Box<S>,
}

impl<S: OrganizationStore + ?Sized> OrganizationService<S> {
    /// Create a service over the given store
    pub fn new(store: Box<S>) -> Self {
        Self { store }
    }

    /// Get one organization by name, or all of them
    ///
    /// Fails with `NotFound` when a name matches nothing and `NoResources`
    /// when no name is given and the store is empty.
    pub async fn get(&self, options: &GetOptions) -> Result<OrganizationResource> {
        let organizations = self.store.list().await?;
        debug!(count = organizations.len(), "listed organizations");

        match options.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => organizations
                .into_iter()
                .find(|org| org.name_any() == name)
                .map(OrganizationResource::Single)
                .ok_or_else(|| Error::not_found(RESOURCE, name)),
            None if organizations.is_empty() => Err(Error::no_resources(RESOURCE)),
            None => Ok(OrganizationResource::Collection(organizations)),
        }
    }
}
