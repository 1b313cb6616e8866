//! Get command - read resources from the management cluster

use std::path::Path;

use clap::{Args, Subcommand, ValueEnum};
use kube::ResourceExt;

use tessera_common::crd::Organization;
use tessera_common::organization::{
    GetOptions, KubeOrganizationStore, OrganizationResource, OrganizationService,
};

use super::{format_table, kube_client};
use crate::Result;

/// Get tessera resources
#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(subcommand)]
    pub resource: GetResource,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Path to kubeconfig file (default: $KUBECONFIG or ~/.kube/config)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,
}

/// Resource to get
#[derive(Subcommand, Debug)]
pub enum GetResource {
    /// List organizations, or show a single one
    #[command(alias = "organization", alias = "orgs")]
    Organizations {
        /// Organization name (default: all organizations)
        name: Option<String>,
    },
}

/// Output format
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Columnar table (default)
    #[default]
    Table,
    /// YAML
    Yaml,
}

/// Run the get command
pub async fn run(args: GetArgs) -> Result<()> {
    match args.resource {
        GetResource::Organizations { name } => {
            let client = kube_client(args.kubeconfig.as_deref().map(Path::new)).await?;
            let service = OrganizationService::new(Box::new(KubeOrganizationStore::new(client)));
            let options = GetOptions { name };
            let resource = service.get(&options).await?;
            print!("{}", format_organizations(&resource, args.output)?);
            Ok(())
        }
    }
}

fn organization_namespace(org: &Organization) -> String {
    org.status
        .as_ref()
        .and_then(|s| s.namespace.clone())
        .unwrap_or_else(|| "<none>".to_string())
}

/// Render an organization lookup in the requested format
pub fn format_organizations(resource: &OrganizationResource, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = resource
                .items()
                .iter()
                .map(|org| vec![org.name_any(), organization_namespace(org)])
                .collect();
            Ok(format_table(&["NAME", "NAMESPACE"], &rows))
        }
        OutputFormat::Yaml => match resource {
            OrganizationResource::Single(org) => Ok(serde_yaml::to_string(org)?),
            OrganizationResource::Collection(orgs) => Ok(serde_yaml::to_string(orgs)?),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::crd::{OrganizationSpec, OrganizationStatus};

    fn org(name: &str, namespace: Option<&str>) -> Organization {
        let mut org = Organization::new(name, OrganizationSpec::default());
        org.status = namespace.map(|ns| OrganizationStatus {
            namespace: Some(ns.to_string()),
        });
        org
    }

    #[test]
    fn table_lists_name_and_namespace() {
        let resource = OrganizationResource::Collection(vec![
            org("acme", Some("org-acme")),
            org("pending", None),
        ]);
        let out = format_organizations(&resource, OutputFormat::Table).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "NAME     NAMESPACE");
        assert_eq!(lines[1], "acme     org-acme");
        assert_eq!(lines[2], "pending  <none>");
    }

    #[test]
    fn single_organization_renders_as_one_yaml_object() {
        let resource = OrganizationResource::Single(org("acme", Some("org-acme")));
        let out = format_organizations(&resource, OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(value["kind"], "Organization");
        assert_eq!(value["metadata"]["name"], "acme");
        assert_eq!(value["status"]["namespace"], "org-acme");
    }

    #[test]
    fn collection_renders_as_yaml_sequence() {
        let resource = OrganizationResource::Collection(vec![
            org("acme", None),
            org("initech", None),
        ]);
        let out = format_organizations(&resource, OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(value.as_sequence().map(Vec::len), Some(2));
    }
}
