//! Template command - render manifests without applying them

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use tracing::info;

use tessera_capi::{
    generate_id, ChainedKeySource, ClusterRequest, ClusterctlGenerator, Composer, EnvKeySource,
    StaticKeySource,
};

use crate::config::{load_config, TesseraConfig};
use crate::Result;

/// Template name used when the bundle goes to stdout
const STDOUT_FILE_NAME: &str = "stdout";

/// Render manifests for new resources
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(subcommand)]
    pub resource: TemplateResource,
}

/// Resource to template
#[derive(Subcommand, Debug)]
pub enum TemplateResource {
    /// Render the manifest bundle for a workload cluster
    Cluster(ClusterArgs),
}

/// Infrastructure provider
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Provider {
    /// Amazon Web Services
    #[default]
    Aws,
}

/// Flags for `tessera template cluster`
#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Infrastructure provider
    #[arg(long, value_enum, default_value = "aws")]
    pub provider: Provider,

    /// Cluster name (default: a generated 5-character ID)
    #[arg(long)]
    pub name: Option<String>,

    /// Organization owning the cluster
    #[arg(long)]
    pub organization: String,

    /// Release version; selects the manifest schema
    #[arg(long)]
    pub release: String,

    /// Availability zone for a control plane node (repeatable)
    #[arg(long = "control-plane-az")]
    pub control_plane_azs: Vec<String>,

    /// Pod CIDR (legacy releases only)
    #[arg(long)]
    pub pods_cidr: Option<String>,

    /// Route pod traffic through an external SNAT (legacy releases only)
    #[arg(long)]
    pub external_snat: bool,

    /// Control plane subnet size
    #[arg(long)]
    pub control_plane_subnet: Option<String>,

    /// Label for the cluster as key=value (repeatable)
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// Cluster description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Write the bundle to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl ClusterArgs {
    /// Turn the flags into a composition request
    pub fn into_request(self) -> ClusterRequest {
        let file_name = self
            .output
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| STDOUT_FILE_NAME.to_string());

        ClusterRequest {
            name: self.name.filter(|n| !n.is_empty()).unwrap_or_else(generate_id),
            owner: self.organization,
            release_version: self.release,
            control_plane_azs: self.control_plane_azs,
            pods_cidr: self.pods_cidr,
            external_snat: self.external_snat,
            control_plane_subnet: self.control_plane_subnet,
            labels: self.labels.into_iter().collect(),
            description: self.description,
            file_name,
        }
    }
}

/// Parse a `key=value` label flag
pub fn parse_label(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid label {s:?}, expected key=value")),
    }
}

/// Run the template command
pub async fn run(args: TemplateArgs) -> Result<()> {
    let config = load_config()?;
    match args.resource {
        TemplateResource::Cluster(cluster) => template_cluster(cluster, &config),
    }
}

fn composer(provider: Provider, config: &TesseraConfig) -> Composer {
    match provider {
        Provider::Aws => {
            let generator = config
                .clusterctl_path
                .as_deref()
                .map(ClusterctlGenerator::new)
                .unwrap_or_default();
            let keys = ChainedKeySource::new(vec![
                Box::new(EnvKeySource),
                Box::new(StaticKeySource::new(config.ssh_sso_public_key.clone())),
            ]);
            Composer::aws(Box::new(generator), Box::new(keys))
        }
    }
}

/// Compose the cluster bundle and write it out
///
/// Nothing is written unless the whole bundle composed.
pub fn template_cluster(args: ClusterArgs, config: &TesseraConfig) -> Result<()> {
    let provider = args.provider;
    let output = args.output.clone();
    let request = args.into_request();

    let bundle = composer(provider, config).compose(&request)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &bundle)?;
            info!(cluster = %request.name, path = %path.display(), "wrote cluster manifests");
        }
        None => print!("{bundle}"),
    }
    Ok(())
}
