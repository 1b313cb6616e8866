//! Release policy
//!
//! A release identifier decides which schema generation describes a cluster
//! and, for the legacy generation, whether objects live in the organization
//! namespace.

use semver::Version;
use tessera_common::{Error, Result};

/// First major release built on the upstream CAPA schema
const FIRST_CAPA_MAJOR: u64 = 20;

/// First legacy release that places clusters in organization namespaces
const FIRST_ORG_NAMESPACE_RELEASE: Version = Version::new(16, 0, 0);

/// The two incompatible definitions of what resources make up a cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaGeneration {
    /// Provider-specific schema reconciled by the legacy operator
    Legacy,
    /// Upstream Cluster API schema with the CAPA infrastructure provider
    Modern,
}

impl SchemaGeneration {
    /// Select the generation for a release identifier
    pub fn for_release(release: &str) -> Result<Self> {
        let version = parse_release(release)?;
        if version.major >= FIRST_CAPA_MAJOR {
            Ok(Self::Modern)
        } else {
            Ok(Self::Legacy)
        }
    }

    /// Value of the watch-filter label for objects of this generation
    pub fn watch_filter(&self) -> &'static str {
        match self {
            Self::Legacy => "aws-operator",
            Self::Modern => "capi",
        }
    }
}

impl std::fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Modern => write!(f, "capa"),
        }
    }
}

/// Whether a release uses the organization-namespace (tenant) layout
pub fn uses_org_namespace(release: &str) -> Result<bool> {
    Ok(parse_release(release)? >= FIRST_ORG_NAMESPACE_RELEASE)
}

fn parse_release(release: &str) -> Result<Version> {
    let trimmed = release.trim().trim_start_matches('v');
    Version::parse(trimmed)
        .map_err(|e| Error::validation(format!("invalid release version {release:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modern_starts_at_major_twenty() {
        assert_eq!(
            SchemaGeneration::for_release("20.0.0").unwrap(),
            SchemaGeneration::Modern
        );
        assert_eq!(
            SchemaGeneration::for_release("v20.0.0-alpha1").unwrap(),
            SchemaGeneration::Modern
        );
        assert_eq!(
            SchemaGeneration::for_release("19.3.1").unwrap(),
            SchemaGeneration::Legacy
        );
    }

    #[test]
    fn org_namespace_layout_starts_at_sixteen() {
        assert!(!uses_org_namespace("15.2.1").unwrap());
        assert!(!uses_org_namespace("16.0.0-beta1").unwrap());
        assert!(uses_org_namespace("16.0.0").unwrap());
        assert!(uses_org_namespace("v17.1.0").unwrap());
    }

    #[test]
    fn rejects_non_semver_release() {
        let err = SchemaGeneration::for_release("latest").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("latest"));
    }

    #[test]
    fn watch_filter_differs_per_generation() {
        assert_eq!(SchemaGeneration::Modern.watch_filter(), "capi");
        assert_ne!(
            SchemaGeneration::Legacy.watch_filter(),
            SchemaGeneration::Modern.watch_filter()
        );
    }
}
