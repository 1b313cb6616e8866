//! Error types for tessera
//!
//! Errors are structured with fields so callers can tell a rejected request
//! apart from a broken generator or a defect in the bundled templates.
//! No error is ever accompanied by partial output.

use thiserror::Error;

/// Main error type for tessera operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A flag was set that the selected schema generation does not support
    #[error("{flag} setting is not available for release {release}")]
    UnsupportedFlag {
        /// Flag name as the caller knows it (e.g. "--external-snat")
        flag: String,
        /// Release identifier that selected the schema generation
        release: String,
    },

    /// An untyped base object could not be converted to its typed form
    #[error("failed to convert {kind} from its untyped representation: {source}")]
    Conversion {
        /// Kind of the object being converted
        kind: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// The external base-object-set generator failed
    #[error("base object generation failed: {message}")]
    Generation {
        /// Description of what failed, including the generator's own output
        message: String,
    },

    /// Required key material is absent
    #[error("missing credential: {name}")]
    MissingCredential {
        /// Name of the credential or the environment variable it is read from
        name: String,
    },

    /// Template rendering failed
    #[error("template error: {message}")]
    Template {
        /// Description of what failed
        message: String,
    },

    /// A named resource does not exist
    #[error("{resource} {name} not found")]
    NotFound {
        /// Resource type (e.g. "organization")
        resource: String,
        /// Name that was looked up
        name: String,
    },

    /// A listing returned nothing
    #[error("no {resource} resources found")]
    NoResources {
        /// Resource type (e.g. "organization")
        resource: String,
    },

    /// Invalid input
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// A composed object graph violated one of its invariants
    #[error("inconsistent object graph: {message}")]
    Graph {
        /// The violated invariant, naming the offending object
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create an unsupported flag error
    pub fn unsupported_flag(flag: impl Into<String>, release: impl Into<String>) -> Self {
        Self::UnsupportedFlag {
            flag: flag.into(),
            release: release.into(),
        }
    }

    /// Create a conversion error for the given kind
    pub fn conversion(kind: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Conversion {
            kind: kind.into(),
            source,
        }
    }

    /// Create a generation error with the given message
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation {
            message: msg.into(),
        }
    }

    /// Create a missing credential error
    pub fn missing_credential(name: impl Into<String>) -> Self {
        Self::MissingCredential { name: name.into() }
    }

    /// Create a template error with the given message
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template {
            message: msg.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Create a no resources error
    pub fn no_resources(resource: impl Into<String>) -> Self {
        Self::NoResources {
            resource: resource.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a graph invariant error with the given message
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only transport-level failures are worth another attempt; everything
    /// else needs a change to the request, the environment or the code.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Generation { .. } => true,
            Error::UnsupportedFlag { .. } => false,
            Error::Conversion { .. } => false,
            Error::MissingCredential { .. } => false,
            Error::Template { .. } => false,
            Error::NotFound { .. } => false,
            Error::NoResources { .. } => false,
            Error::Validation { .. } => false,
            Error::Graph { .. } => false,
            Error::Serialization { .. } => false,
        }
    }

    /// Get the resource kind if this error is associated with one
    pub fn kind(&self) -> Option<&str> {
        match self {
            Error::Conversion { kind, .. } => Some(kind),
            Error::Serialization { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }
}
