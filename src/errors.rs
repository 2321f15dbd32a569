//! Crate-wide error type.
//!
//! Module errors stay precise; [`Error`] aggregates them for callers that
//! drive several components (configuration, logging, resolution) at once.

use crate::ontology::{IdentifierError, QueryError, RegistryError, ServiceError, TermError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Term(#[from] TermError),

    #[error("cannot read config file `{path}`")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    YAML(#[from] serde_yaml::Error),

    #[error(transparent)]
    TOML(#[from] toml::de::Error),

    #[error(transparent)]
    Tera(#[from] tera::Error),

    #[error(transparent)]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Logger(#[from] tracing_subscriber::util::TryInitError),

    #[error(transparent)]
    LogFile(#[from] tracing_appender::rolling::InitError),
}

impl Error {
    pub fn string(s: &str) -> Self {
        Self::Message(s.to_string())
    }
}
