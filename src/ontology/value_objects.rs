use std::{
    borrow::Borrow,
    cmp::Ordering,
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use oxrdf::NamedNode;
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::{
    curies::CurieRegistry,
    display::{self, DisplayStyle},
};

/// The ways a caller may point at an identifier.
///
/// Any combination may be supplied as long as every populated form resolves
/// to the same IRI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdSpec {
    pub curie_or_iri: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub curie: Option<String>,
    pub iri: Option<String>,
}

impl IdSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a spec holding only a bare curie-or-IRI string.
    #[must_use]
    pub fn parse(value: impl Into<String>) -> Self {
        Self::new().curie_or_iri(value)
    }

    #[must_use]
    pub fn curie_or_iri(mut self, value: impl Into<String>) -> Self {
        self.curie_or_iri = Some(value.into());
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    #[must_use]
    pub fn curie(mut self, curie: impl Into<String>) -> Self {
        self.curie = Some(curie.into());
        self
    }

    #[must_use]
    pub fn iri(mut self, iri: impl Into<String>) -> Self {
        self.iri = Some(iri.into());
        self
    }

    /// True when no identifier form is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curie_or_iri.is_none()
            && self.prefix.is_none()
            && self.suffix.is_none()
            && self.curie.is_none()
            && self.iri.is_none()
    }
}

/// Errors produced while normalizing identifier input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// None of the identifier forms were populated.
    #[error("no identifier provided")]
    NoIdentifier,
    /// The populated forms resolve to different IRIs.
    #[error("all ways of constructing the iri disagree: {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },
    /// A curie without a `prefix:suffix` colon.
    #[error("`{value}` is not a curie")]
    BadCurie { value: String },
    /// The curie prefix is not registered.
    #[error("unknown prefix `{prefix}` in `{value}`")]
    UnknownPrefix { prefix: String, value: String },
    /// The explicit IRI failed to parse.
    #[error("invalid IRI: {value}")]
    InvalidIri { value: String },
    /// A registered curie was passed where an IRI was expected.
    #[error("`{value}` is a curie, not an iri")]
    CurieAsIri { value: String },
    /// Only one half of a prefix/suffix pair was provided.
    #[error("prefix and suffix must be given together (prefix: {prefix:?}, suffix: {suffix:?})")]
    IncompletePair {
        prefix: Option<String>,
        suffix: Option<String>,
    },
}

/// Canonical identifier backed by a single IRI.
///
/// Equality, ordering and hashing use the IRI alone, so an identifier can be
/// looked up in maps keyed by IRI strings. The prefix and suffix are sidecar
/// data derived from the registry that normalized it.
#[derive(Clone, Debug)]
pub struct Identifier {
    iri: String,
    prefix: Option<String>,
    suffix: Option<String>,
}

impl Identifier {
    /// Normalizes `spec` against `registry`.
    ///
    /// Every populated form is turned into a candidate IRI and all candidates
    /// must agree. The IRI is then re-split with [`CurieRegistry::split`] so
    /// the prefix is always the longest registered namespace, even when the
    /// caller supplied a curie with a shorter one.
    pub fn new(registry: &CurieRegistry, spec: &IdSpec) -> Result<Self, IdentifierError> {
        let mut candidates = BTreeSet::new();

        match (&spec.prefix, &spec.suffix) {
            (Some(prefix), Some(suffix)) => {
                candidates.insert(registry.expand(&format!("{prefix}:{suffix}"))?);
            }
            (None, None) => {}
            (prefix, suffix) => {
                return Err(IdentifierError::IncompletePair {
                    prefix: prefix.clone(),
                    suffix: suffix.clone(),
                })
            }
        }
        if let Some(value) = &spec.curie_or_iri {
            candidates.insert(Self::parse_curie_or_iri(registry, value)?);
        }
        if let Some(curie) = &spec.curie {
            candidates.insert(registry.expand(curie)?);
        }
        if let Some(iri) = &spec.iri {
            Self::validate_iri(iri)?;
            candidates.insert(iri.clone());
        }

        let mut candidates = candidates.into_iter();
        let iri = match (candidates.next(), candidates.next()) {
            (None, _) => return Err(IdentifierError::NoIdentifier),
            (Some(iri), None) => iri,
            (Some(first), Some(second)) => {
                let mut all = vec![first, second];
                all.extend(candidates);
                return Err(IdentifierError::Ambiguous { candidates: all });
            }
        };

        let split = registry.split(&iri);
        if split.is_none() {
            if let Some((prefix, rest)) = iri.split_once(':') {
                if registry.knows_prefix(prefix) && !rest.starts_with("//") {
                    return Err(IdentifierError::CurieAsIri { value: iri });
                }
            }
        }
        let (prefix, suffix) = split.map_or((None, None), |(p, s)| (Some(p), Some(s)));
        Ok(Self {
            iri,
            prefix,
            suffix,
        })
    }

    /// Normalizes a bare curie-or-IRI string.
    pub fn parse(registry: &CurieRegistry, value: &str) -> Result<Self, IdentifierError> {
        Self::new(registry, &IdSpec::parse(value))
    }

    /// Normalizes an explicit IRI.
    pub fn from_iri(registry: &CurieRegistry, iri: &str) -> Result<Self, IdentifierError> {
        Self::new(registry, &IdSpec::new().iri(iri))
    }

    /// Normalizes an explicit curie.
    pub fn from_curie(registry: &CurieRegistry, curie: &str) -> Result<Self, IdentifierError> {
        Self::new(registry, &IdSpec::new().curie(curie))
    }

    fn validate_iri(value: &str) -> Result<(), IdentifierError> {
        NamedNode::new(value)
            .map(|_| ())
            .map_err(|_| IdentifierError::InvalidIri {
                value: value.to_owned(),
            })
    }

    fn parse_curie_or_iri(registry: &CurieRegistry, value: &str) -> Result<String, IdentifierError> {
        let Some((prefix, rest)) = value.split_once(':') else {
            return Err(IdentifierError::BadCurie {
                value: value.to_owned(),
            });
        };
        if rest.starts_with("//") {
            Self::validate_iri(value)?;
            return Ok(value.to_owned());
        }
        registry.expand(value).map_err(|err| match err {
            IdentifierError::UnknownPrefix { .. } => IdentifierError::UnknownPrefix {
                prefix: prefix.to_owned(),
                value: value.to_owned(),
            },
            other => other,
        })
    }

    /// Returns the canonical IRI.
    #[must_use]
    pub fn iri(&self) -> &str {
        &self.iri
    }

    /// Returns the IRI, the value an identifier stands in for as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.iri
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Returns `prefix:suffix` when the IRI falls under a registered namespace.
    #[must_use]
    pub fn curie(&self) -> Option<String> {
        match (&self.prefix, &self.suffix) {
            (Some(prefix), Some(suffix)) => Some(format!("{prefix}:{suffix}")),
            _ => None,
        }
    }

    /// Returns the curie when available, otherwise the IRI.
    #[must_use]
    pub fn curie_or_iri(&self) -> String {
        self.curie().unwrap_or_else(|| self.iri.clone())
    }

    pub(crate) fn render(&self, f: &mut Formatter<'_>, style: DisplayStyle) -> fmt::Result {
        match style {
            DisplayStyle::Iri => f.write_str(&self.iri),
            DisplayStyle::Curie | DisplayStyle::CurieLabel | DisplayStyle::Full => {
                match (&self.prefix, &self.suffix) {
                    (Some(prefix), Some(suffix)) => write!(f, "{prefix}:{suffix}"),
                    _ => f.write_str(&self.iri),
                }
            }
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.iri == other.iri
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iri.cmp(&other.iri)
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.iri.hash(state);
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.iri
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.iri
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.iri == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.iri == *other
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.iri
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.render(f, display::take())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.iri)
    }
}
