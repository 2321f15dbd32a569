use std::{
    collections::BTreeMap,
    sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::{
    namespaces::{split_iri, NamespaceTrie, NodeId, ROOT},
    value_objects::IdentifierError,
};

/// Prefix table loaded by [`CurieRegistry::with_defaults`].
const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("oboInOwl", "http://www.geneontology.org/formats/oboInOwl#"),
    ("obo", "http://purl.obolibrary.org/obo/"),
    ("BFO", "http://purl.obolibrary.org/obo/BFO_"),
    ("RO", "http://purl.obolibrary.org/obo/RO_"),
    ("IAO", "http://purl.obolibrary.org/obo/IAO_"),
    ("UBERON", "http://purl.obolibrary.org/obo/UBERON_"),
    ("CHEBI", "http://purl.obolibrary.org/obo/CHEBI_"),
    ("GO", "http://purl.obolibrary.org/obo/GO_"),
    ("CL", "http://purl.obolibrary.org/obo/CL_"),
    ("PATO", "http://purl.obolibrary.org/obo/PATO_"),
    ("NCBITaxon", "http://purl.obolibrary.org/obo/NCBITaxon_"),
    ("definition", "http://purl.obolibrary.org/obo/IAO_0000115"),
    ("replacedBy", "http://purl.obolibrary.org/obo/IAO_0100001"),
    ("ILX", "http://uri.interlex.org/base/ilx_"),
    ("ilxtr", "http://uri.interlex.org/tgbugs/uris/readable/"),
    ("TEMP", "http://uri.interlex.org/temp/uris/"),
];

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]*$").expect("static prefix pattern"))
}

/// Errors raised while populating a [`CurieRegistry`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The prefix is already bound to a different namespace.
    #[error("prefix `{prefix}` already maps to `{existing}`, refusing `{namespace}`")]
    DuplicatePrefix {
        prefix: String,
        existing: String,
        namespace: String,
    },
    /// The prefix contains characters that cannot appear before a curie colon,
    /// or the namespace is empty.
    #[error("cannot register prefix `{prefix}` for namespace `{namespace}`")]
    InvalidPrefix { prefix: String, namespace: String },
}

#[derive(Debug, Default)]
struct RegistryState {
    prefix_to_namespace: BTreeMap<String, String>,
    namespace_to_prefix: BTreeMap<String, String>,
    trie: NamespaceTrie,
}

impl RegistryState {
    /// Finds a registered namespace to start the trie descent from.
    ///
    /// The IRI is split at its qname boundary; when that namespace is not
    /// registered one trailing separator is peeled off and the remainder is
    /// split again, falling back to the root.
    fn start_node(&self, iri: &str) -> NodeId {
        let mut candidate = iri;
        while let Some((namespace, _)) = split_iri(candidate) {
            if let Some(node) = self.trie.get(namespace) {
                return node;
            }
            let mut chars = namespace.chars();
            chars.next_back();
            candidate = chars.as_str();
        }
        ROOT
    }

    fn longest_namespace(&self, iri: &str) -> Option<&str> {
        let start = self.start_node(iri);
        let node = self
            .trie
            .longest_match(start, iri)
            .or((start != ROOT).then_some(start))?;
        Some(self.trie.key(node))
    }
}

/// Bidirectional prefix/namespace table with longest-match IRI shortening.
///
/// The registry is append-only: prefixes can be added but never removed or
/// rebound. Reads take a shared lock so lookups after registration always
/// observe the new binding.
#[derive(Debug, Default)]
pub struct CurieRegistry {
    state: RwLock<RegistryState>,
}

impl CurieRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an independent, empty registry.
    ///
    /// Nothing registered on `self` is visible through the new instance.
    #[must_use]
    pub fn new_registry(&self) -> Self {
        Self::new()
    }

    /// Creates a registry populated with [`default_prefixes`].
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        {
            let mut state = registry.write();
            for (prefix, namespace) in DEFAULT_PREFIXES {
                Self::bind(&mut state, prefix, namespace);
            }
        }
        registry
    }

    /// Builds a registry from a `prefix -> namespace` table.
    pub fn from_prefixes<I, P, N>(prefixes: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (P, N)>,
        P: AsRef<str>,
        N: AsRef<str>,
    {
        let registry = Self::new();
        registry.populate(prefixes)?;
        Ok(registry)
    }

    /// Returns the process-wide registry, populated with the defaults on first
    /// use. Components should prefer an explicitly owned registry.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<CurieRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_defaults)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind(state: &mut RegistryState, prefix: &str, namespace: &str) {
        state
            .prefix_to_namespace
            .insert(prefix.to_owned(), namespace.to_owned());
        state
            .namespace_to_prefix
            .entry(namespace.to_owned())
            .or_insert_with(|| prefix.to_owned());
        state.trie.insert(namespace);
    }

    /// Registers a single prefix.
    ///
    /// Re-registering an identical pair is a no-op. The first prefix bound to
    /// a namespace is the one [`Self::qname`] emits; later ones are aliases
    /// that still expand.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePrefix`] when the prefix is bound to
    /// another namespace, [`RegistryError::InvalidPrefix`] for malformed input.
    pub fn register(&self, prefix: &str, namespace: &str) -> Result<(), RegistryError> {
        if namespace.is_empty() || !prefix_pattern().is_match(prefix) {
            return Err(RegistryError::InvalidPrefix {
                prefix: prefix.to_owned(),
                namespace: namespace.to_owned(),
            });
        }

        let mut state = self.write();
        match state.prefix_to_namespace.get(prefix) {
            Some(existing) if existing == namespace => Ok(()),
            Some(existing) => Err(RegistryError::DuplicatePrefix {
                prefix: prefix.to_owned(),
                existing: existing.clone(),
                namespace: namespace.to_owned(),
            }),
            None => {
                debug!(prefix, namespace, "curie_prefix_registered");
                Self::bind(&mut state, prefix, namespace);
                Ok(())
            }
        }
    }

    /// Registers every pair of a bulk `prefix -> namespace` table, stopping at
    /// the first conflict.
    ///
    /// # Errors
    ///
    /// See [`Self::register`].
    pub fn populate<I, P, N>(&self, prefixes: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = (P, N)>,
        P: AsRef<str>,
        N: AsRef<str>,
    {
        for (prefix, namespace) in prefixes {
            self.register(prefix.as_ref(), namespace.as_ref())?;
        }
        Ok(())
    }

    /// Returns the namespace bound to `prefix`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<String> {
        self.read().prefix_to_namespace.get(prefix).cloned()
    }

    /// Returns the canonical prefix of a registered namespace.
    #[must_use]
    pub fn prefix(&self, namespace: &str) -> Option<String> {
        self.read().namespace_to_prefix.get(namespace).cloned()
    }

    #[must_use]
    pub fn knows_prefix(&self, prefix: &str) -> bool {
        self.read().prefix_to_namespace.contains_key(prefix)
    }

    /// Returns a copy of the `prefix -> namespace` table.
    #[must_use]
    pub fn prefixes(&self) -> BTreeMap<String, String> {
        self.read().prefix_to_namespace.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().prefix_to_namespace.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().prefix_to_namespace.is_empty()
    }

    /// Expands a `prefix:suffix` curie into an IRI.
    ///
    /// # Errors
    ///
    /// [`IdentifierError::BadCurie`] without a colon,
    /// [`IdentifierError::UnknownPrefix`] for unregistered prefixes.
    pub fn expand(&self, curie: &str) -> Result<String, IdentifierError> {
        let Some((prefix, suffix)) = curie.split_once(':') else {
            return Err(IdentifierError::BadCurie {
                value: curie.to_owned(),
            });
        };
        self.namespace(prefix)
            .map(|namespace| format!("{namespace}{suffix}"))
            .ok_or_else(|| IdentifierError::UnknownPrefix {
                prefix: prefix.to_owned(),
                value: curie.to_owned(),
            })
    }

    /// Shortens an IRI into `prefix:suffix` using the longest registered
    /// namespace that prefixes it.
    ///
    /// This never fails: an IRI with no registered namespace is returned
    /// unchanged.
    #[must_use]
    pub fn qname(&self, iri: &str) -> String {
        self.split(iri)
            .map_or_else(|| iri.to_owned(), |(prefix, suffix)| format!("{prefix}:{suffix}"))
    }

    /// Same lookup as [`Self::qname`], returning the `(prefix, suffix)` pair.
    #[must_use]
    pub fn split(&self, iri: &str) -> Option<(String, String)> {
        let state = self.read();
        let namespace = state.longest_namespace(iri)?;
        let prefix = state.namespace_to_prefix.get(namespace)?;
        Some((prefix.clone(), iri[namespace.len()..].to_owned()))
    }

    /// Returns every prefix whose namespace is an ancestor of, or equal to,
    /// the namespace implied by `value`, shortest namespace first.
    ///
    /// `value` may be a bare prefix, a curie or an IRI.
    #[must_use]
    pub fn identifier_prefixes(&self, value: &str) -> Vec<String> {
        let state = self.read();
        let target = match state.prefix_to_namespace.get(value) {
            Some(namespace) => namespace.clone(),
            None => match value.split_once(':') {
                Some((prefix, suffix)) if !suffix.starts_with("//") => state
                    .prefix_to_namespace
                    .get(prefix)
                    .map_or_else(|| value.to_owned(), |ns| format!("{ns}{suffix}")),
                _ => value.to_owned(),
            },
        };

        let mut prefixes = Vec::new();
        for node in state.trie.ancestors(&target) {
            let namespace = state.trie.key(node);
            for (prefix, candidate) in &state.prefix_to_namespace {
                if candidate == namespace {
                    prefixes.push(prefix.clone());
                }
            }
        }
        prefixes
    }

    /// Linear scan over namespaces sorted longest first; the reference the
    /// trie lookup is checked against.
    #[cfg(test)]
    pub(crate) fn qname_sorted(&self, iri: &str) -> String {
        let state = self.read();
        let mut pairs: Vec<(&String, &String)> = state.namespace_to_prefix.iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        pairs
            .into_iter()
            .find(|(namespace, _)| iri.starts_with(namespace.as_str()))
            .map_or_else(
                || iri.to_owned(),
                |(namespace, prefix)| format!("{prefix}:{}", &iri[namespace.len()..]),
            )
    }
}

/// Returns the built-in prefix table as owned pairs.
#[must_use]
pub fn default_prefixes() -> BTreeMap<String, String> {
    DEFAULT_PREFIXES
        .iter()
        .map(|(prefix, namespace)| ((*prefix).to_owned(), (*namespace).to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn registry() -> CurieRegistry {
        CurieRegistry::from_prefixes([
            ("x", "http://x.org/"),
            ("xsub", "http://x.org/sub_"),
            ("UBERON", "http://purl.obolibrary.org/obo/UBERON_"),
            ("owl", "http://www.w3.org/2002/07/owl#"),
        ])
        .expect("registry")
    }

    #[rstest]
    #[case("http://x.org/sub_1", "xsub:1")]
    #[case("http://x.org/sub", "x:sub")]
    #[case("http://x.org/other/thing", "x:other/thing")]
    #[case("http://x.org/", "x:")]
    #[case("http://purl.obolibrary.org/obo/UBERON_0000955", "UBERON:0000955")]
    #[case("http://www.w3.org/2002/07/owl#Class", "owl:Class")]
    #[case("http://unknown.org/term", "http://unknown.org/term")]
    #[case("UBERON:0000955", "UBERON:0000955")]
    #[case("", "")]
    fn qname_picks_longest_namespace(#[case] iri: &str, #[case] expected: &str) {
        assert_eq!(registry().qname(iri), expected);
    }

    #[test]
    fn re_registering_same_pair_is_noop() {
        let registry = registry();
        registry
            .register("x", "http://x.org/")
            .expect("identical pair");
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn conflicting_prefix_is_rejected() {
        let err = registry()
            .register("x", "http://elsewhere.org/")
            .expect_err("conflict");
        assert_eq!(
            err,
            RegistryError::DuplicatePrefix {
                prefix: "x".into(),
                existing: "http://x.org/".into(),
                namespace: "http://elsewhere.org/".into(),
            }
        );
    }

    #[rstest]
    #[case("bad prefix", "http://x.org/")]
    #[case("a:b", "http://x.org/")]
    #[case("ok", "")]
    fn malformed_registrations_are_rejected(#[case] prefix: &str, #[case] namespace: &str) {
        assert!(matches!(
            CurieRegistry::new().register(prefix, namespace),
            Err(RegistryError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn first_prefix_for_namespace_stays_canonical() {
        let registry = CurieRegistry::from_prefixes([
            ("first", "http://x.org/"),
            ("alias", "http://x.org/"),
        ])
        .expect("registry");
        assert_eq!(registry.qname("http://x.org/1"), "first:1");
        assert_eq!(registry.expand("alias:1").expect("alias"), "http://x.org/1");
    }

    #[test]
    fn expand_reports_missing_colon_and_unknown_prefix() {
        let registry = registry();
        assert!(matches!(
            registry.expand("nocolon"),
            Err(IdentifierError::BadCurie { .. })
        ));
        assert!(matches!(
            registry.expand("NOPE:1"),
            Err(IdentifierError::UnknownPrefix { prefix, .. }) if prefix == "NOPE"
        ));
    }

    #[rstest]
    #[case("xsub:1", vec!["x", "xsub"])]
    #[case("xsub", vec!["x", "xsub"])]
    #[case("http://x.org/other", vec!["x"])]
    #[case("UBERON", vec!["UBERON"])]
    #[case("http://nowhere.org/", vec![])]
    fn identifier_prefixes_walk_the_trie(#[case] value: &str, #[case] expected: Vec<&str>) {
        assert_eq!(registry().identifier_prefixes(value), expected);
    }

    #[test]
    fn new_registry_is_independent() {
        let registry = registry();
        let fresh = registry.new_registry();
        assert!(fresh.is_empty());
        fresh
            .register("x", "http://other.org/")
            .expect("no conflict across registries");
        assert_eq!(registry.namespace("x").as_deref(), Some("http://x.org/"));
    }

    #[test]
    fn defaults_resolve_nested_obo_namespaces() {
        let registry = CurieRegistry::with_defaults();
        assert_eq!(
            registry.qname("http://purl.obolibrary.org/obo/IAO_0100001"),
            "replacedBy:"
        );
        assert_eq!(
            registry.qname("http://purl.obolibrary.org/obo/IAO_0000115"),
            "definition:"
        );
        assert_eq!(
            registry.qname("http://purl.obolibrary.org/obo/IAO_0000116"),
            "IAO:0000116"
        );
        assert_eq!(
            registry.qname("http://purl.obolibrary.org/obo/FOO_1"),
            "obo:FOO_1"
        );
    }

    fn suffix() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[0-9]{1,8}",
            "[A-Za-z_]{1,6}[-./#_%()]{0,2}[A-Za-z0-9]{0,4}",
            "[\\u{00C0}-\\u{024F}\\u{0391}-\\u{03C9}]{1,5}",
            "[/#:?=&]{1,3}[a-z]{0,3}",
        ]
    }

    proptest! {
        #[test]
        fn qname_round_trips_registered_namespaces(
            (prefix, namespace) in prop::sample::select(vec![
                ("UBERON", "http://purl.obolibrary.org/obo/UBERON_"),
                ("owl", "http://www.w3.org/2002/07/owl#"),
                ("ilxtr", "http://uri.interlex.org/tgbugs/uris/readable/"),
            ]),
            suffix in suffix(),
        ) {
            let registry = CurieRegistry::from_prefixes([
                ("UBERON", "http://purl.obolibrary.org/obo/UBERON_"),
                ("owl", "http://www.w3.org/2002/07/owl#"),
                ("ilxtr", "http://uri.interlex.org/tgbugs/uris/readable/"),
            ]).expect("registry");
            let iri = format!("{namespace}{suffix}");
            prop_assert_eq!(registry.qname(&iri), format!("{prefix}:{suffix}"));
        }

        #[test]
        fn longer_namespace_always_wins(suffix in suffix()) {
            let registry = registry();
            let iri = format!("http://x.org/sub_{suffix}");
            prop_assert_eq!(registry.qname(&iri), format!("xsub:{suffix}"));
        }

        #[test]
        fn trie_agrees_with_sorted_scan(
            tail in "[a-z_/#]{0,12}",
            head in prop::sample::select(vec![
                "http://x.org/",
                "http://purl.obolibrary.org/obo/",
                "http://www.w3.org/2002/07/",
                "urn:",
            ]),
        ) {
            let registry = CurieRegistry::with_defaults();
            registry.populate([("x", "http://x.org/"), ("xsub", "http://x.org/sub_")])
                .expect("extra prefixes");
            let iri = format!("{head}{tail}");
            prop_assert_eq!(registry.qname(&iri), registry.qname_sorted(&iri));
        }

        #[test]
        fn unmatched_values_pass_through(value in "[a-z]{1,6}:[0-9]{1,6}") {
            prop_assert_eq!(registry().qname(&value), value);
        }
    }
}
