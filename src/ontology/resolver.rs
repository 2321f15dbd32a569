//! Term resolution: turning identifiers and free-text lookups into validated
//! [`Term`]s through a [`QueryDispatcher`].
//!
//! Caller-supplied metadata is never trusted on its own. A term is only
//! marked validated once a backend record confirms it, and every asserted
//! field that the record also carries must agree with it.

use std::{collections::BTreeMap, ops::Deref, sync::Arc};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::{
    curies::CurieRegistry,
    entities::{PredicateValue, QueryResult, RecordValue, ResolvedFields, Term, TermFields},
    repositories::{Direction, Query},
    service::{QueryDispatcher, QueryError},
    value_objects::{IdSpec, Identifier, IdentifierError},
};

/// Predicate pointing at the preferred identifier of a term.
pub const PREFERRED_ID: &str = "TEMP:preferredId";
/// Predicate pointing at the replacement of a deprecated term.
pub const REPLACED_BY: &str = "replacedBy:";

/// Utility classes that legitimately carry no label.
const SILENT_UNLABELED: &[&str] = &[
    "owl:Thing",
    "owl:Class",
    "owl:ObjectProperty",
    "owl:AnnotationProperty",
    "owl:DatatypeProperty",
    "owl:NamedIndividual",
    "rdf:Property",
    "rdfs:Class",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TermError {
    /// A free-text lookup matched nothing, so there is no identifier to
    /// build a term from.
    #[error("no explicit identifier and no results for {query}")]
    NoExplicitId { query: String },
    /// More than one distinct IRI claims to satisfy a unique lookup.
    #[error("query matched more than one term: {}", iris.join(", "))]
    ManyResults { iris: Vec<String> },
    /// A caller-asserted field contradicts the authoritative record.
    #[error("{field} mismatch for {iri}: asserted {asserted:?}, record has {authoritative:?}")]
    FieldMismatch {
        iri: String,
        field: String,
        asserted: String,
        authoritative: String,
    },
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Canonical IRI to term mapping shared by resolvers.
///
/// Entries are overwritten on re-resolution, never merged. Lookups hand out
/// a cloned `Arc` so no shard lock outlives the call.
#[derive(Debug, Default)]
pub struct TermCache {
    terms: DashMap<String, Arc<Term>>,
}

impl TermCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, iri: &str) -> Option<Arc<Term>> {
        self.terms.get(iri).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores `term` under its IRI, replacing any previous entry.
    pub fn insert(&self, term: Arc<Term>) {
        self.terms.insert(term.iri().to_owned(), term);
    }

    pub fn remove(&self, iri: &str) -> Option<Arc<Term>> {
        self.terms.remove(iri).map(|(_, term)| term)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn clear(&self) {
        self.terms.clear();
    }
}

/// Arguments of a term construction: an identifier, asserted metadata, or a
/// free-text lookup when no identifier is given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermSpec {
    pub id: IdSpec,
    pub fields: TermFields,
    pub term: Option<String>,
    pub search: Option<String>,
    pub abbrev: Option<String>,
    pub predicates: Vec<String>,
}

impl TermSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spec for a bare curie or IRI.
    #[must_use]
    pub fn parse(value: impl Into<String>) -> Self {
        Self::from_id(IdSpec::parse(value))
    }

    #[must_use]
    pub fn from_id(id: IdSpec) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.fields.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.fields.definition = Some(definition.into());
        self
    }

    #[must_use]
    pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
        self.fields.synonyms.push(synonym.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.fields.deprecated = Some(deprecated);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.fields.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn term_type(mut self, term_type: impl Into<String>) -> Self {
        self.fields.term_type = Some(term_type.into());
        self
    }

    #[must_use]
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn abbrev(mut self, abbrev: impl Into<String>) -> Self {
        self.abbrev = Some(abbrev.into());
        self
    }

    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Free-text fields that an identifier overrides.
    fn ignored_text(&self) -> Vec<(&'static str, &str)> {
        [
            ("abbrev", &self.abbrev),
            ("term", &self.term),
            ("search", &self.search),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }

    fn text_query(&self) -> Query {
        let mut query = Query::new().predicates(self.predicates.iter().cloned());
        query.label = self.fields.label.clone();
        query.term = self.term.clone();
        query.search = self.search.clone();
        query.abbrev = self.abbrev.clone();
        query
    }
}

/// Traversal options for [`TermResolver::expand`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpandOptions {
    pub depth: u32,
    pub direction: Direction,
    pub include_supers: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            depth: 1,
            direction: Direction::Outgoing,
            include_supers: false,
        }
    }
}

/// Result of a predicate expansion.
///
/// A single requested predicate yields its values directly; several (or
/// all) predicates yield a map keyed by canonical curie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    Single(Vec<PredicateValue>),
    Many(BTreeMap<String, Vec<PredicateValue>>),
}

impl Expansion {
    #[must_use]
    pub fn as_single(&self) -> Option<&[PredicateValue]> {
        match self {
            Self::Single(values) => Some(values),
            Self::Many(_) => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Vec<PredicateValue>>> {
        match self {
            Self::Single(_) => None,
            Self::Many(values) => Some(values),
        }
    }
}

/// A term after following `TEMP:preferredId` or `replacedBy:`.
#[derive(Clone, Debug)]
pub struct PreferredTerm {
    term: Arc<Term>,
    original: Option<Arc<Term>>,
}

impl PreferredTerm {
    #[must_use]
    pub fn term(&self) -> &Arc<Term> {
        &self.term
    }

    /// The term the lookup started from, when a replacement was followed.
    #[must_use]
    pub fn original(&self) -> Option<&Arc<Term>> {
        self.original.as_ref()
    }

    #[must_use]
    pub fn is_replacement(&self) -> bool {
        self.original.is_some()
    }

    #[must_use]
    pub fn into_term(self) -> Arc<Term> {
        self.term
    }
}

impl Deref for PreferredTerm {
    type Target = Term;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

/// Resolves identifiers into cached, validated terms.
///
/// The resolver owns no vocabulary state of its own: namespaces come from
/// the dispatcher's registry and terms live in the (shareable) cache.
#[derive(Clone)]
pub struct TermResolver {
    dispatcher: Arc<QueryDispatcher>,
    cache: Arc<TermCache>,
}

impl TermResolver {
    #[must_use]
    pub fn new(dispatcher: Arc<QueryDispatcher>) -> Self {
        Self::with_cache(dispatcher, Arc::new(TermCache::new()))
    }

    #[must_use]
    pub fn with_cache(dispatcher: Arc<QueryDispatcher>, cache: Arc<TermCache>) -> Self {
        Self { dispatcher, cache }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<QueryDispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<TermCache> {
        &self.cache
    }

    #[must_use]
    pub fn registry(&self) -> &CurieRegistry {
        self.dispatcher.registry()
    }

    /// Normalizes identifier input without querying any service.
    ///
    /// # Errors
    ///
    /// See [`IdentifierError`].
    pub fn identifier(&self, spec: &IdSpec) -> Result<Identifier, IdentifierError> {
        Identifier::new(self.registry(), spec)
    }

    /// Resolves a bare curie or IRI.
    ///
    /// # Errors
    ///
    /// See [`Self::term`].
    pub fn resolve(&self, value: &str) -> Result<Arc<Term>, TermError> {
        self.term(&TermSpec::parse(value))
    }

    /// Builds a term from `spec`.
    ///
    /// An identifier that no service knows yields an unvalidated term, not an
    /// error. A cached validated term is returned as-is unless predicates are
    /// requested. Free-text fields next to an identifier are ignored with a
    /// warning.
    ///
    /// # Errors
    ///
    /// [`TermError::FieldMismatch`] when an asserted field contradicts the
    /// record, [`TermError::NoExplicitId`] for a free-text lookup without
    /// results, [`TermError::ManyResults`] when more than one IRI matches.
    pub fn term(&self, spec: &TermSpec) -> Result<Arc<Term>, TermError> {
        if spec.id.is_empty() {
            return self.term_from_text(spec);
        }

        let id = self.identifier(&spec.id)?;
        let ignored = spec.ignored_text();
        if !ignored.is_empty() {
            warn!(iri = id.iri(), ignored = ?ignored, "term_text_ignored_for_identifier");
        }
        if spec.predicates.is_empty() {
            if let Some(cached) = self.cache.get(id.iri()) {
                if let Some(record) = cached.record() {
                    self.validate_fields(&id, &spec.fields, record)?;
                    debug!(iri = id.iri(), "term_cache_hit");
                    return Ok(cached);
                }
            }
        }

        let mut query = Query::new()
            .iri(id.iri())
            .predicates(spec.predicates.iter().cloned());
        if let Some(curie) = id.curie() {
            query = query.curie(curie);
        }
        let records = self.collect(&query)?;

        match Self::select_record(self.registry(), records)? {
            Some(record) => {
                self.validate_fields(&id, &spec.fields, &record)?;
                Ok(self.build_term(id, record, spec.fields.clone()))
            }
            None => {
                info!(iri = id.iri(), "term_unresolved");
                let term = Arc::new(Term::unresolved(id, spec.fields.clone()));
                self.cache.insert(Arc::clone(&term));
                Ok(term)
            }
        }
    }

    fn term_from_text(&self, spec: &TermSpec) -> Result<Arc<Term>, TermError> {
        let query = spec.text_query();
        let description = match query.text_queries().first() {
            Some((field, value)) => format!("{field}={value}"),
            None => return Err(IdentifierError::NoIdentifier.into()),
        };

        let records = self.collect(&query)?;
        let mut iris: Vec<String> = Vec::new();
        for record in &records {
            if !iris.iter().any(|iri| iri == record.iri()) {
                iris.push(record.iri().to_owned());
            }
        }
        if iris.is_empty() {
            return Err(TermError::NoExplicitId { query: description });
        }
        if iris.len() > 1 {
            return Err(TermError::ManyResults { iris });
        }

        let Some(record) = Self::select_record(self.registry(), records)? else {
            return Err(TermError::NoExplicitId { query: description });
        };
        let id = Identifier::from_iri(self.registry(), record.iri())?;
        let mut asserted = spec.fields.clone();
        // the label doubled as the lookup key, the record's own label wins
        asserted.label = None;
        self.validate_fields(&id, &asserted, &record)?;
        if spec.predicates.is_empty() {
            if let Some(cached) = self.cached(&id) {
                return Ok(cached);
            }
        }
        Ok(self.build_term(id, record, spec.fields.clone()))
    }

    /// Dispatches `query` and wraps every record as a term, reusing validated
    /// cached terms.
    ///
    /// # Errors
    ///
    /// Query validation errors; failing services are skipped.
    pub fn query(&self, query: &Query) -> Result<Vec<Arc<Term>>, TermError> {
        self.collect(query)?
            .into_iter()
            .map(|record| self.as_term(record))
            .collect()
    }

    /// Wraps a record as a validated term and caches it. A validated term
    /// already cached for the same IRI is returned instead.
    ///
    /// # Errors
    ///
    /// [`TermError::Identifier`] when the record's IRI does not parse.
    pub fn as_term(&self, record: QueryResult) -> Result<Arc<Term>, TermError> {
        let id = Identifier::from_iri(self.registry(), record.iri())?;
        if let Some(cached) = self.cached(&id) {
            return Ok(cached);
        }
        Ok(self.build_term(id, record, TermFields::default()))
    }

    fn cached(&self, id: &Identifier) -> Option<Arc<Term>> {
        let cached = self.cache.get(id.iri())?;
        if cached.is_validated() {
            debug!(iri = id.iri(), "term_cache_hit");
            Some(cached)
        } else {
            None
        }
    }

    fn collect(&self, query: &Query) -> Result<Vec<QueryResult>, QueryError> {
        let mut records = Vec::new();
        for item in self.dispatcher.call(query)? {
            match item {
                Ok(record) => records.push(record),
                Err(err) => debug!(error = %err, "term_service_skipped"),
            }
        }
        Ok(records)
    }

    /// Picks the authoritative record out of a dispatch.
    fn select_record(
        registry: &CurieRegistry,
        records: Vec<QueryResult>,
    ) -> Result<Option<QueryResult>, TermError> {
        let mut winner: Option<QueryResult> = None;
        let mut last_unlabeled: Option<QueryResult> = None;

        for record in records {
            if let Some(current) = &winner {
                if current.iri() == record.iri() {
                    if current.curie() == record.curie() {
                        debug!(iri = record.iri(), source = ?record.source_name(), "term_record_corroborated");
                    } else {
                        warn!(
                            iri = record.iri(),
                            curie = ?current.curie(),
                            other = ?record.curie(),
                            source = ?record.source_name(),
                            "term_curie_disagreement"
                        );
                    }
                } else if record.has_label() {
                    return Err(TermError::ManyResults {
                        iris: vec![current.iri().to_owned(), record.iri().to_owned()],
                    });
                } else {
                    info!(iri = record.iri(), source = ?record.source_name(), "term_unlabeled_record");
                }
                continue;
            }

            if record.has_label() {
                winner = Some(record);
            } else {
                info!(iri = record.iri(), source = ?record.source_name(), "term_unlabeled_record");
                last_unlabeled = Some(record);
            }
        }

        if winner.is_some() {
            return Ok(winner);
        }
        if let Some(record) = &last_unlabeled {
            let curie = registry.qname(record.iri());
            if !SILENT_UNLABELED.contains(&curie.as_str()) {
                warn!(iri = record.iri(), "term_record_without_label");
            }
        }
        Ok(last_unlabeled)
    }

    fn validate_fields(
        &self,
        id: &Identifier,
        asserted: &TermFields,
        record: &QueryResult,
    ) -> Result<(), TermError> {
        let mismatch = |field: &str, asserted: &str, authoritative: &str| TermError::FieldMismatch {
            iri: id.iri().to_owned(),
            field: field.to_owned(),
            asserted: asserted.to_owned(),
            authoritative: authoritative.to_owned(),
        };

        if record.iri() != id.iri() {
            return Err(mismatch("iri", id.iri(), record.iri()));
        }

        if let (Some(curie), Some(other)) = (id.curie(), record.curie()) {
            if curie != other {
                let known = record.source().is_some_and(|source| {
                    source
                        .curies()
                        .zip(id.prefix())
                        .is_some_and(|(curies, prefix)| curies.knows_prefix(prefix))
                });
                if known {
                    return Err(mismatch("curie", &curie, other));
                }
                info!(iri = id.iri(), curie = %curie, other, "term_curie_prefix_drift");
            }
        }

        if let Some(label) = &asserted.label {
            let matched = record
                .label()
                .into_iter()
                .chain(record.labels().iter().map(String::as_str))
                .any(|candidate| eq_ignore_case(candidate, label));
            if !matched && (record.label().is_some() || !record.labels().is_empty()) {
                return Err(mismatch("label", label, record.label().unwrap_or_default()));
            }
        }

        if let (Some(definition), Some(other)) = (&asserted.definition, record.definition()) {
            if !eq_ignore_case(definition, other) {
                return Err(mismatch("definition", definition, other));
            }
        }

        if let (Some(category), Some(other)) = (&asserted.category, record.category()) {
            if !eq_ignore_case(category, other) {
                return Err(mismatch("category", category, other));
            }
        }

        if let (Some(deprecated), Some(other)) = (asserted.deprecated, record.deprecated()) {
            if deprecated != other {
                return Err(mismatch(
                    "deprecated",
                    &deprecated.to_string(),
                    &other.to_string(),
                ));
            }
        }

        if !record.synonyms().is_empty() {
            for synonym in &asserted.synonyms {
                if !record
                    .synonyms()
                    .iter()
                    .any(|other| eq_ignore_case(other, synonym))
                {
                    return Err(mismatch("synonyms", synonym, &record.synonyms().join(", ")));
                }
            }
        }

        if let (Some(term_type), Some(other)) = (&asserted.term_type, record.term_type()) {
            let left = self.dispatcher.predicate_key(term_type);
            let right = self.dispatcher.predicate_key(other);
            if !eq_ignore_case(&left, &right) {
                return Err(mismatch("type", term_type, other));
            }
        }

        Ok(())
    }

    fn build_term(&self, id: Identifier, record: QueryResult, asserted: TermFields) -> Arc<Term> {
        let resolved = ResolvedFields {
            type_: record
                .term_type()
                .map(|value| self.fix_value(&RecordValue::node(value))),
            types: record
                .types()
                .iter()
                .map(|value| self.fix_value(&RecordValue::node(value.as_str())))
                .collect(),
            predicates: self.fix_predicates(record.predicates()),
        };
        let term = Arc::new(Term::validated(id, record, resolved, asserted));
        self.cache.insert(Arc::clone(&term));
        term
    }

    fn fix_predicates(
        &self,
        predicates: &BTreeMap<String, Vec<RecordValue>>,
    ) -> BTreeMap<String, Vec<PredicateValue>> {
        predicates
            .iter()
            .map(|(key, values)| {
                (
                    self.dispatcher.predicate_key(key),
                    values.iter().map(|value| self.fix_value(value)).collect(),
                )
            })
            .collect()
    }

    /// Re-wraps a raw value: resolved terms stay terms, other identifiers
    /// become plain ids, and everything else is a literal.
    fn fix_value(&self, value: &RecordValue) -> PredicateValue {
        match value {
            RecordValue::Literal(literal) => PredicateValue::Literal(literal.clone()),
            RecordValue::Node(node) => match Identifier::parse(self.registry(), node) {
                Ok(id) => match self.cache.get(id.iri()) {
                    Some(term) if term.is_validated() => PredicateValue::Term(term),
                    _ => PredicateValue::Id(id),
                },
                Err(_) => PredicateValue::Literal(node.clone()),
            },
        }
    }

    /// Fetches predicate values for `term` and merges them into it.
    ///
    /// With no predicates every predicate known to the dispatcher is fetched.
    ///
    /// # Errors
    ///
    /// Query validation errors.
    pub fn expand<P: AsRef<str>>(
        &self,
        term: &Term,
        predicates: &[P],
        options: &ExpandOptions,
    ) -> Result<Expansion, TermError> {
        let requested: Vec<String> = if predicates.is_empty() {
            self.dispatcher.predicates().to_vec()
        } else {
            predicates
                .iter()
                .map(|predicate| self.dispatcher.predicate_key(predicate.as_ref()))
                .collect()
        };
        let mut fetched = self.fetch(term, &requested, options)?;

        if predicates.len() == 1 {
            return Ok(Expansion::Single(
                fetched.remove(&requested[0]).unwrap_or_default(),
            ));
        }
        for key in requested {
            fetched.entry(key).or_default();
        }
        Ok(Expansion::Many(fetched))
    }

    /// Fetches the given predicates and returns only those that have values.
    ///
    /// # Errors
    ///
    /// Query validation errors.
    pub fn fetch_predicates<P: AsRef<str>>(
        &self,
        term: &Term,
        predicates: &[P],
    ) -> Result<BTreeMap<String, Vec<PredicateValue>>, TermError> {
        let requested: Vec<String> = predicates
            .iter()
            .map(|predicate| self.dispatcher.predicate_key(predicate.as_ref()))
            .collect();
        self.fetch(term, &requested, &ExpandOptions::default())
    }

    fn fetch(
        &self,
        term: &Term,
        requested: &[String],
        options: &ExpandOptions,
    ) -> Result<BTreeMap<String, Vec<PredicateValue>>, TermError> {
        let mut query = Query::new()
            .iri(term.iri())
            .predicates(requested.iter().cloned())
            .depth(options.depth)
            .direction(options.direction)
            .include_supers(options.include_supers);
        if let Some(curie) = term.curie() {
            query = query.curie(curie);
        }

        let mut fetched = BTreeMap::new();
        for record in self.collect(&query)? {
            for (key, values) in self.fix_predicates(record.predicates()) {
                if requested.contains(&key) && !values.is_empty() {
                    fetched.insert(key, values);
                }
            }
        }

        if fetched.is_empty() {
            info!(iri = term.iri(), predicates = ?requested, "term_predicates_empty");
        } else {
            term.merge_predicates(fetched.clone());
        }
        Ok(fetched)
    }

    /// Follows `TEMP:preferredId`, or `replacedBy:` for deprecated terms,
    /// one hop. Returns the term unchanged when neither applies. Unvalidated
    /// terms are returned unchanged without fetching any predicates.
    ///
    /// # Errors
    ///
    /// Errors from fetching the predicates or resolving the replacement.
    pub fn preferred(&self, term: &Arc<Term>) -> Result<PreferredTerm, TermError> {
        let unchanged = || PreferredTerm {
            term: Arc::clone(term),
            original: None,
        };
        if !term.is_validated() {
            return Ok(unchanged());
        }

        let preferred_key = self.dispatcher.predicate_key(PREFERRED_ID);
        let replaced_key = self.dispatcher.predicate_key(REPLACED_BY);
        let mut predicates = term.predicates();
        if !predicates.contains_key(&preferred_key) && !predicates.contains_key(&replaced_key) {
            predicates = self.fetch(
                term,
                &[preferred_key.clone(), replaced_key.clone()],
                &ExpandOptions::default(),
            )?;
        }

        let first_id = |key: &str| {
            predicates
                .get(key)
                .and_then(|values| values.iter().find(|value| value.iri().is_some()))
                .cloned()
        };
        let target = first_id(&preferred_key).or_else(|| {
            if term.deprecated() == Some(true) {
                first_id(&replaced_key)
            } else {
                None
            }
        });

        let Some(target) = target else {
            return Ok(unchanged());
        };
        let replacement = match target {
            PredicateValue::Term(replacement) => replacement,
            PredicateValue::Id(id) => self.term(&TermSpec::from_id(IdSpec::new().iri(id.iri())))?,
            PredicateValue::Literal(_) => return Ok(unchanged()),
        };
        if replacement.iri() == term.iri() {
            return Ok(unchanged());
        }
        debug!(from = term.iri(), to = replacement.iri(), "term_preferred_followed");
        Ok(PreferredTerm {
            term: replacement,
            original: Some(Arc::clone(term)),
        })
    }
}

impl Term {
    /// Shorthand for [`TermResolver::expand`] with default options.
    ///
    /// # Errors
    ///
    /// See [`TermResolver::expand`].
    pub fn expand<P: AsRef<str>>(
        &self,
        resolver: &TermResolver,
        predicates: &[P],
    ) -> Result<Expansion, TermError> {
        resolver.expand(self, predicates, &ExpandOptions::default())
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
