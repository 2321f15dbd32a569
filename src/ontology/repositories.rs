use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{curies::CurieRegistry, entities::QueryResult};

/// Graph traversal direction for predicate expansion.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

/// Arguments of a single dispatch, shared by callers and services.
///
/// Services receive the normalized copy produced by the dispatcher: default
/// qualifiers merged in, at most one free-text field, and predicates rewritten
/// as canonical curies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Query {
    pub term: Option<String>,
    pub prefix: Vec<String>,
    pub category: Vec<String>,
    pub label: Option<String>,
    pub abbrev: Option<String>,
    pub search: Option<String>,
    pub suffix: Option<String>,
    pub curie: Option<String>,
    pub iri: Option<String>,
    pub predicates: Vec<String>,
    pub depth: u32,
    pub direction: Direction,
    pub limit: usize,
    pub exclude_prefix: Vec<String>,
    pub include_deprecated: bool,
    pub include_supers: bool,
    pub include_all_services: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            term: None,
            prefix: Vec::new(),
            category: Vec::new(),
            label: None,
            abbrev: None,
            search: None,
            suffix: None,
            curie: None,
            iri: None,
            predicates: Vec::new(),
            depth: 1,
            direction: Direction::Outgoing,
            limit: 10,
            exclude_prefix: Vec::new(),
            include_deprecated: false,
            include_supers: false,
            include_all_services: false,
        }
    }
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix.push(prefix.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category.push(category.into());
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn abbrev(mut self, abbrev: impl Into<String>) -> Self {
        self.abbrev = Some(abbrev.into());
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
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

    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    #[must_use]
    pub fn predicates<I, P>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.predicates.extend(predicates.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_prefix.push(prefix.into());
        self
    }

    #[must_use]
    pub fn include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    #[must_use]
    pub fn include_supers(mut self, include: bool) -> Self {
        self.include_supers = include;
        self
    }

    #[must_use]
    pub fn include_all_services(mut self, include: bool) -> Self {
        self.include_all_services = include;
        self
    }

    /// Populated free-text fields as `(name, value)` pairs.
    #[must_use]
    pub fn text_queries(&self) -> Vec<(&'static str, &str)> {
        [
            ("abbrev", &self.abbrev),
            ("label", &self.label),
            ("term", &self.term),
            ("search", &self.search),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|value| (name, value)))
        .collect()
    }

    /// True when the query names an identifier rather than searching.
    #[must_use]
    pub fn has_identifier(&self) -> bool {
        self.iri.is_some() || self.curie.is_some() || self.suffix.is_some()
    }

    /// Fuzzy queries may enumerate every service instead of stopping at the
    /// first one with results.
    #[must_use]
    pub fn is_fuzzy(&self) -> bool {
        self.search.is_some() || self.term.is_some()
    }

    /// The curie named by `curie` or by the first prefix plus `suffix`.
    #[must_use]
    pub fn identifier_curie(&self) -> Option<String> {
        self.curie.clone().or_else(|| {
            let suffix = self.suffix.as_ref()?;
            let prefix = self.prefix.first()?;
            Some(format!("{prefix}:{suffix}"))
        })
    }
}

/// Errors reported by backend services.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    /// One-time initialization failed.
    #[error("service `{service}` failed to start: {message}")]
    Setup { service: String, message: String },
    /// The backend rejected or failed the query.
    #[error("service `{service}` query failed: {message}")]
    Backend { service: String, message: String },
}

/// Iterator of records returned by [`TermService::query`].
pub type QueryResults<'a> = Box<dyn Iterator<Item = QueryResult> + 'a>;

/// Contract implemented by vocabulary backends.
///
/// Implementations are synchronous: a network backend blocks inside
/// [`TermService::query`]. Each call returns a fresh sequence that may be
/// empty.
pub trait TermService: Send + Sync {
    /// Name used in logs and stamped on every record.
    fn name(&self) -> &str;

    /// True once [`TermService::setup`] has completed.
    fn started(&self) -> bool;

    /// Performs lazy initialization.
    ///
    /// The dispatcher calls this at most once before the first query, but
    /// implementations must tolerate repeated calls.
    fn setup(&self) -> Result<(), ServiceError>;

    /// Relation types this backend can expand, as curies.
    fn predicates(&self) -> Vec<String>;

    /// Runs a normalized query.
    fn query<'a>(&'a self, query: &Query) -> Result<QueryResults<'a>, ServiceError>;

    /// The backend's own namespace map, when it exposes one.
    fn curies(&self) -> Option<&CurieRegistry> {
        None
    }
}

/// Shared handle to a service.
pub type ServiceHandle = Arc<dyn TermService>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_match_single_hop_outgoing_lookup() {
        let query = Query::new();
        assert_eq!(query.depth, 1);
        assert_eq!(query.limit, 10);
        assert_eq!(query.direction, Direction::Outgoing);
        assert!(!query.include_all_services);
    }

    #[rstest]
    #[case(Query::new().search("brain"), true)]
    #[case(Query::new().term("brain"), true)]
    #[case(Query::new().label("brain"), false)]
    #[case(Query::new().curie("UBERON:0000955"), false)]
    fn only_search_and_term_are_fuzzy(#[case] query: Query, #[case] fuzzy: bool) {
        assert_eq!(query.is_fuzzy(), fuzzy);
    }

    #[test]
    fn text_queries_lists_populated_fields() {
        let query = Query::new().label("brain").search("cortex");
        assert_eq!(
            query.text_queries(),
            vec![("label", "brain"), ("search", "cortex")]
        );
    }

    #[test]
    fn identifier_curie_joins_prefix_and_suffix() {
        let query = Query::new().prefix("UBERON").suffix("0000955");
        assert_eq!(query.identifier_curie().as_deref(), Some("UBERON:0000955"));
        assert_eq!(Query::new().identifier_curie(), None);
    }

    #[test]
    fn direction_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Direction::Incoming).expect("json"),
            "\"INCOMING\""
        );
    }
}
