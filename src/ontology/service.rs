use std::{
    collections::BTreeSet,
    sync::{Arc, OnceLock},
};

use tracing::{debug, warn};

use super::{
    curies::CurieRegistry,
    entities::QueryResult,
    repositories::{Query, QueryResults, ServiceError, ServiceHandle},
    value_objects::Identifier,
};
use crate::config::QuerySettings;

/// Errors raised while validating or running a dispatch.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    /// More than one free-text field was set.
    #[error("queries only accept a single free-text argument, got: {}", fields.join(", "))]
    MultipleTextQueries { fields: Vec<String> },
    /// `suffix` was supplied without an explicit `prefix`.
    #[error("queries using suffix= must also include an explicit prefix")]
    SuffixWithoutPrefix,
    /// Neither an identifier nor a free-text field was set.
    #[error("no identifier or free-text query provided")]
    NoQuery,
    /// A backend failed to start or to answer.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Runs queries against services in priority order.
///
/// The first service that yields anything wins and later services are not
/// consulted, unless the query asks for every service or is a fuzzy
/// `search`/`term` query.
pub struct QueryDispatcher {
    registry: Arc<CurieRegistry>,
    services: Vec<ServiceHandle>,
    prefix: Vec<String>,
    category: Vec<String>,
    predicates: OnceLock<Vec<String>>,
}

impl QueryDispatcher {
    /// Creates a dispatcher over `services`, highest priority first.
    pub fn new(registry: Arc<CurieRegistry>, services: Vec<ServiceHandle>) -> Self {
        Self {
            registry,
            services,
            prefix: Vec::new(),
            category: Vec::new(),
            predicates: OnceLock::new(),
        }
    }

    /// Builds a dispatcher whose default qualifiers come from configuration.
    pub fn from_settings(
        settings: &QuerySettings,
        registry: Arc<CurieRegistry>,
        services: Vec<ServiceHandle>,
    ) -> Self {
        Self::new(registry, services)
            .with_prefixes(settings.prefix.iter().cloned())
            .with_categories(settings.category.iter().cloned())
    }

    /// Adds prefixes applied to every query.
    #[must_use]
    pub fn with_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.prefix.extend(prefixes);
        self
    }

    /// Adds categories applied to every query.
    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = String>) -> Self {
        self.category.extend(categories);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<CurieRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn services(&self) -> &[ServiceHandle] {
        &self.services
    }

    /// Union of every service's predicates as canonical keys, sorted and
    /// deduplicated.
    pub fn predicates(&self) -> &[String] {
        self.predicates.get_or_init(|| {
            self.services
                .iter()
                .flat_map(|service| service.predicates())
                .map(|predicate| self.predicate_key(&predicate))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    /// Canonical curie for a predicate given as curie or IRI; values the
    /// registry cannot normalize are passed through.
    #[must_use]
    pub fn predicate_key(&self, predicate: &str) -> String {
        canonical_predicate(&self.registry, predicate)
    }

    /// Validates `query` and merges the dispatcher defaults into it.
    ///
    /// # Errors
    ///
    /// See [`QueryError`].
    pub fn prepare(&self, query: &Query) -> Result<Query, QueryError> {
        if query.suffix.is_some() && query.prefix.is_empty() {
            return Err(QueryError::SuffixWithoutPrefix);
        }

        let mut prepared = query.clone();
        extend_unique(&mut prepared.prefix, &self.prefix);
        extend_unique(&mut prepared.category, &self.category);

        if prepared.has_identifier() {
            let texts = prepared.text_queries();
            if !texts.is_empty() {
                warn!(
                    identifier = ?prepared.iri.as_ref().or(prepared.curie.as_ref()).or(prepared.suffix.as_ref()),
                    ignored = ?texts,
                    "query_text_ignored_for_identifier"
                );
                prepared.abbrev = None;
                prepared.label = None;
                prepared.term = None;
                prepared.search = None;
            }
        } else {
            let texts = prepared.text_queries();
            if texts.len() > 1 {
                return Err(QueryError::MultipleTextQueries {
                    fields: texts.iter().map(|(name, _)| (*name).to_owned()).collect(),
                });
            }
            if texts.is_empty() {
                return Err(QueryError::NoQuery);
            }
        }

        prepared.predicates = prepared
            .predicates
            .iter()
            .map(|predicate| self.predicate_key(predicate))
            .collect();
        Ok(prepared)
    }

    /// Dispatches a query, yielding raw records lazily.
    ///
    /// A service that fails to start or to answer produces one `Err` item and
    /// iteration moves on to the next service.
    ///
    /// # Errors
    ///
    /// Validation errors from [`Self::prepare`].
    pub fn call(&self, query: &Query) -> Result<Dispatch<'_>, QueryError> {
        let query = self.prepare(query)?;
        let exhaustive = query.include_all_services || query.is_fuzzy();
        Ok(Dispatch {
            dispatcher: self,
            query,
            exhaustive,
            next_service: 0,
            current: None,
            yielded: false,
            finished: false,
        })
    }

    fn excluded(&self, query: &Query, result: &QueryResult) -> bool {
        if query.exclude_prefix.is_empty() {
            return false;
        }
        self.registry
            .identifier_prefixes(result.iri())
            .iter()
            .any(|prefix| query.exclude_prefix.contains(prefix))
    }
}

pub(crate) fn canonical_predicate(registry: &CurieRegistry, predicate: &str) -> String {
    if !predicate.contains(':') {
        return predicate.to_owned();
    }
    Identifier::parse(registry, predicate).map_or_else(
        |err| {
            debug!(predicate, error = %err, "predicate_not_normalized");
            predicate.to_owned()
        },
        |id| id.curie_or_iri(),
    )
}

fn extend_unique(target: &mut Vec<String>, extra: &[String]) {
    for value in extra {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

/// Lazy record stream produced by [`QueryDispatcher::call`].
pub struct Dispatch<'a> {
    dispatcher: &'a QueryDispatcher,
    query: Query,
    exhaustive: bool,
    next_service: usize,
    current: Option<(&'a ServiceHandle, QueryResults<'a>)>,
    yielded: bool,
    finished: bool,
}

impl Dispatch<'_> {
    /// The normalized query sent to services.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl Iterator for Dispatch<'_> {
    type Item = Result<QueryResult, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some((service, results)) = &mut self.current {
                match results.next() {
                    Some(result) => {
                        if self.dispatcher.excluded(&self.query, &result) {
                            debug!(iri = result.iri(), "query_result_excluded");
                            continue;
                        }
                        self.yielded = true;
                        let service: &ServiceHandle = service;
                        return Some(Ok(result.stamp(
                            Arc::downgrade(service),
                            service.name(),
                            &self.query,
                        )));
                    }
                    None => {
                        self.current = None;
                        if self.yielded && !self.exhaustive {
                            self.finished = true;
                            return None;
                        }
                    }
                }
            }

            let Some(service) = self.dispatcher.services.get(self.next_service) else {
                self.finished = true;
                return None;
            };
            self.next_service += 1;

            if !service.started() {
                if let Err(err) = service.setup() {
                    warn!(service = service.name(), error = %err, "query_service_setup_failed");
                    return Some(Err(err.into()));
                }
            }
            match service.query(&self.query) {
                Ok(results) => self.current = Some((service, results)),
                Err(err) => {
                    warn!(service = service.name(), error = %err, "query_service_failed");
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    };

    use rstest::rstest;

    use super::*;
    use crate::ontology::repositories::TermService;

    const BRAIN: &str = "http://purl.obolibrary.org/obo/UBERON_0000955";

    struct Recording {
        name: &'static str,
        records: Vec<QueryResult>,
        calls: Mutex<Vec<Query>>,
        setups: AtomicUsize,
        started: AtomicBool,
        fail_setup: bool,
    }

    impl Recording {
        fn new(name: &'static str, records: Vec<QueryResult>) -> Arc<Self> {
            Arc::new(Self {
                name,
                records,
                calls: Mutex::new(Vec::new()),
                setups: AtomicUsize::new(0),
                started: AtomicBool::new(false),
                fail_setup: false,
            })
        }

        fn broken(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                records: Vec::new(),
                calls: Mutex::new(Vec::new()),
                setups: AtomicUsize::new(0),
                started: AtomicBool::new(false),
                fail_setup: true,
            })
        }

        fn calls(&self) -> Vec<Query> {
            self.calls.lock().expect("calls").clone()
        }
    }

    impl TermService for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn started(&self) -> bool {
            self.started.load(Ordering::SeqCst)
        }

        fn setup(&self) -> Result<(), ServiceError> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            if self.fail_setup {
                return Err(ServiceError::Setup {
                    service: self.name.to_owned(),
                    message: "offline".to_owned(),
                });
            }
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn predicates(&self) -> Vec<String> {
            vec!["rdfs:subClassOf".to_owned(), format!("{}:rel", self.name)]
        }

        fn query<'a>(&'a self, query: &Query) -> Result<QueryResults<'a>, ServiceError> {
            self.calls.lock().expect("calls").push(query.clone());
            Ok(Box::new(self.records.clone().into_iter()))
        }
    }

    fn brain() -> QueryResult {
        QueryResult::builder(BRAIN)
            .curie("UBERON:0000955")
            .label("brain")
            .build()
    }

    fn dispatcher(services: Vec<ServiceHandle>) -> QueryDispatcher {
        QueryDispatcher::new(Arc::new(CurieRegistry::with_defaults()), services)
    }

    #[test]
    fn first_service_with_results_wins() {
        let a = Recording::new("a", vec![brain()]);
        let b = Recording::new("b", vec![brain()]);
        let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

        let results: Vec<_> = dispatcher
            .call(&Query::new().curie("UBERON:0000955"))
            .expect("dispatch")
            .collect::<Result<_, _>>()
            .expect("results");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_name(), Some("a"));
        assert!(results[0].source().is_some());
        assert_eq!(a.calls().len(), 1);
        assert!(b.calls().is_empty());
    }

    #[test]
    fn empty_services_fall_through() {
        let a = Recording::new("a", Vec::new());
        let b = Recording::new("b", vec![brain()]);
        let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

        let results: Vec<_> = dispatcher
            .call(&Query::new().iri(BRAIN))
            .expect("dispatch")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_name(), Some("b"));
        assert_eq!(a.calls().len(), 1);
    }

    #[rstest]
    #[case(Query::new().search("brain"))]
    #[case(Query::new().term("brain"))]
    #[case(Query::new().label("brain").include_all_services(true))]
    fn fuzzy_and_exhaustive_queries_visit_every_service(#[case] query: Query) {
        let a = Recording::new("a", vec![brain()]);
        let b = Recording::new("b", vec![brain()]);
        let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

        let count = dispatcher.call(&query).expect("dispatch").count();

        assert_eq!(count, 2);
        assert_eq!(b.calls().len(), 1);
    }

    #[test]
    fn dispatch_is_lazy() {
        let a = Recording::new("a", vec![brain()]);
        let dispatcher = dispatcher(vec![a.clone()]);
        let dispatch = dispatcher.call(&Query::new().label("brain")).expect("dispatch");
        assert!(a.calls().is_empty());
        drop(dispatch);
        assert!(a.calls().is_empty());
    }

    #[test]
    fn setup_runs_once() {
        let a = Recording::new("a", Vec::new());
        let dispatcher = dispatcher(vec![a.clone()]);
        for _ in 0..3 {
            let _ = dispatcher.call(&Query::new().label("brain")).expect("dispatch").count();
        }
        assert_eq!(a.setups.load(Ordering::SeqCst), 1);
        assert_eq!(a.calls().len(), 3);
    }

    #[test]
    fn failing_service_is_reported_and_skipped() {
        let broken = Recording::broken("broken");
        let b = Recording::new("b", vec![brain()]);
        let dispatcher = dispatcher(vec![broken, b]);

        let items: Vec<_> = dispatcher
            .call(&Query::new().label("brain"))
            .expect("dispatch")
            .collect();

        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            Err(QueryError::Service(ServiceError::Setup { service, .. })) if service == "broken"
        ));
        assert!(items[1].is_ok());
    }

    #[rstest]
    #[case(Query::new().label("brain").search("brain"), QueryError::MultipleTextQueries {
        fields: vec!["label".into(), "search".into()],
    })]
    #[case(Query::new().suffix("0000955"), QueryError::SuffixWithoutPrefix)]
    #[case(Query::new(), QueryError::NoQuery)]
    #[case(Query::new().prefix("UBERON"), QueryError::NoQuery)]
    fn invalid_queries_are_rejected(#[case] query: Query, #[case] expected: QueryError) {
        let dispatcher = dispatcher(Vec::new());
        assert_eq!(dispatcher.call(&query).err(), Some(expected));
    }

    #[test]
    fn suffix_requires_a_caller_prefix_even_with_defaults() {
        let dispatcher = dispatcher(Vec::new()).with_prefixes(["UBERON".to_owned()]);
        assert_eq!(
            dispatcher.prepare(&Query::new().suffix("0000955")).err(),
            Some(QueryError::SuffixWithoutPrefix)
        );
    }

    #[test]
    fn identifier_queries_drop_free_text() {
        let dispatcher = dispatcher(Vec::new());
        let prepared = dispatcher
            .prepare(&Query::new().curie("UBERON:0000955").label("brain"))
            .expect("prepared");
        assert_eq!(prepared.label, None);
        assert_eq!(prepared.curie.as_deref(), Some("UBERON:0000955"));
    }

    #[test]
    fn defaults_and_predicates_are_normalized() {
        let dispatcher = dispatcher(Vec::new())
            .with_prefixes(["UBERON".to_owned()])
            .with_categories(["anatomy".to_owned()]);
        let prepared = dispatcher
            .prepare(
                &Query::new()
                    .label("brain")
                    .prefix("UBERON")
                    .predicate("http://www.w3.org/2000/01/rdf-schema#subClassOf")
                    .predicate("partOf"),
            )
            .expect("prepared");
        assert_eq!(prepared.prefix, vec!["UBERON"]);
        assert_eq!(prepared.category, vec!["anatomy"]);
        assert_eq!(prepared.predicates, vec!["rdfs:subClassOf", "partOf"]);
    }

    #[test]
    fn excluded_prefixes_are_filtered() {
        let a = Recording::new("a", vec![brain()]);
        let b = Recording::new("b", vec![brain()]);
        let dispatcher = dispatcher(vec![a, b.clone()]);

        let results = dispatcher
            .call(&Query::new().label("brain").exclude_prefix("obo"))
            .expect("dispatch")
            .count();

        assert_eq!(results, 0);
        assert_eq!(b.calls().len(), 1);
    }

    #[test]
    fn predicate_union_is_sorted_and_unique() {
        let dispatcher = dispatcher(vec![
            Recording::new("b", Vec::new()),
            Recording::new("a", Vec::new()),
        ]);
        assert_eq!(
            dispatcher.predicates(),
            ["a:rel", "b:rel", "rdfs:subClassOf"]
        );
    }
}
