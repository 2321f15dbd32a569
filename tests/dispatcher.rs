use std::sync::{Arc, Mutex};

use ontquery::ontology::{
    CurieRegistry, Query, QueryDispatcher, QueryError, QueryResult, QueryResults, ServiceError,
    ServiceHandle, TermService,
};
use rstest::rstest;

const BRAIN: &str = "http://purl.obolibrary.org/obo/UBERON_0000955";

/// Answers every query with the same record and remembers what it was asked.
struct Counting {
    name: &'static str,
    calls: Mutex<Vec<Query>>,
}

impl Counting {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }
}

impl TermService for Counting {
    fn name(&self) -> &str {
        self.name
    }

    fn started(&self) -> bool {
        true
    }

    fn setup(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn predicates(&self) -> Vec<String> {
        vec!["rdfs:subClassOf".to_owned()]
    }

    fn query<'a>(&'a self, query: &Query) -> Result<QueryResults<'a>, ServiceError> {
        self.calls.lock().expect("calls").push(query.clone());
        Ok(Box::new(std::iter::once(
            QueryResult::builder(BRAIN)
                .curie("UBERON:0000955")
                .label(format!("brain from {}", self.name))
                .build(),
        )))
    }
}

struct Offline;

impl TermService for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn started(&self) -> bool {
        true
    }

    fn setup(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn predicates(&self) -> Vec<String> {
        vec!["http://www.w3.org/2000/01/rdf-schema#subClassOf".to_owned()]
    }

    fn query<'a>(&'a self, _query: &Query) -> Result<QueryResults<'a>, ServiceError> {
        Err(ServiceError::Backend {
            service: "offline".to_owned(),
            message: "connection refused".to_owned(),
        })
    }
}

fn dispatcher(services: Vec<ServiceHandle>) -> QueryDispatcher {
    QueryDispatcher::new(Arc::new(CurieRegistry::with_defaults()), services)
}

fn labels(dispatcher: &QueryDispatcher, query: &Query) -> Vec<String> {
    dispatcher
        .call(query)
        .expect("dispatch")
        .filter_map(Result::ok)
        .filter_map(|record| record.label().map(str::to_owned))
        .collect()
}

#[test]
fn identifier_query_stops_at_first_service() {
    let a = Counting::new("a");
    let b = Counting::new("b");
    let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

    let found = labels(&dispatcher, &Query::new().curie("UBERON:0000955"));

    assert_eq!(found, vec!["brain from a"]);
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 0);
}

#[test]
fn search_query_consults_every_service() {
    let a = Counting::new("a");
    let b = Counting::new("b");
    let dispatcher = dispatcher(vec![a.clone(), b.clone()]);

    let found = labels(&dispatcher, &Query::new().search("brain"));

    assert_eq!(found, vec!["brain from a", "brain from b"]);
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 1);
}

#[test]
fn services_receive_the_normalized_query() {
    let a = Counting::new("a");
    let dispatcher = dispatcher(vec![a.clone()]).with_prefixes(["UBERON".to_owned()]);

    let _ = labels(
        &dispatcher,
        &Query::new()
            .label("brain")
            .predicate("http://www.w3.org/2000/01/rdf-schema#subClassOf"),
    );

    let calls = a.calls.lock().expect("calls");
    assert_eq!(calls[0].prefix, vec!["UBERON"]);
    assert_eq!(calls[0].predicates, vec!["rdfs:subClassOf"]);
}

#[test]
fn failing_service_does_not_hide_later_results() {
    let b = Counting::new("b");
    let dispatcher = dispatcher(vec![Arc::new(Offline), b.clone()]);

    let items: Vec<_> = dispatcher
        .call(&Query::new().iri(BRAIN))
        .expect("dispatch")
        .collect();

    assert!(matches!(
        &items[..],
        [Err(QueryError::Service(ServiceError::Backend { .. })), Ok(record)]
            if record.source_name() == Some("b")
    ));
}

#[rstest]
#[case(Query::new().term("brain").abbrev("br"))]
#[case(Query::new().label("brain").search("brain"))]
fn multiple_text_fields_are_rejected(#[case] query: Query) {
    let dispatcher = dispatcher(vec![Counting::new("a")]);
    assert!(matches!(
        dispatcher.call(&query),
        Err(QueryError::MultipleTextQueries { fields }) if fields.len() == 2
    ));
}

#[test]
fn predicate_union_is_keyed_by_canonical_curie() {
    let dispatcher = dispatcher(vec![Counting::new("a"), Arc::new(Offline)]);
    assert_eq!(dispatcher.predicates(), ["rdfs:subClassOf"]);
}
