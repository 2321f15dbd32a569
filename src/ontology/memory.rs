//! In-process [`TermService`] backed by a list of records and a triple list.
//!
//! Used to seed local vocabularies and to exercise dispatch without a network
//! backend.

use std::{
    collections::{BTreeSet, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::debug;

use super::{
    curies::CurieRegistry,
    entities::{QueryResult, RecordValue},
    repositories::{Direction, Query, QueryResults, ServiceError, TermService},
    service::canonical_predicate,
    value_objects::Identifier,
};

#[derive(Clone, Debug)]
struct Edge {
    subject: String,
    predicate: String,
    object: String,
}

/// Term service answering from memory.
///
/// Identifier lookups match on IRI. Text lookups compare case-insensitively:
/// `label` against labels, `abbrev` against synonyms, `term` against both,
/// and `search` by substring over labels, synonyms and definitions.
/// `include_supers` is not supported and is ignored.
#[derive(Debug)]
pub struct MemoryService {
    name: String,
    registry: Arc<CurieRegistry>,
    records: Vec<QueryResult>,
    edges: Vec<Edge>,
    started: AtomicBool,
}

impl MemoryService {
    #[must_use]
    pub fn new(name: impl Into<String>, registry: Arc<CurieRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
            records: Vec::new(),
            edges: Vec::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Adds a record. Records are returned in insertion order.
    #[must_use]
    pub fn with_record(mut self, record: QueryResult) -> Self {
        self.records.push(record);
        self
    }

    #[must_use]
    pub fn with_records(mut self, records: impl IntoIterator<Item = QueryResult>) -> Self {
        self.records.extend(records);
        self
    }

    /// Adds a `subject predicate object` edge used for predicate traversal.
    ///
    /// Each part may be a curie or an IRI.
    #[must_use]
    pub fn with_edge(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        let edge = Edge {
            subject: self.to_iri(subject),
            predicate: canonical_predicate(&self.registry, predicate),
            object: self.to_iri(object),
        };
        self.edges.push(edge);
        self
    }

    #[must_use]
    pub fn records(&self) -> &[QueryResult] {
        &self.records
    }

    fn to_iri(&self, value: &str) -> String {
        Identifier::parse(&self.registry, value)
            .map_or_else(|_| value.to_owned(), |id| id.iri().to_owned())
    }

    fn target_iri(&self, query: &Query) -> Option<String> {
        if let Some(iri) = &query.iri {
            return Some(iri.clone());
        }
        let curie = query.identifier_curie()?;
        self.registry.expand(&curie).ok()
    }

    fn traverse(&self, start: &str, predicate: &str, query: &Query) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::from([start]);
        let mut found = Vec::new();
        let mut frontier = VecDeque::from([(start, 0u32)]);

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= query.depth {
                continue;
            }
            for edge in self.edges.iter().filter(|edge| edge.predicate == predicate) {
                let next = match query.direction {
                    Direction::Outgoing => (edge.subject == node).then_some(edge.object.as_str()),
                    Direction::Incoming => (edge.object == node).then_some(edge.subject.as_str()),
                    Direction::Both => {
                        if edge.subject == node {
                            Some(edge.object.as_str())
                        } else if edge.object == node {
                            Some(edge.subject.as_str())
                        } else {
                            None
                        }
                    }
                };
                if let Some(next) = next {
                    if seen.insert(next) {
                        found.push(next.to_owned());
                        frontier.push_back((next, depth + 1));
                    }
                }
            }
        }
        found
    }

    fn materialize(&self, record: &QueryResult, query: &Query) -> QueryResult {
        if query.predicates.is_empty() {
            return record.clone();
        }
        let mut builder = record.clone().into_builder();
        for predicate in &query.predicates {
            let existing = record.predicates().get(predicate);
            let values: Vec<RecordValue> = self
                .traverse(record.iri(), predicate, query)
                .into_iter()
                .map(|iri| RecordValue::node(self.registry.qname(&iri)))
                .filter(|value| existing.map_or(true, |existing| !existing.contains(value)))
                .collect();
            if !values.is_empty() {
                builder = builder.predicate(predicate.clone(), values);
            }
        }
        builder.build()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

struct Matcher {
    target: Option<String>,
    query: Query,
}

impl Matcher {
    fn matches(&self, registry: &CurieRegistry, record: &QueryResult) -> bool {
        if let Some(target) = &self.target {
            return record.iri() == target;
        }
        if record.deprecated() == Some(true) && !self.query.include_deprecated {
            return false;
        }
        if !self.query.prefix.is_empty() {
            let prefixes = registry.identifier_prefixes(record.iri());
            if !prefixes.iter().any(|prefix| self.query.prefix.contains(prefix)) {
                return false;
            }
        }
        if !self.query.category.is_empty()
            && !record.category().is_some_and(|category| {
                self.query
                    .category
                    .iter()
                    .any(|wanted| eq_ignore_case(wanted, category))
            })
        {
            return false;
        }

        let mut labels = record.labels().iter().map(String::as_str);
        let mut synonyms = record.synonyms().iter().map(String::as_str);
        if let Some(label) = &self.query.label {
            return labels.any(|candidate| eq_ignore_case(candidate, label));
        }
        if let Some(abbrev) = &self.query.abbrev {
            return synonyms.any(|candidate| eq_ignore_case(candidate, abbrev));
        }
        if let Some(term) = &self.query.term {
            return labels
                .chain(synonyms)
                .any(|candidate| eq_ignore_case(candidate, term));
        }
        if let Some(search) = &self.query.search {
            let needle = search.to_lowercase();
            return labels
                .chain(synonyms)
                .chain(record.definition())
                .any(|candidate| candidate.to_lowercase().contains(&needle));
        }
        false
    }
}

struct MemoryResults<'a> {
    service: &'a MemoryService,
    matcher: Matcher,
    position: usize,
    remaining: usize,
}

impl Iterator for MemoryResults<'_> {
    type Item = QueryResult;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let record = self.service.records.get(self.position)?;
            self.position += 1;
            if self.matcher.matches(&self.service.registry, record) {
                self.remaining -= 1;
                return Some(self.service.materialize(record, &self.matcher.query));
            }
        }
        None
    }
}

impl TermService for MemoryService {
    fn name(&self) -> &str {
        &self.name
    }

    fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn setup(&self) -> Result<(), ServiceError> {
        if !self.started.swap(true, Ordering::AcqRel) {
            debug!(
                service = %self.name,
                records = self.records.len(),
                edges = self.edges.len(),
                "memory_service_started"
            );
        }
        Ok(())
    }

    fn predicates(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|record| record.predicates().keys().cloned())
            .chain(self.edges.iter().map(|edge| edge.predicate.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn query<'a>(&'a self, query: &Query) -> Result<QueryResults<'a>, ServiceError> {
        let target = self.target_iri(query);
        if query.has_identifier() && target.is_none() {
            return Ok(Box::new(std::iter::empty()));
        }
        let remaining = if target.is_some() || query.limit == 0 {
            usize::MAX
        } else {
            query.limit
        };
        Ok(Box::new(MemoryResults {
            service: self,
            matcher: Matcher {
                target,
                query: query.clone(),
            },
            position: 0,
            remaining,
        }))
    }

    fn curies(&self) -> Option<&CurieRegistry> {
        Some(&self.registry)
    }
}
