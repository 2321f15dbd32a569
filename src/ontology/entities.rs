use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock, Weak},
};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::{
    display::{self, DisplayStyle},
    repositories::{Query, TermService},
    value_objects::Identifier,
};

/// A predicate value as reported by a backend, before normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RecordValue {
    /// A curie or IRI naming another term.
    Node(String),
    /// Any other literal value.
    Literal(String),
}

impl RecordValue {
    #[must_use]
    pub fn node(value: impl Into<String>) -> Self {
        Self::Node(value.into())
    }

    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Node(value) | Self::Literal(value) => value,
        }
    }
}

/// Immutable record produced by a [`TermService`].
///
/// Built once with [`QueryResult::builder`]; the dispatcher stamps the
/// producing service and the query that produced it before handing the
/// record out.
#[derive(Clone, Debug, Default, Serialize)]
pub struct QueryResult {
    iri: String,
    curie: Option<String>,
    label: Option<String>,
    labels: Vec<String>,
    definition: Option<String>,
    synonyms: Vec<String>,
    deprecated: Option<bool>,
    category: Option<String>,
    predicates: BTreeMap<String, Vec<RecordValue>>,
    #[serde(rename = "type")]
    type_: Option<String>,
    types: Vec<String>,
    #[serde(skip)]
    source: Option<Weak<dyn TermService>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_name: Option<String>,
    #[serde(skip)]
    query: Option<Query>,
}

impl QueryResult {
    /// Starts a record for `iri`.
    #[must_use]
    pub fn builder(iri: impl Into<String>) -> QueryResultBuilder {
        QueryResultBuilder {
            record: Self {
                iri: iri.into(),
                ..Self::default()
            },
        }
    }

    #[must_use]
    pub fn iri(&self) -> &str {
        &self.iri
    }

    #[must_use]
    pub fn curie(&self) -> Option<&str> {
        self.curie.as_deref()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// True when the record carries a non-empty label.
    #[must_use]
    pub fn has_label(&self) -> bool {
        self.label.as_deref().is_some_and(|label| !label.is_empty())
    }

    /// All labels in the order the backend reported them, without duplicates.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    #[must_use]
    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    #[must_use]
    pub fn deprecated(&self) -> Option<bool> {
        self.deprecated
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn predicates(&self) -> &BTreeMap<String, Vec<RecordValue>> {
        &self.predicates
    }

    #[must_use]
    pub fn term_type(&self) -> Option<&str> {
        self.type_.as_deref()
    }

    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Returns the producing service if it is still alive.
    #[must_use]
    pub fn source(&self) -> Option<Arc<dyn TermService>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// The query that produced this record, kept for debugging.
    #[must_use]
    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Reopens the record for editing, keeping every field set so far.
    #[must_use]
    pub fn into_builder(self) -> QueryResultBuilder {
        QueryResultBuilder { record: self }
    }

    pub(crate) fn stamp(
        mut self,
        source: Weak<dyn TermService>,
        source_name: &str,
        query: &Query,
    ) -> Self {
        self.source = Some(source);
        self.source_name = Some(source_name.to_owned());
        self.query = Some(query.clone());
        self
    }

    /// Populated fields keyed by name, the mapping view of the record.
    #[must_use]
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        fields.retain(|_, value| match value {
            Value::Null => false,
            Value::Array(items) => !items.is_empty(),
            Value::Object(items) => !items.is_empty(),
            _ => true,
        });
        fields
    }

    /// Looks a field up by name, `None` when it is absent or empty.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields().remove(field)
    }

    /// Iterates over populated `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (String, Value)> {
        self.fields().into_iter()
    }
}

/// Builder for [`QueryResult`].
#[derive(Clone, Debug)]
pub struct QueryResultBuilder {
    record: QueryResult,
}

impl QueryResultBuilder {
    #[must_use]
    pub fn curie(mut self, curie: impl Into<String>) -> Self {
        self.record.curie = Some(curie.into());
        self
    }

    /// Sets the primary label, which is also the first entry of `labels`.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.record.labels.retain(|existing| existing != &label);
        self.record.labels.insert(0, label.clone());
        self.record.label = Some(label);
        self
    }

    /// Adds an alternative label.
    #[must_use]
    pub fn alt_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.record.labels.contains(&label) {
            self.record.labels.push(label);
        }
        self
    }

    #[must_use]
    pub fn definition(mut self, definition: impl Into<String>) -> Self {
        self.record.definition = Some(definition.into());
        self
    }

    #[must_use]
    pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
        self.record.synonyms.push(synonym.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.record.deprecated = Some(deprecated);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.record.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn term_type(mut self, term_type: impl Into<String>) -> Self {
        let term_type = term_type.into();
        if !self.record.types.contains(&term_type) {
            self.record.types.push(term_type.clone());
        }
        self.record.type_ = Some(term_type);
        self
    }

    #[must_use]
    pub fn additional_type(mut self, term_type: impl Into<String>) -> Self {
        self.record.types.push(term_type.into());
        self
    }

    /// Appends values to a predicate.
    #[must_use]
    pub fn predicate(
        mut self,
        predicate: impl Into<String>,
        values: impl IntoIterator<Item = RecordValue>,
    ) -> Self {
        self.record
            .predicates
            .entry(predicate.into())
            .or_default()
            .extend(values);
        self
    }

    #[must_use]
    pub fn build(self) -> QueryResult {
        self.record
    }
}

/// A predicate value attached to a [`Term`].
///
/// Identifiers that already resolved to a validated term are carried as
/// [`PredicateValue::Term`]; the two kinds never compare equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PredicateValue {
    Id(Identifier),
    Term(Arc<Term>),
    Literal(String),
}

impl PredicateValue {
    /// The IRI for identifier-like values.
    #[must_use]
    pub fn iri(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id.iri()),
            Self::Term(term) => Some(term.iri()),
            Self::Literal(_) => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for PredicateValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => Display::fmt(id, f),
            Self::Term(term) => Display::fmt(term, f),
            Self::Literal(value) => f.write_str(value),
        }
    }
}

impl Serialize for PredicateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Id(id) => id.serialize(serializer),
            Self::Term(term) => term.id().serialize(serializer),
            Self::Literal(value) => serializer.serialize_str(value),
        }
    }
}

/// Metadata a caller asserts about a term before it is resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermFields {
    pub label: Option<String>,
    pub definition: Option<String>,
    pub synonyms: Vec<String>,
    pub deprecated: Option<bool>,
    pub category: Option<String>,
    pub term_type: Option<String>,
}

impl TermFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A resolved, or explicitly unresolved, term.
///
/// Fields are written once by the resolver. Only the predicate map grows
/// afterwards, through predicate expansion.
#[derive(Debug)]
pub struct Term {
    id: Identifier,
    label: Option<String>,
    labels: Vec<String>,
    definition: Option<String>,
    synonyms: Vec<String>,
    deprecated: Option<bool>,
    category: Option<String>,
    type_: Option<PredicateValue>,
    types: Vec<PredicateValue>,
    predicates: RwLock<BTreeMap<String, Vec<PredicateValue>>>,
    validated: bool,
    record: Option<QueryResult>,
    asserted: TermFields,
}

/// Resolved field values handed to [`Term::validated`].
#[derive(Debug, Default)]
pub(crate) struct ResolvedFields {
    pub type_: Option<PredicateValue>,
    pub types: Vec<PredicateValue>,
    pub predicates: BTreeMap<String, Vec<PredicateValue>>,
}

impl Term {
    pub(crate) fn validated(
        id: Identifier,
        record: QueryResult,
        resolved: ResolvedFields,
        asserted: TermFields,
    ) -> Self {
        Self {
            id,
            label: record.label.clone(),
            labels: record.labels.clone(),
            definition: record.definition.clone(),
            synonyms: record.synonyms.clone(),
            deprecated: record.deprecated,
            category: record.category.clone(),
            type_: resolved.type_,
            types: resolved.types,
            predicates: RwLock::new(resolved.predicates),
            validated: true,
            record: Some(record),
            asserted,
        }
    }

    pub(crate) fn unresolved(id: Identifier, asserted: TermFields) -> Self {
        Self {
            id,
            label: None,
            labels: Vec::new(),
            definition: None,
            synonyms: Vec::new(),
            deprecated: None,
            category: None,
            type_: None,
            types: Vec::new(),
            predicates: RwLock::new(BTreeMap::new()),
            validated: false,
            record: None,
            asserted,
        }
    }

    #[must_use]
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    #[must_use]
    pub fn iri(&self) -> &str {
        self.id.iri()
    }

    #[must_use]
    pub fn curie(&self) -> Option<String> {
        self.id.curie()
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.id.prefix()
    }

    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.id.suffix()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    #[must_use]
    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    #[must_use]
    pub fn deprecated(&self) -> Option<bool> {
        self.deprecated
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn term_type(&self) -> Option<&PredicateValue> {
        self.type_.as_ref()
    }

    #[must_use]
    pub fn types(&self) -> &[PredicateValue] {
        &self.types
    }

    /// True only when a backend confirmed the record.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// The record this term was built from.
    #[must_use]
    pub fn record(&self) -> Option<&QueryResult> {
        self.record.as_ref()
    }

    /// Fields supplied by the caller at construction time.
    #[must_use]
    pub fn asserted(&self) -> &TermFields {
        &self.asserted
    }

    /// Snapshot of the predicates fetched so far.
    #[must_use]
    pub fn predicates(&self) -> BTreeMap<String, Vec<PredicateValue>> {
        self.predicates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Values fetched for a single predicate, empty when unknown.
    #[must_use]
    pub fn predicate(&self, predicate: &str) -> Vec<PredicateValue> {
        self.predicates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(predicate)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn merge_predicates(&self, values: BTreeMap<String, Vec<PredicateValue>>) {
        self.predicates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(values);
    }

    fn render(&self, f: &mut Formatter<'_>, style: DisplayStyle) -> fmt::Result {
        self.id.render(f, style)?;
        match (style, self.label.as_deref()) {
            (DisplayStyle::CurieLabel, Some(label)) => write!(f, ", {label}"),
            (DisplayStyle::Full, label) => write!(
                f,
                ", {}, {}",
                label.unwrap_or("None"),
                if self.validated {
                    "validated"
                } else {
                    "unvalidated"
                }
            ),
            _ => Ok(()),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.render(f, display::take())
    }
}
