//! Curie registry, identifier normalization and ranked term resolution.
//!
//! Layers, bottom-up:
//! - [`namespaces`] and [`curies`]: namespace trie and the prefix registry
//!   built on it.
//! - [`value_objects`]: [`Identifier`], the canonical IRI value type.
//! - [`repositories`] and [`entities`]: the [`TermService`] contract, the
//!   [`Query`] it receives and the [`QueryResult`]/[`Term`] records.
//! - [`service`]: the first-match-wins [`QueryDispatcher`].
//! - [`resolver`]: validation, caching and predicate expansion of terms.

pub mod complete;
pub mod curies;
pub mod display;
pub mod entities;
#[cfg(feature = "memory_service")]
pub mod memory;
pub mod namespaces;
pub mod repositories;
pub mod resolver;
pub mod service;
pub mod value_objects;

pub use curies::{default_prefixes, CurieRegistry, RegistryError};
pub use display::DisplayStyle;
pub use entities::{PredicateValue, QueryResult, QueryResultBuilder, RecordValue, Term, TermFields};
#[cfg(feature = "memory_service")]
pub use memory::MemoryService;
pub use namespaces::{split_iri, NamespaceTrie};
pub use repositories::{Direction, Query, QueryResults, ServiceError, ServiceHandle, TermService};
pub use resolver::{
    ExpandOptions, Expansion, PreferredTerm, TermCache, TermError, TermResolver, TermSpec,
    PREFERRED_ID, REPLACED_BY,
};
pub use service::{Dispatch, QueryDispatcher, QueryError};
pub use value_objects::{IdSpec, Identifier, IdentifierError};
