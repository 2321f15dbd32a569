//! Fixed record types with one accessor per predicate.
//!
//! [`predicate_record!`](crate::predicate_record) declares the struct ahead of
//! time from a known predicate set; `from_term` fills every field with a
//! single predicate fetch.

/// Declares a struct holding a term and the values of a fixed predicate set.
///
/// Each `field => "curie"` pair becomes a field and an accessor returning the
/// fetched values, empty when the backend has none. The generated type also
/// exposes `PREDICATES`, `from_term(&TermResolver, Arc<Term>)` and `term()`.
#[macro_export]
macro_rules! predicate_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field:ident => $predicate:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name {
            term: ::std::sync::Arc<$crate::ontology::Term>,
            $( $field: ::std::vec::Vec<$crate::ontology::PredicateValue>, )*
        }

        impl $name {
            /// Predicates fetched by `from_term`, in declaration order.
            pub const PREDICATES: &'static [&'static str] = &[$($predicate),*];

            /// Fetches every declared predicate for `term` and merges them
            /// into it.
            ///
            /// # Errors
            ///
            /// Query validation errors from the resolver.
            pub fn from_term(
                resolver: &$crate::ontology::TermResolver,
                term: ::std::sync::Arc<$crate::ontology::Term>,
            ) -> ::std::result::Result<Self, $crate::ontology::TermError> {
                #[allow(unused_mut, unused_variables)]
                let mut fetched = resolver.fetch_predicates(&term, Self::PREDICATES)?;
                Ok(Self {
                    $(
                        $field: fetched
                            .remove(&resolver.dispatcher().predicate_key($predicate))
                            .unwrap_or_default(),
                    )*
                    term,
                })
            }

            #[must_use]
            pub fn term(&self) -> &::std::sync::Arc<$crate::ontology::Term> {
                &self.term
            }

            $(
                $(#[$field_meta])*
                #[must_use]
                pub fn $field(&self) -> &[$crate::ontology::PredicateValue] {
                    &self.$field
                }
            )*
        }
    };
}
