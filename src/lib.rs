#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
//! Resolve compact identifiers (`UBERON:0000955`) and IRIs into validated
//! vocabulary terms across a ranked list of term services.

pub use self::errors::Error;

pub mod config;
pub mod errors;
pub mod logger;
pub mod ontology;

/// Application results options list
pub type Result<T, E = Error> = std::result::Result<T, E>;
