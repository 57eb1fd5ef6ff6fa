//! Shared leaf types for the weft finite-state toolkit.
//!
//! This crate holds everything the automaton engine and its callers have in
//! common but that carries no graph algorithms of its own:
//!
//! - [`semiring`] -- The weight algebra: the [`Semiring`] trait and the
//!   boolean, tropical and probability instances
//! - [`symbols`] -- Session-scoped symbol interning and input tokenization
//! - [`error`] -- The error taxonomy shared by parser and graph algorithms

pub mod error;
pub mod semiring;
pub mod symbols;

pub use error::FstError;
pub use semiring::{Boolean, NaturalOrder, Probability, Semiring, Tropical};
pub use symbols::{SymbolId, SymbolTable};
