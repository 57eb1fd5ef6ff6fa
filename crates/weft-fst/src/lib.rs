//! Weighted finite-state automaton and transducer engine.
//!
//! A pipeline from regular expressions to evaluable machines, generic over
//! the semiring the weights live in:
//!
//! - [`regex`]: pattern text to syntax tree
//! - [`builder`]: syntax tree to automaton, plus the set-algebra
//!   combinators (union, concatenation, closure, cross product,
//!   intersection, difference)
//! - [`determinize`]: epsilon removal and subset construction
//! - [`minimize`]: trimming and Hopcroft partition refinement
//! - [`compose`]: transducer composition with epsilon filtering
//! - [`eval`]: acceptance, best-first transduction, shortest path and
//!   language enumeration
//!
//! The semiring is a type parameter of [`Fst`], so machines over different
//! weight structures cannot be combined by construction.
//!
//! ```
//! use weft_core::semiring::Tropical;
//! use weft_fst::{compile, determinize::determinize, eval};
//!
//! let fst = compile::<Tropical>("a<1.0>|ab<0.4>").unwrap();
//! let det = determinize(&fst);
//! assert!(eval::accepts(&det, "ab"));
//! let (path, weight) = eval::shortest_path(&det).unwrap();
//! assert_eq!(path, vec!["a".to_string(), "b".to_string()]);
//! assert_eq!(weight, Tropical::new(0.4));
//! ```

pub mod builder;
pub mod compose;
pub mod determinize;
pub mod eval;
pub mod graph;
pub mod minimize;
pub mod regex;

pub use graph::{Fst, FstProps, State, StateId, Transition, TransitionRow};
pub use regex::Ast;
pub use weft_core::error::FstError;
pub use weft_core::semiring::{Boolean, NaturalOrder, Probability, Semiring, Tropical};
pub use weft_core::symbols::{SymbolId, SymbolTable};

/// Parse a pattern and construct its automaton in one step.
pub fn compile<W: Semiring>(pattern: &str) -> Result<Fst<W>, FstError> {
    let ast = regex::parse(pattern)?;
    builder::build(&ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_reports_parse_errors_with_offsets() {
        let err = compile::<Boolean>("a|*").unwrap_err();
        assert!(matches!(err, FstError::Parse { offset: 2, .. }));
    }

    #[test]
    fn compile_builds_an_evaluable_machine() {
        let fst = compile::<Boolean>("colou?r").unwrap();
        assert!(eval::accepts(&fst, "color"));
        assert!(eval::accepts(&fst, "colour"));
        assert!(!eval::accepts(&fst, "colr"));
    }
}
