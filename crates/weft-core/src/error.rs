// Error taxonomy shared by the regex parser and the graph algorithms.

/// Error type for pattern compilation and automaton algebra.
///
/// Every operation in the engine is a pure, deterministic computation; the
/// only failure modes are malformed input and contract violations by the
/// caller, so there is no retry story anywhere. Mixing weight algebras is
/// not represented here: operands of every binary operation share a single
/// `W: Semiring` type parameter, so a semiring mismatch fails to compile
/// instead of failing at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FstError {
    /// Malformed pattern. `offset` is the byte offset of the offending
    /// character in the original pattern string. No partial automaton is
    /// ever constructed for a pattern that fails to parse.
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// The operand alphabets are incompatible for the requested operation
    /// (for composition: the shared tapes have no symbol in common).
    #[error("alphabet mismatch: {context}")]
    AlphabetMismatch { context: String },

    /// An operation requiring deterministic, epsilon-free input was given a
    /// nondeterministic automaton and does not determinize on its own.
    #[error("{operation} requires a deterministic, epsilon-free automaton")]
    NonDeterministicPrecondition { operation: &'static str },

    /// An acceptor-only operation (intersection, difference, cross product)
    /// was given a transducer operand.
    #[error("{operation} is defined on acceptors, not transducers")]
    NotAnAcceptor { operation: &'static str },

    /// A bounded exploration (subset construction, product construction)
    /// created more states than the caller-supplied limit allows.
    #[error("exploration exceeded the configured limit of {limit} states")]
    StateLimitExceeded { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = FstError::Parse {
            message: "unbalanced parenthesis".to_string(),
            offset: 4,
        };
        assert_eq!(err.to_string(), "parse error at offset 4: unbalanced parenthesis");

        let err = FstError::NonDeterministicPrecondition { operation: "minimize" };
        assert!(err.to_string().contains("minimize"));

        let err = FstError::StateLimitExceeded { limit: 1000 };
        assert!(err.to_string().contains("1000"));
    }
}
