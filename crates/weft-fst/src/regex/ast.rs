// Abstract syntax of patterns, produced by the parser and consumed by the
// automaton builder.

/// A parsed pattern. Operator nodes are binary; n-ary forms in the surface
/// syntax fold left during parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// The empty-string automaton (`()`, an empty pattern, or `''`).
    Epsilon,
    /// A single symbol, possibly multi-character when quoted.
    Symbol(String),
    /// A symbol class: `[abc]` or `[a-z0-9]`, expanded to its members.
    Class(Vec<String>),
    Concat(Box<Ast>, Box<Ast>),
    Union(Box<Ast>, Box<Ast>),
    Intersect(Box<Ast>, Box<Ast>),
    Difference(Box<Ast>, Box<Ast>),
    /// Transducer cross product `x:y`.
    Cross(Box<Ast>, Box<Ast>),
    Star(Box<Ast>),
    Plus(Box<Ast>),
    Optional(Box<Ast>),
    /// Bounded repetition `{m}`, `{m,}` or `{m,n}`.
    Repeat { node: Box<Ast>, min: u32, max: Option<u32> },
    /// Weight annotation `<w>`: multiplies the operand's final weights.
    Weight(Box<Ast>, f64),
}
