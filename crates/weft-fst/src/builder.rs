// Operator-specific automaton construction: compiling the syntax tree and
// the public set-algebra combinators.
//
// Every combinator builds a fresh automaton; operands are never mutated or
// aliased. `intersect`, `difference` and `cross_product` determinize their
// operands transparently (fixed policy -- they never raise
// `NonDeterministicPrecondition`; `minimize` is the operation that reports
// the violation instead of repairing it).

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use weft_core::error::FstError;
use weft_core::semiring::Semiring;
use weft_core::symbols::{SymbolId, SymbolTable};

use crate::determinize::determinize;
use crate::graph::{Fst, FstProps, StateId, Transition};
use crate::regex::Ast;

/// Compile a syntax tree into an automaton. Pure: the only observable
/// effect is the returned graph.
pub(crate) fn build<W: Semiring>(ast: &Ast) -> Result<Fst<W>, FstError> {
    match ast {
        Ast::Epsilon => Ok(epsilon_fst()),
        Ast::Symbol(symbol) => Ok(symbol_fst(symbol)),
        Ast::Class(members) => Ok(class_fst(members)),
        Ast::Concat(a, b) => Ok(concatenate(&build(a)?, &build(b)?)),
        Ast::Union(a, b) => Ok(union(&build(a)?, &build(b)?)),
        Ast::Intersect(a, b) => intersect(&build(a)?, &build(b)?),
        Ast::Difference(a, b) => difference(&build(a)?, &build(b)?),
        Ast::Cross(a, b) => cross_product(&build(a)?, &build(b)?),
        Ast::Star(a) => Ok(star(&build(a)?)),
        Ast::Plus(a) => Ok(plus(&build(a)?)),
        Ast::Optional(a) => Ok(optional(&build(a)?)),
        Ast::Repeat { node, min, max } => Ok(repeat(&build(node)?, *min, *max)),
        Ast::Weight(a, value) => Ok(weighted(&build(a)?, W::from_literal(*value))),
    }
}

fn eps_arc<W: Semiring>(target: StateId, weight: W) -> Transition<W> {
    Transition { input: SymbolId::EPSILON, output: None, target, weight }
}

/// The single-state automaton accepting only the empty string.
pub fn epsilon_fst<W: Semiring>() -> Fst<W> {
    let mut fst = Fst::new(SymbolTable::new());
    let start = fst.start();
    fst.set_final(start, W::one());
    fst
}

/// The two-state automaton accepting exactly `symbol`.
pub fn symbol_fst<W: Semiring>(symbol: &str) -> Fst<W> {
    if symbol.is_empty() {
        return epsilon_fst();
    }
    let mut table = SymbolTable::new();
    let id = table.intern(symbol);
    let mut fst = Fst::new(table);
    let end = fst.add_state();
    fst.add_transition(
        fst.start(),
        Transition { input: id, output: None, target: end, weight: W::one() },
    );
    fst.set_final(end, W::one());
    fst
}

/// A two-state automaton accepting any one of the class members.
pub fn class_fst<W: Semiring>(members: &[String]) -> Fst<W> {
    let mut table = SymbolTable::new();
    let ids: Vec<SymbolId> = members.iter().map(|m| table.intern(m)).collect();
    let mut fst = Fst::new(table);
    let end = fst.add_state();
    for id in ids {
        if id.is_epsilon() {
            continue;
        }
        fst.add_transition(
            fst.start(),
            Transition { input: id, output: None, target: end, weight: W::one() },
        );
    }
    fst.set_final(end, W::one());
    fst
}

/// Union: a new start state with epsilon arcs to both operand starts, and
/// both operands' finals routed to a shared final through epsilon arcs
/// carrying the final weights.
pub fn union<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Fst<W> {
    let mut out = Fst::new(SymbolTable::new());
    let start = out.start();
    let map_a = out.splice(a);
    let map_b = out.splice(b);
    out.add_transition(start, eps_arc(map_a[a.start().index()], W::one()));
    out.add_transition(start, eps_arc(map_b[b.start().index()], W::one()));

    let shared = out.add_state();
    for (s, w) in a.final_states() {
        let mapped = map_a[s.index()];
        out.take_final(mapped);
        out.add_transition(mapped, eps_arc(shared, w));
    }
    for (s, w) in b.final_states() {
        let mapped = map_b[s.index()];
        out.take_final(mapped);
        out.add_transition(mapped, eps_arc(shared, w));
    }
    out.set_final(shared, W::one());
    out
}

/// Concatenation: operand A's finals join operand B's start through
/// epsilon arcs carrying A's final weights.
pub fn concatenate<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Fst<W> {
    let mut out = Fst::empty(SymbolTable::new());
    let map_a = out.splice(a);
    let map_b = out.splice(b);
    out.set_start(map_a[a.start().index()]);
    let b_start = map_b[b.start().index()];
    for (s, w) in a.final_states() {
        let mapped = map_a[s.index()];
        out.take_final(mapped);
        out.add_transition(mapped, eps_arc(b_start, w));
    }
    out
}

/// Kleene star: a fresh hub state that is both start and final (the
/// zero-weight skip path), with epsilon arcs into the body and from the
/// body's finals back to the hub.
pub fn star<W: Semiring>(a: &Fst<W>) -> Fst<W> {
    let mut out = Fst::new(SymbolTable::new());
    let hub = out.start();
    let map = out.splice(a);
    out.add_transition(hub, eps_arc(map[a.start().index()], W::one()));
    for (s, w) in a.final_states() {
        let mapped = map[s.index()];
        out.take_final(mapped);
        out.add_transition(mapped, eps_arc(hub, w));
    }
    out.set_final(hub, W::one());
    out
}

/// One or more repetitions: the body followed by its star. Unlike `star`
/// and `optional` there is no zero-weight skip path.
pub fn plus<W: Semiring>(a: &Fst<W>) -> Fst<W> {
    concatenate(a, &star(a))
}

/// Zero or one repetition.
pub fn optional<W: Semiring>(a: &Fst<W>) -> Fst<W> {
    union(a, &epsilon_fst())
}

/// Bounded repetition: `min` concatenated copies followed by either a star
/// (`{m,}`) or `max - min` optional copies (`{m,n}`).
pub fn repeat<W: Semiring>(a: &Fst<W>, min: u32, max: Option<u32>) -> Fst<W> {
    let mut out = epsilon_fst();
    for _ in 0..min {
        out = concatenate(&out, a);
    }
    match max {
        None => concatenate(&out, &star(a)),
        Some(max) => {
            let opt = optional(a);
            for _ in min..max {
                out = concatenate(&out, &opt);
            }
            out
        }
    }
}

/// Weight annotation: multiply every final weight by `weight` in the
/// semiring's product.
pub fn weighted<W: Semiring>(a: &Fst<W>, weight: W) -> Fst<W> {
    let mut out = a.clone();
    for (s, fw) in a.final_states() {
        out.set_final(s, fw.times(weight));
    }
    out.set_props(FstProps { minimal: false, ..a.props() });
    out
}

fn product_state<W: Semiring, K: Copy + Eq + std::hash::Hash>(
    out: &mut Fst<W>,
    map: &mut HashMap<K, StateId>,
    queue: &mut VecDeque<K>,
    key: K,
) -> StateId {
    if let Some(&id) = map.get(&key) {
        return id;
    }
    let id = out.add_state();
    map.insert(key, id);
    queue.push_back(key);
    id
}

/// When both operands have a non-empty alphabet but share no symbol, the
/// product is the machine accepting nothing and the caller almost
/// certainly mixed up its machines.
fn ensure_shared_alphabet<W: Semiring>(
    da: &Fst<W>,
    db: &Fst<W>,
    map_b: &[SymbolId],
    operation: &str,
) -> Result<(), FstError> {
    let left: HashSet<SymbolId> = da.input_alphabet().into_iter().collect();
    let right: HashSet<SymbolId> = db
        .input_alphabet()
        .into_iter()
        .map(|s| map_b[s.index()])
        .collect();
    if !left.is_empty() && !right.is_empty() && left.is_disjoint(&right) {
        return Err(FstError::AlphabetMismatch {
            context: format!("{operation} operands share no alphabet symbol"),
        });
    }
    Ok(())
}

// Alignment phases for the cross product. Pairing happens first; once a
// side starts consuming against epsilon padding the pairing phase is over,
// so every (input, output) string pair keeps exactly one alignment: pairs,
// then the leftover of whichever side is longer.
const ALIGN_PAIRING: u8 = 0;
const ALIGN_PAD_LEFT: u8 = 1;
const ALIGN_PAD_RIGHT: u8 = 2;

/// Cross product of two acceptors: the relation pairing any string of `a`
/// with any string of `b`, aligned symbol by symbol with epsilon padding
/// once the shorter side has been consumed. Operands are determinized
/// first so each string has a single path, and the phase discipline admits
/// a single alignment per string pair.
pub fn cross_product<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Result<Fst<W>, FstError> {
    if a.is_transducer() || b.is_transducer() {
        return Err(FstError::NotAnAcceptor { operation: "cross product" });
    }
    let da = determinize(a);
    let db = determinize(b);
    let mut table = da.symbols().clone();
    let map_b = table.merge(db.symbols());
    let mut out = Fst::new(table);

    type Key = (StateId, StateId, u8);
    let mut triples: HashMap<Key, StateId> = HashMap::new();
    let mut queue: VecDeque<Key> = VecDeque::new();
    let start = (da.start(), db.start(), ALIGN_PAIRING);
    triples.insert(start, out.start());
    queue.push_back(start);

    while let Some(key @ (qa, qb, phase)) = queue.pop_front() {
        let src = triples[&key];
        let fa = da.state(qa).final_weight;
        let fb = db.state(qb).final_weight;
        if let (Some(fa), Some(fb)) = (fa, fb) {
            out.set_final(src, fa.times(fb));
        }

        // paired symbols, only while neither side has been padded
        if phase == ALIGN_PAIRING {
            for x in &da.state(qa).arcs {
                for y in &db.state(qb).arcs {
                    let output_sym = map_b[y.input.index()];
                    let target = product_state(
                        &mut out,
                        &mut triples,
                        &mut queue,
                        (x.target, y.target, ALIGN_PAIRING),
                    );
                    out.add_transition(
                        src,
                        Transition {
                            input: x.input,
                            output: if output_sym == x.input {
                                None
                            } else {
                                Some(output_sym)
                            },
                            target,
                            weight: x.weight.times(y.weight),
                        },
                    );
                }
            }
        }

        // the longer side runs out its tail against epsilon
        if fb.is_some() && phase != ALIGN_PAD_RIGHT {
            for x in &da.state(qa).arcs {
                let target = product_state(
                    &mut out,
                    &mut triples,
                    &mut queue,
                    (x.target, qb, ALIGN_PAD_LEFT),
                );
                out.add_transition(
                    src,
                    Transition {
                        input: x.input,
                        output: Some(SymbolId::EPSILON),
                        target,
                        weight: x.weight,
                    },
                );
            }
        }
        if fa.is_some() && phase != ALIGN_PAD_LEFT {
            for y in &db.state(qb).arcs {
                let output_sym = map_b[y.input.index()];
                let target = product_state(
                    &mut out,
                    &mut triples,
                    &mut queue,
                    (qa, y.target, ALIGN_PAD_RIGHT),
                );
                out.add_transition(
                    src,
                    Transition {
                        input: SymbolId::EPSILON,
                        output: Some(output_sym),
                        target,
                        weight: y.weight,
                    },
                );
            }
        }
    }
    Ok(out)
}

/// Intersection of two acceptors by synchronized product exploration over
/// reachable state pairs. Operands are determinized first. Fails with
/// [`FstError::AlphabetMismatch`] when the operands' non-empty alphabets
/// are disjoint.
pub fn intersect<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Result<Fst<W>, FstError> {
    if a.is_transducer() || b.is_transducer() {
        return Err(FstError::NotAnAcceptor { operation: "intersection" });
    }
    let da = determinize(a);
    let db = determinize(b);
    let mut table = da.symbols().clone();
    let map_b = table.merge(db.symbols());
    ensure_shared_alphabet(&da, &db, &map_b, "intersection")?;
    let mut out = Fst::new(table);

    let mut pairs: HashMap<(StateId, StateId), StateId> = HashMap::new();
    let mut queue: VecDeque<(StateId, StateId)> = VecDeque::new();
    pairs.insert((da.start(), db.start()), out.start());
    queue.push_back((da.start(), db.start()));

    while let Some((qa, qb)) = queue.pop_front() {
        let src = pairs[&(qa, qb)];
        if let (Some(fa), Some(fb)) =
            (da.state(qa).final_weight, db.state(qb).final_weight)
        {
            out.set_final(src, fa.times(fb));
        }
        for x in &da.state(qa).arcs {
            let matching = db
                .state(qb)
                .arcs
                .iter()
                .find(|y| map_b[y.input.index()] == x.input);
            if let Some(y) = matching {
                let target =
                    product_state(&mut out, &mut pairs, &mut queue, (x.target, y.target));
                out.add_transition(
                    src,
                    Transition {
                        input: x.input,
                        output: None,
                        target,
                        weight: x.weight.times(y.weight),
                    },
                );
            }
        }
    }
    out.set_props(FstProps { deterministic: true, epsilon_free: true, minimal: false });
    Ok(out)
}

/// Difference of two acceptors: strings of `a` not accepted by `b`, with
/// `a`'s weights. Operands are determinized first; the right side is
/// completed with a virtual non-final sink (`None`) so pruning is sound.
/// Like [`intersect`], disjoint non-empty alphabets are rejected with
/// [`FstError::AlphabetMismatch`].
pub fn difference<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Result<Fst<W>, FstError> {
    if a.is_transducer() || b.is_transducer() {
        return Err(FstError::NotAnAcceptor { operation: "difference" });
    }
    let da = determinize(a);
    let db = determinize(b);
    let mut table = da.symbols().clone();
    let map_b = table.merge(db.symbols());
    ensure_shared_alphabet(&da, &db, &map_b, "difference")?;
    let mut out = Fst::new(table);

    type Key = (StateId, Option<StateId>);
    let mut pairs: HashMap<Key, StateId> = HashMap::new();
    let mut queue: VecDeque<Key> = VecDeque::new();
    pairs.insert((da.start(), Some(db.start())), out.start());
    queue.push_back((da.start(), Some(db.start())));

    while let Some((qa, qb)) = queue.pop_front() {
        let src = pairs[&(qa, qb)];
        let b_final = qb.is_some_and(|s| db.state(s).is_final());
        if let Some(fa) = da.state(qa).final_weight {
            if !b_final {
                out.set_final(src, fa);
            }
        }
        for x in &da.state(qa).arcs {
            let b_target = qb.and_then(|s| {
                db.state(s)
                    .arcs
                    .iter()
                    .find(|y| map_b[y.input.index()] == x.input)
                    .map(|y| y.target)
            });
            let key = (x.target, b_target);
            let target = match pairs.get(&key) {
                Some(&id) => id,
                None => {
                    let id = out.add_state();
                    pairs.insert(key, id);
                    queue.push_back(key);
                    id
                }
            };
            out.add_transition(
                src,
                Transition { input: x.input, output: None, target, weight: x.weight },
            );
        }
    }
    out.set_props(FstProps { deterministic: true, epsilon_free: true, minimal: false });
    Ok(out)
}
