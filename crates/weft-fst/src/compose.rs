// Transducer composition with the three-state epsilon filter.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use weft_core::error::FstError;
use weft_core::semiring::Semiring;
use weft_core::symbols::SymbolId;

use crate::graph::{Fst, StateId, Transition};

// Filter states track which side last advanced alone on epsilon, so each
// interleaving of free moves between two matches contributes exactly one
// path: paired moves reset to 0, a solo move by the left operand goes to 1
// and blocks solo right moves, and vice versa for 2.
const FILTER_NONE: u8 = 0;
const FILTER_LEFT: u8 = 1;
const FILTER_RIGHT: u8 = 2;

/// Compose two transducers: the relation mapping `x` to `z` whenever `a`
/// maps `x` to some `y` and `b` maps that `y` to `z`. Weights along matched
/// paths combine with the semiring product, and alternatives with the sum.
///
/// Fails with [`FstError::AlphabetMismatch`] when both machines have
/// non-empty alphabets on the shared tape but no symbol in common, which
/// always composes to the machine relating nothing.
pub fn compose<W: Semiring>(a: &Fst<W>, b: &Fst<W>) -> Result<Fst<W>, FstError> {
    run(a, b, None)
}

/// [`compose`] with a cap on the number of constructed product states.
pub fn compose_bounded<W: Semiring>(
    a: &Fst<W>,
    b: &Fst<W>,
    limit: usize,
) -> Result<Fst<W>, FstError> {
    run(a, b, Some(limit))
}

type Triple = (StateId, StateId, u8);

fn run<W: Semiring>(
    a: &Fst<W>,
    b: &Fst<W>,
    limit: Option<usize>,
) -> Result<Fst<W>, FstError> {
    let mut table = a.symbols().clone();
    let map_b = table.merge(b.symbols());

    let a_out: HashSet<SymbolId> = a.output_alphabet().into_iter().collect();
    let b_in: HashSet<SymbolId> = b
        .input_alphabet()
        .into_iter()
        .map(|s| map_b[s.index()])
        .collect();
    if !a_out.is_empty() && !b_in.is_empty() && a_out.is_disjoint(&b_in) {
        return Err(FstError::AlphabetMismatch {
            context: "left output alphabet and right input alphabet share no symbol"
                .to_string(),
        });
    }

    let mut out = Fst::new(table);
    let mut triples: HashMap<Triple, StateId> = HashMap::new();
    let mut queue: VecDeque<Triple> = VecDeque::new();
    let start = (a.start(), b.start(), FILTER_NONE);
    triples.insert(start, out.start());
    queue.push_back(start);

    while let Some((qa, qb, filter)) = queue.pop_front() {
        let src = triples[&(qa, qb, filter)];
        if let (Some(fa), Some(fb)) =
            (a.state(qa).final_weight, b.state(qb).final_weight)
        {
            out.set_final(src, fa.times(fb));
        }

        for x in &a.state(qa).arcs {
            let xo = x.out_symbol();

            if xo.is_epsilon() && filter != FILTER_RIGHT {
                // left advances alone, consuming input and writing nothing
                let target = triple_state(
                    &mut out,
                    &mut triples,
                    &mut queue,
                    (x.target, qb, FILTER_LEFT),
                    limit,
                )?;
                out.add_transition(
                    src,
                    Transition {
                        input: x.input,
                        output: if x.input.is_epsilon() {
                            None
                        } else {
                            Some(SymbolId::EPSILON)
                        },
                        target,
                        weight: x.weight,
                    },
                );
            }

            for y in &b.state(qb).arcs {
                let yi = map_b[y.input.index()];
                let yo = map_b[y.out_symbol().index()];
                let paired_eps =
                    xo.is_epsilon() && yi.is_epsilon() && filter == FILTER_NONE;
                let matched = !xo.is_epsilon() && xo == yi;
                if !paired_eps && !matched {
                    continue;
                }
                let target = triple_state(
                    &mut out,
                    &mut triples,
                    &mut queue,
                    (x.target, y.target, FILTER_NONE),
                    limit,
                )?;
                out.add_transition(
                    src,
                    Transition {
                        input: x.input,
                        output: if yo == x.input { None } else { Some(yo) },
                        target,
                        weight: x.weight.times(y.weight),
                    },
                );
            }
        }

        for y in &b.state(qb).arcs {
            let yi = map_b[y.input.index()];
            if yi.is_epsilon() && filter != FILTER_LEFT {
                // right advances alone, consuming nothing and writing output
                let yo = map_b[y.out_symbol().index()];
                let target = triple_state(
                    &mut out,
                    &mut triples,
                    &mut queue,
                    (qa, y.target, FILTER_RIGHT),
                    limit,
                )?;
                out.add_transition(
                    src,
                    Transition {
                        input: SymbolId::EPSILON,
                        output: if yo.is_epsilon() { None } else { Some(yo) },
                        target,
                        weight: y.weight,
                    },
                );
            }
        }
    }
    Ok(out)
}

fn triple_state<W: Semiring>(
    out: &mut Fst<W>,
    triples: &mut HashMap<Triple, StateId>,
    queue: &mut VecDeque<Triple>,
    triple: Triple,
    limit: Option<usize>,
) -> Result<StateId, FstError> {
    if let Some(&id) = triples.get(&triple) {
        return Ok(id);
    }
    if let Some(limit) = limit {
        if triples.len() >= limit {
            return Err(FstError::StateLimitExceeded { limit });
        }
    }
    let id = out.add_state();
    triples.insert(triple, id);
    queue.push_back(triple);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::eval::apply;
    use weft_core::semiring::{Boolean, Tropical};

    fn outputs<W: weft_core::semiring::NaturalOrder>(
        fst: &Fst<W>,
        input: &str,
    ) -> Vec<String> {
        let mut v: Vec<String> = apply(fst, input, 10_000).map(|(s, _)| s).collect();
        v.sort();
        v.dedup();
        v
    }

    #[test]
    fn chains_two_rewrites() {
        let first: Fst<Boolean> = compile("a:x").unwrap();
        let second: Fst<Boolean> = compile("x:y").unwrap();
        let chained = compose(&first, &second).unwrap();
        assert_eq!(outputs(&chained, "a"), vec!["y".to_string()]);
        assert!(outputs(&chained, "x").is_empty());
    }

    #[test]
    fn identity_on_the_right_preserves_the_relation() {
        let rel: Fst<Boolean> = compile("(a:x)(b:y)").unwrap();
        let identity: Fst<Boolean> = compile("(x|y)*").unwrap();
        let composed = compose(&rel, &identity).unwrap();
        assert_eq!(outputs(&composed, "ab"), vec!["xy".to_string()]);
    }

    #[test]
    fn epsilon_filter_counts_each_derivation_once() {
        // the left deletes a symbol while the right inserts one; the filter
        // admits one interleaving, so the single derivation appears once
        let left: Fst<Tropical> = compile("(a:'')b").unwrap();
        let right: Fst<Tropical> = compile("('':x)b").unwrap();
        let composed = compose(&left, &right).unwrap();
        let results: Vec<(String, Tropical)> = apply(&composed, "ab", 10_000).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "xb");
    }

    #[test]
    fn weights_multiply_along_matched_paths() {
        let left: Fst<Tropical> = compile("a:x<1.0>").unwrap();
        let right: Fst<Tropical> = compile("x:y<2.0>").unwrap();
        let composed = compose(&left, &right).unwrap();
        let results: Vec<(String, Tropical)> = apply(&composed, "a", 10_000).collect();
        assert_eq!(results[0].1, Tropical::new(3.0));
    }

    #[test]
    fn disjoint_shared_alphabets_are_rejected() {
        let left: Fst<Boolean> = compile("a:x").unwrap();
        let right: Fst<Boolean> = compile("q:r").unwrap();
        assert!(matches!(
            compose(&left, &right),
            Err(FstError::AlphabetMismatch { .. })
        ));
    }

    #[test]
    fn empty_shared_tape_is_allowed() {
        // a machine with no arcs has an empty alphabet; compose succeeds
        // and relates nothing
        let left: Fst<Boolean> = compile("a:x").unwrap();
        let right: Fst<Boolean> = compile("''").unwrap();
        let composed = compose(&left, &right).unwrap();
        assert!(outputs(&composed, "a").is_empty());
    }

    #[test]
    fn product_state_limit() {
        let left: Fst<Boolean> = compile("(a:x)*").unwrap();
        let right: Fst<Boolean> = compile("(x:y)*").unwrap();
        assert!(matches!(
            compose_bounded(&left, &right, 1),
            Err(FstError::StateLimitExceeded { limit: 1 })
        ));
        assert!(compose_bounded(&left, &right, 10_000).is_ok());
    }
}
