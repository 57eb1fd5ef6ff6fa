// Hopcroft partition refinement over trimmed deterministic machines.

use std::collections::VecDeque;

use hashbrown::HashSet;
use weft_core::error::FstError;
use weft_core::semiring::Semiring;
use weft_core::symbols::SymbolId;

use crate::graph::{Fst, FstProps, StateId, Transition};

/// Minimize a deterministic machine: trim states that are unreachable or
/// cannot reach a final state, then merge equivalent states by partition
/// refinement.
///
/// The determinism precondition is checked structurally, not from the
/// status flags, so a hand-built automaton that happens to be deterministic
/// is accepted. Arcs are distinguished by input symbol, output symbol and
/// weight together, so states are merged only when their outgoing behavior
/// matches exactly; transducers and weighted machines keep every label
/// pair and weight intact.
pub fn minimize<W: Semiring>(fst: &Fst<W>) -> Result<Fst<W>, FstError> {
    if !fst.is_deterministic() {
        return Err(FstError::NonDeterministicPrecondition { operation: "minimize" });
    }

    let n = fst.num_states();

    // accessible from the start
    let mut accessible = vec![false; n];
    let mut queue: VecDeque<StateId> = VecDeque::new();
    accessible[fst.start().index()] = true;
    queue.push_back(fst.start());
    while let Some(s) = queue.pop_front() {
        for arc in &fst.state(s).arcs {
            if !accessible[arc.target.index()] {
                accessible[arc.target.index()] = true;
                queue.push_back(arc.target);
            }
        }
    }

    // coaccessible to some final state, over the reversed graph
    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); n];
    for s in fst.state_ids() {
        for arc in &fst.state(s).arcs {
            reverse[arc.target.index()].push(s.index());
        }
    }
    let mut coaccessible = vec![false; n];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (s, _) in fst.final_states() {
        coaccessible[s.index()] = true;
        queue.push_back(s.index());
    }
    while let Some(s) = queue.pop_front() {
        for &p in &reverse[s] {
            if !coaccessible[p] {
                coaccessible[p] = true;
                queue.push_back(p);
            }
        }
    }

    let keep: Vec<bool> =
        (0..n).map(|i| accessible[i] && coaccessible[i]).collect();
    if !keep[fst.start().index()] {
        // empty language: the canonical single non-final start state
        let mut out = Fst::new(fst.symbols().clone());
        out.set_props(FstProps { deterministic: true, epsilon_free: true, minimal: true });
        return Ok(out);
    }

    // dense renumbering of the kept states
    let mut dense_of: Vec<Option<usize>> = vec![None; n];
    let mut kept: Vec<StateId> = Vec::new();
    for s in fst.state_ids() {
        if keep[s.index()] {
            dense_of[s.index()] = Some(kept.len());
            kept.push(s);
        }
    }
    let nk = kept.len();

    // label universe: (input, output, weight) triples, compared exactly
    type Label<W> = (SymbolId, Option<SymbolId>, W);
    let mut labels: Vec<Label<W>> = Vec::new();
    let mut label_of = |labels: &mut Vec<Label<W>>, arc: &Transition<W>| -> usize {
        let key = (arc.input, arc.output, arc.weight);
        match labels.iter().position(|l| *l == key) {
            Some(i) => i,
            None => {
                labels.push(key);
                labels.len() - 1
            }
        }
    };

    // inverse transition index: inv[label][target] -> sources
    let mut arcs_of: Vec<Vec<(usize, usize)>> = vec![Vec::new(); nk]; // (label, target)
    for (dense, &old) in kept.iter().enumerate() {
        for arc in &fst.state(old).arcs {
            let Some(target) = dense_of[arc.target.index()] else {
                continue; // arc into a trimmed state is dead
            };
            let label = label_of(&mut labels, arc);
            arcs_of[dense].push((label, target));
        }
    }
    let nl = labels.len();
    let mut inv: Vec<Vec<Vec<u32>>> = vec![vec![Vec::new(); nk]; nl];
    for (source, arcs) in arcs_of.iter().enumerate() {
        for &(label, target) in arcs {
            inv[label][target].push(source as u32);
        }
    }

    // initial partition by final weight
    let mut class_of: Vec<u32> = vec![0; nk];
    let mut classes: Vec<Vec<u32>> = Vec::new();
    let mut final_keys: Vec<Option<W>> = Vec::new();
    for (dense, &old) in kept.iter().enumerate() {
        let key = fst.state(old).final_weight;
        let idx = match final_keys.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                final_keys.push(key);
                classes.push(Vec::new());
                final_keys.len() - 1
            }
        };
        class_of[dense] = idx as u32;
        classes[idx].push(dense as u32);
    }

    // refinement worklist of (class, label) splitters, seeded with all pairs
    let mut worklist: VecDeque<(u32, u32)> = VecDeque::new();
    let mut queued: Vec<Vec<bool>> = Vec::new();
    for c in 0..classes.len() {
        queued.push(vec![true; nl]);
        for l in 0..nl {
            worklist.push_back((c as u32, l as u32));
        }
    }

    while let Some((c, label)) = worklist.pop_front() {
        queued[c as usize][label as usize] = false;

        let mut preds: Vec<u32> = Vec::new();
        for &s in &classes[c as usize] {
            preds.extend(&inv[label as usize][s as usize]);
        }
        if preds.is_empty() {
            continue;
        }
        preds.sort_unstable();
        preds.dedup();

        let mut touched: hashbrown::HashMap<u32, Vec<u32>> = hashbrown::HashMap::new();
        for &p in &preds {
            touched.entry(class_of[p as usize]).or_default().push(p);
        }
        for (y, hit) in touched {
            if hit.len() == classes[y as usize].len() {
                continue;
            }
            let new_class = classes.len() as u32;
            let hit_set: HashSet<u32> = hit.iter().copied().collect();
            classes[y as usize].retain(|s| !hit_set.contains(s));
            for &s in &hit {
                class_of[s as usize] = new_class;
            }
            classes.push(hit);
            queued.push(vec![false; nl]);
            for l in 0..nl {
                if queued[y as usize][l] {
                    queued[new_class as usize][l] = true;
                    worklist.push_back((new_class, l as u32));
                } else {
                    let smaller = if classes[y as usize].len()
                        <= classes[new_class as usize].len()
                    {
                        y
                    } else {
                        new_class
                    };
                    queued[smaller as usize][l] = true;
                    worklist.push_back((smaller, l as u32));
                }
            }
        }
    }

    // rebuild one state per class, numbered breadth-first from the start
    let mut out = Fst::new(fst.symbols().clone());
    let mut class_state: Vec<Option<StateId>> = vec![None; classes.len()];
    let start_class = class_of[dense_of[fst.start().index()].unwrap_or(0)];
    class_state[start_class as usize] = Some(out.start());
    let mut queue: VecDeque<u32> = VecDeque::new();
    queue.push_back(start_class);
    while let Some(c) = queue.pop_front() {
        let src = match class_state[c as usize] {
            Some(id) => id,
            None => continue,
        };
        let rep = kept[classes[c as usize][0] as usize];
        if let Some(fw) = fst.state(rep).final_weight {
            out.set_final(src, fw);
        }
        for arc in &fst.state(rep).arcs {
            let Some(target_dense) = dense_of[arc.target.index()] else {
                continue;
            };
            let tc = class_of[target_dense];
            let target = match class_state[tc as usize] {
                Some(id) => id,
                None => {
                    let id = out.add_state();
                    class_state[tc as usize] = Some(id);
                    queue.push_back(tc);
                    id
                }
            };
            out.add_transition(
                src,
                Transition {
                    input: arc.input,
                    output: arc.output,
                    target,
                    weight: arc.weight,
                },
            );
        }
    }
    out.set_props(FstProps { deterministic: true, epsilon_free: true, minimal: true });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::determinize::determinize;
    use crate::eval::accepts;
    use weft_core::semiring::{Boolean, Tropical};

    fn minimized(pattern: &str) -> Fst<Boolean> {
        let fst: Fst<Boolean> = compile(pattern).unwrap();
        minimize(&determinize(&fst)).unwrap()
    }

    #[test]
    fn rejects_nondeterministic_input() {
        let fst: Fst<Boolean> = compile("a*b").unwrap();
        assert!(matches!(
            minimize(&fst),
            Err(FstError::NonDeterministicPrecondition { operation: "minimize" })
        ));
    }

    #[test]
    fn merges_equivalent_states() {
        // aa|ab|ba|bb is (a|b)(a|b): three states suffice
        let min = minimized("aa|ab|ba|bb");
        assert_eq!(min.num_states(), 3);
        for s in ["aa", "ab", "ba", "bb"] {
            assert!(accepts(&min, s));
        }
        assert!(!accepts(&min, "a"));
        assert!(!accepts(&min, "aab"));
    }

    #[test]
    fn idempotent_and_never_grows() {
        let min = minimized("(a|b)*abb");
        let again = minimize(&min).unwrap();
        assert_eq!(again.num_states(), min.num_states());
        assert!(min.props().minimal);
    }

    #[test]
    fn empty_language_collapses_to_one_state() {
        let min = minimized("a-a");
        assert_eq!(min.num_states(), 1);
        assert!(!accepts(&min, ""));
        assert!(!accepts(&min, "a"));
        assert!(min.props().minimal);
    }

    #[test]
    fn distinct_weights_prevent_merging() {
        // both branches accept a two-symbol string but with different
        // final weights, so neither the finals nor the middle states merge
        let fst: Fst<Tropical> = compile("ax<1.0>|bx<2.0>").unwrap();
        let min = minimize(&determinize(&fst)).unwrap();
        let boolean: Fst<Boolean> = compile("ax|bx").unwrap();
        let bool_min = minimize(&determinize(&boolean)).unwrap();
        assert!(min.num_states() > bool_min.num_states());
    }

    #[test]
    fn trims_states_that_cannot_reach_a_final() {
        // a|(b-b) determinizes with a dead branch for the b prefix
        let min = minimized("a|(bc-bc)");
        assert!(accepts(&min, "a"));
        assert!(!accepts(&min, "bc"));
        assert_eq!(min.num_states(), 2);
    }
}
