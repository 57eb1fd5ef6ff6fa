// Epsilon removal and subset construction.

use std::collections::VecDeque;

use hashbrown::HashMap;
use weft_core::error::FstError;
use weft_core::semiring::Semiring;
use weft_core::symbols::SymbolId;

use crate::graph::{Fst, FstProps, StateId, Transition};

/// Remove epsilon transitions and apply the subset construction.
///
/// Each output arc carries the `plus`-pool of every contributing
/// (closure weight times arc weight) term, and each successor frontier
/// member keeps its residual after factoring that pool back out with
/// [`Semiring::divide`], so every string's total weight is preserved
/// exactly. Frontiers are identified by their member states together with
/// those residuals; for the boolean semiring all residuals are `one` and
/// this degenerates to plain set identity. A weighted cycle whose
/// residuals never repeat can make the construction grow without bound;
/// [`determinize_bounded`] caps it.
///
/// Arcs whose input and output symbols differ survive as paired labels, so
/// the result is input-deterministic only when no state carries two such
/// pairs on the same input.
pub fn determinize<W: Semiring>(fst: &Fst<W>) -> Fst<W> {
    match run(fst, None) {
        Ok(out) => out,
        Err(_) => unreachable!("subset construction without a limit cannot exceed one"),
    }
}

/// [`determinize`] with a cap on the number of constructed subset states.
/// Returns [`FstError::StateLimitExceeded`] when the construction would
/// create more than `limit` states.
pub fn determinize_bounded<W: Semiring>(
    fst: &Fst<W>,
    limit: usize,
) -> Result<Fst<W>, FstError> {
    run(fst, Some(limit))
}

/// Weighted epsilon closure of a seed set: every state reachable through
/// arcs that consume nothing on either tape, each with the semiring sum
/// over all epsilon paths from the seeds. Relaxation requeues a state when
/// its accumulated weight changes; a state that keeps improving past
/// |states| requeues sits on a cycle with no fixpoint (a negative-cost
/// epsilon loop under the tropical semiring), and its weight saturates at
/// the last value instead of relaxing forever. Convergent closures never
/// reach the bound. Sorted by state id so equal sets produce equal keys.
pub(crate) fn eps_closure<W: Semiring>(
    fst: &Fst<W>,
    seeds: &[(StateId, W)],
) -> Vec<(StateId, W)> {
    let pass_limit = fst.num_states();
    let mut weights: HashMap<StateId, W> = HashMap::new();
    let mut requeues: HashMap<StateId, usize> = HashMap::new();
    let mut queue: VecDeque<StateId> = VecDeque::new();
    for &(s, w) in seeds {
        let entry = weights.entry(s).or_insert_with(W::zero);
        *entry = entry.plus(w);
        queue.push_back(s);
    }
    while let Some(s) = queue.pop_front() {
        let w = weights[&s];
        for arc in &fst.state(s).arcs {
            if !arc.is_epsilon() {
                continue;
            }
            let via = w.times(arc.weight);
            let entry = weights.entry(arc.target).or_insert_with(W::zero);
            let merged = entry.plus(via);
            if merged != *entry {
                *entry = merged;
                let count = requeues.entry(arc.target).or_insert(0);
                if *count < pass_limit {
                    *count += 1;
                    queue.push_back(arc.target);
                }
            }
        }
    }
    let mut closed: Vec<(StateId, W)> = weights.into_iter().collect();
    closed.sort_unstable_by_key(|&(s, _)| s);
    closed
}

fn merge_seed<W: Semiring>(seeds: &mut Vec<(StateId, W)>, state: StateId, weight: W) {
    for entry in seeds.iter_mut() {
        if entry.0 == state {
            entry.1 = entry.1.plus(weight);
            return;
        }
    }
    seeds.push((state, weight));
}

fn run<W: Semiring>(fst: &Fst<W>, limit: Option<usize>) -> Result<Fst<W>, FstError> {
    let mut out = Fst::new(fst.symbols().clone());

    let start_closure = eps_closure(fst, &[(fst.start(), W::one())]);
    let start_key: Vec<StateId> = start_closure.iter().map(|&(s, _)| s).collect();

    // frontier members (with residual weights) are indexed by the output
    // state they became; the map buckets output states per member-state
    // set, and residual vectors are compared within a bucket
    let mut frontier_ids: HashMap<Vec<StateId>, Vec<StateId>> = HashMap::new();
    let mut frontiers: Vec<Vec<(StateId, W)>> = Vec::new();
    frontier_ids.insert(start_key, vec![out.start()]);
    frontiers.push(start_closure);
    if let Some(limit) = limit {
        if limit == 0 {
            return Err(FstError::StateLimitExceeded { limit });
        }
    }

    let mut queue: VecDeque<StateId> = VecDeque::new();
    queue.push_back(out.start());
    while let Some(id) = queue.pop_front() {
        let members = frontiers[id.index()].clone();

        let mut final_weight = W::zero();
        for &(s, cw) in &members {
            if let Some(fw) = fst.state(s).final_weight {
                final_weight = final_weight.plus(cw.times(fw));
            }
        }
        if !final_weight.is_zero() {
            out.set_final(id, final_weight);
        }

        // distinct non-epsilon label pairs leaving the frontier, in a fixed
        // order so construction is reproducible
        let mut labels: Vec<(SymbolId, SymbolId)> = Vec::new();
        for &(s, _) in &members {
            for arc in &fst.state(s).arcs {
                if arc.is_epsilon() {
                    continue;
                }
                let label = (arc.input, arc.out_symbol());
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels.sort_unstable();

        for (input, out_sym) in labels {
            let mut arc_weight = W::zero();
            let mut seeds: Vec<(StateId, W)> = Vec::new();
            for &(s, cw) in &members {
                for arc in &fst.state(s).arcs {
                    if arc.is_epsilon() || arc.input != input || arc.out_symbol() != out_sym
                    {
                        continue;
                    }
                    let contribution = cw.times(arc.weight);
                    arc_weight = arc_weight.plus(contribution);
                    merge_seed(&mut seeds, arc.target, contribution);
                }
            }
            if arc_weight.is_zero() {
                continue;
            }
            // factor the pooled arc weight out of each target's share
            for entry in seeds.iter_mut() {
                entry.1 = entry.1.divide(arc_weight);
            }
            let closure = eps_closure(fst, &seeds);
            let key: Vec<StateId> = closure.iter().map(|&(s, _)| s).collect();
            let bucket = frontier_ids.entry(key).or_default();
            let known = bucket
                .iter()
                .copied()
                .find(|t| frontiers[t.index()] == closure);
            let target = match known {
                Some(t) => t,
                None => {
                    if let Some(limit) = limit {
                        if frontiers.len() >= limit {
                            return Err(FstError::StateLimitExceeded { limit });
                        }
                    }
                    let t = out.add_state();
                    bucket.push(t);
                    frontiers.push(closure);
                    queue.push_back(t);
                    t
                }
            };
            out.add_transition(
                id,
                Transition {
                    input,
                    output: if out_sym == input { None } else { Some(out_sym) },
                    target,
                    weight: arc_weight,
                },
            );
        }
    }

    let deterministic = out.is_deterministic();
    out.set_props(FstProps { deterministic, epsilon_free: true, minimal: false });
    Ok(out)
}
