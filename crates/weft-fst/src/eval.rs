// Evaluation: acceptance, best-first transduction, shortest path and
// language enumeration.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use hashbrown::{HashMap, HashSet};
use weft_core::semiring::{NaturalOrder, Semiring};
use weft_core::symbols::SymbolId;

use crate::graph::{Fst, StateId};

/// Boolean acceptance on the input tape by parallel NFA simulation. No
/// determinization happens and no weights are inspected, so this works on
/// any machine in any semiring.
pub fn accepts<W: Semiring>(fst: &Fst<W>, input: &str) -> bool {
    let tokens: Option<Vec<SymbolId>> =
        fst.symbols().tokenize(input).into_iter().collect();
    let Some(tokens) = tokens else {
        // a character outside the alphabet can never be consumed
        return false;
    };

    let mut current = input_eps_closure(fst, [fst.start()]);
    for token in tokens {
        let mut next: HashSet<StateId> = HashSet::new();
        for &s in &current {
            for arc in &fst.state(s).arcs {
                if arc.input == token {
                    next.insert(arc.target);
                }
            }
        }
        if next.is_empty() {
            return false;
        }
        current = input_eps_closure(fst, next);
    }
    current.iter().any(|&s| fst.state(s).is_final())
}

// Closure over arcs that consume nothing on the input tape, regardless of
// what they write.
fn input_eps_closure<W: Semiring>(
    fst: &Fst<W>,
    seeds: impl IntoIterator<Item = StateId>,
) -> HashSet<StateId> {
    let mut closed: HashSet<StateId> = HashSet::new();
    let mut queue: VecDeque<StateId> = VecDeque::new();
    for s in seeds {
        if closed.insert(s) {
            queue.push_back(s);
        }
    }
    while let Some(s) = queue.pop_front() {
        for arc in &fst.state(s).arcs {
            if arc.input.is_epsilon() && closed.insert(arc.target) {
                queue.push_back(arc.target);
            }
        }
    }
    closed
}

/// Transduce `input` through the machine, yielding `(output, weight)`
/// pairs best-first in the semiring's natural order.
///
/// The search is a priority queue over partial paths. A path that reaches
/// a final state with the input consumed is re-queued as a finished entry
/// so it is only emitted once every unfinished path that could still beat
/// it has been expanded; with equal weights, longer consumed prefixes win.
/// `max_steps` bounds the number of queue pops so epsilon loops cannot
/// spin forever; iteration simply ends when the budget runs out.
pub fn apply<'a, W: NaturalOrder>(
    fst: &'a Fst<W>,
    input: &str,
    max_steps: usize,
) -> ApplyIter<'a, W> {
    ApplyIter::new(fst, input, max_steps, false)
}

/// [`apply`] against the output tape: matches `input` against arc outputs
/// and yields the corresponding input-tape strings, running the relation
/// backwards.
pub fn apply_inverse<'a, W: NaturalOrder>(
    fst: &'a Fst<W>,
    input: &str,
    max_steps: usize,
) -> ApplyIter<'a, W> {
    ApplyIter::new(fst, input, max_steps, true)
}

pub struct ApplyIter<'a, W: NaturalOrder> {
    fst: &'a Fst<W>,
    tokens: Vec<SymbolId>,
    heap: BinaryHeap<SearchItem<W>>,
    serial: u64,
    steps_left: usize,
    inverse: bool,
}

// A partial path. `state` is `None` for a finished entry whose weight
// already includes the final weight.
struct SearchItem<W> {
    weight: W,
    pos: usize,
    serial: u64,
    output: Vec<SymbolId>,
    state: Option<StateId>,
}

impl<W: NaturalOrder> Ord for SearchItem<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: better weight first, then the longer consumed prefix,
        // then insertion order
        other
            .weight
            .natural_cmp(&self.weight)
            .then(self.pos.cmp(&other.pos))
            .then(other.serial.cmp(&self.serial))
    }
}

impl<W: NaturalOrder> PartialOrd for SearchItem<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W: NaturalOrder> PartialEq for SearchItem<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W: NaturalOrder> Eq for SearchItem<W> {}

impl<'a, W: NaturalOrder> ApplyIter<'a, W> {
    fn new(fst: &'a Fst<W>, input: &str, max_steps: usize, inverse: bool) -> Self {
        let tokens: Option<Vec<SymbolId>> =
            fst.symbols().tokenize(input).into_iter().collect();
        // a character outside the alphabet means nothing to enumerate
        let known = tokens.is_some();
        let mut iter = ApplyIter {
            fst,
            tokens: tokens.unwrap_or_default(),
            heap: BinaryHeap::new(),
            serial: 0,
            steps_left: if known { max_steps } else { 0 },
            inverse,
        };
        if known {
            iter.push(W::one(), 0, Vec::new(), Some(fst.start()));
        }
        iter
    }

    fn push(&mut self, weight: W, pos: usize, output: Vec<SymbolId>, state: Option<StateId>) {
        let serial = self.serial;
        self.serial += 1;
        self.heap.push(SearchItem { weight, pos, serial, output, state });
    }
}

impl<W: NaturalOrder> Iterator for ApplyIter<'_, W> {
    type Item = (String, W);

    fn next(&mut self) -> Option<Self::Item> {
        while self.steps_left > 0 {
            self.steps_left -= 1;
            let item = self.heap.pop()?;
            let fst = self.fst;
            let Some(state) = item.state else {
                let rendered: String =
                    item.output.iter().map(|&o| fst.symbols().resolve(o)).collect();
                return Some((rendered, item.weight));
            };

            let node = fst.state(state);
            if item.pos == self.tokens.len() {
                if let Some(fw) = node.final_weight {
                    self.push(item.weight.times(fw), item.pos, item.output.clone(), None);
                }
            }
            for arc in &node.arcs {
                let (consumed, emitted) = if self.inverse {
                    (arc.out_symbol(), arc.input)
                } else {
                    (arc.input, arc.out_symbol())
                };
                if consumed.is_epsilon() {
                    let mut output = item.output.clone();
                    if !emitted.is_epsilon() {
                        output.push(emitted);
                    }
                    self.push(
                        item.weight.times(arc.weight),
                        item.pos,
                        output,
                        Some(arc.target),
                    );
                } else if item.pos < self.tokens.len() && self.tokens[item.pos] == consumed
                {
                    let mut output = item.output.clone();
                    if !emitted.is_epsilon() {
                        output.push(emitted);
                    }
                    self.push(
                        item.weight.times(arc.weight),
                        item.pos + 1,
                        output,
                        Some(arc.target),
                    );
                }
            }
        }
        None
    }
}

struct DistanceItem<W> {
    weight: W,
    serial: u64,
    state: StateId,
}

impl<W: NaturalOrder> Ord for DistanceItem<W> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .natural_cmp(&self.weight)
            .then(other.serial.cmp(&self.serial))
    }
}

impl<W: NaturalOrder> PartialOrd for DistanceItem<W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<W: NaturalOrder> PartialEq for DistanceItem<W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<W: NaturalOrder> Eq for DistanceItem<W> {}

/// The best accepting path through the machine: its input-tape symbols and
/// its total weight, or `None` for the empty language.
///
/// Settles each state once in best-first order, so the result is exact
/// when extending a path never improves it (true of the Boolean and
/// Tropical semirings with non-negative weights).
pub fn shortest_path<W: NaturalOrder>(fst: &Fst<W>) -> Option<(Vec<String>, W)> {
    let mut dist: HashMap<StateId, W> = HashMap::new();
    let mut parent: HashMap<StateId, (StateId, SymbolId)> = HashMap::new();
    let mut settled: HashSet<StateId> = HashSet::new();
    let mut heap: BinaryHeap<DistanceItem<W>> = BinaryHeap::new();
    let mut serial = 0u64;

    dist.insert(fst.start(), W::one());
    heap.push(DistanceItem { weight: W::one(), serial, state: fst.start() });

    while let Some(item) = heap.pop() {
        if !settled.insert(item.state) {
            continue;
        }
        for arc in &fst.state(item.state).arcs {
            if settled.contains(&arc.target) {
                continue;
            }
            let candidate = item.weight.times(arc.weight);
            let improved = match dist.get(&arc.target) {
                Some(existing) => candidate.natural_cmp(existing) == Ordering::Less,
                None => true,
            };
            if improved {
                dist.insert(arc.target, candidate);
                parent.insert(arc.target, (item.state, arc.input));
                serial += 1;
                heap.push(DistanceItem { weight: candidate, serial, state: arc.target });
            }
        }
    }

    let mut best: Option<(StateId, W)> = None;
    for (state, fw) in fst.final_states() {
        let Some(&d) = dist.get(&state) else { continue };
        let total = d.times(fw);
        let better = match &best {
            Some((_, current)) => total.natural_cmp(current) == Ordering::Less,
            None => true,
        };
        if better {
            best = Some((state, total));
        }
    }
    let (mut state, total) = best?;

    let mut symbols: Vec<String> = Vec::new();
    while let Some(&(prev, input)) = parent.get(&state) {
        if !input.is_epsilon() {
            symbols.push(fst.symbols().resolve(input).to_string());
        }
        state = prev;
    }
    symbols.reverse();
    Some((symbols, total))
}

/// One accepting path's tapes and weight, as rendered strings.
#[derive(Debug, Clone, PartialEq)]
pub struct WordPath<W> {
    pub input: String,
    pub output: String,
    pub weight: W,
}

/// Enumerate accepting paths breadth-first, shortest paths first.
///
/// Stops after `max_results` paths or `max_steps` expansions, whichever
/// comes first, so cyclic machines with infinite languages still return.
pub fn words<W: Semiring>(
    fst: &Fst<W>,
    max_results: usize,
    max_steps: usize,
) -> Vec<WordPath<W>> {
    let mut results = Vec::new();
    if max_results == 0 {
        return results;
    }
    let mut queue: VecDeque<(StateId, W, Vec<SymbolId>, Vec<SymbolId>)> =
        VecDeque::new();
    queue.push_back((fst.start(), W::one(), Vec::new(), Vec::new()));
    let mut steps = 0usize;
    while let Some((state, weight, input, output)) = queue.pop_front() {
        steps += 1;
        if steps > max_steps {
            break;
        }
        let node = fst.state(state);
        if let Some(fw) = node.final_weight {
            results.push(WordPath {
                input: render(fst, &input),
                output: render(fst, &output),
                weight: weight.times(fw),
            });
            if results.len() >= max_results {
                break;
            }
        }
        for arc in &node.arcs {
            let mut input = input.clone();
            if !arc.input.is_epsilon() {
                input.push(arc.input);
            }
            let mut output = output.clone();
            if !arc.out_symbol().is_epsilon() {
                output.push(arc.out_symbol());
            }
            queue.push_back((arc.target, weight.times(arc.weight), input, output));
        }
    }
    results
}

fn render<W: Semiring>(fst: &Fst<W>, symbols: &[SymbolId]) -> String {
    symbols.iter().map(|&s| fst.symbols().resolve(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use weft_core::semiring::{Boolean, Probability, Tropical};

    #[test]
    fn acceptance_follows_the_input_tape() {
        let fst: Fst<Boolean> = compile("(a|b)*abb").unwrap();
        assert!(accepts(&fst, "abb"));
        assert!(accepts(&fst, "babb"));
        assert!(!accepts(&fst, "ab"));
        assert!(!accepts(&fst, "abbc"));
    }

    #[test]
    fn acceptance_ignores_the_output_tape() {
        let fst: Fst<Boolean> = compile("a:x").unwrap();
        assert!(accepts(&fst, "a"));
        assert!(!accepts(&fst, "x"));
    }

    #[test]
    fn apply_yields_best_first_in_the_tropical_order() {
        let fst: Fst<Tropical> = compile("a:x<2.0>|a:y<1.0>").unwrap();
        let results: Vec<(String, Tropical)> = apply(&fst, "a", 10_000).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], ("y".to_string(), Tropical::new(1.0)));
        assert_eq!(results[1], ("x".to_string(), Tropical::new(2.0)));
    }

    #[test]
    fn probability_prefers_the_higher_weight() {
        let fst: Fst<Probability> = compile("a:x<0.2>|a:y<0.8>").unwrap();
        let results: Vec<(String, Probability)> = apply(&fst, "a", 10_000).collect();
        assert_eq!(results[0].0, "y");
        assert_eq!(results[0].1, Probability::new(0.8));
    }

    #[test]
    fn apply_inverse_runs_the_relation_backwards() {
        let fst: Fst<Boolean> = compile("(a:x)(b:y)").unwrap();
        let forward: Vec<String> = apply(&fst, "ab", 10_000).map(|(s, _)| s).collect();
        assert_eq!(forward, vec!["xy".to_string()]);
        let backward: Vec<String> =
            apply_inverse(&fst, "xy", 10_000).map(|(s, _)| s).collect();
        assert_eq!(backward, vec!["ab".to_string()]);
    }

    #[test]
    fn apply_survives_epsilon_cycles() {
        // '':x under star can emit unboundedly; the step budget ends the
        // enumeration instead of hanging
        let fst: Fst<Tropical> = compile("('':x<1.0>)*a").unwrap();
        let results: Vec<(String, Tropical)> = apply(&fst, "a", 200).collect();
        assert!(!results.is_empty());
        assert_eq!(results[0], ("a".to_string(), Tropical::new(0.0)));
    }

    #[test]
    fn apply_rejects_unknown_characters() {
        let fst: Fst<Boolean> = compile("ab").unwrap();
        assert_eq!(apply(&fst, "aq", 10_000).count(), 0);
    }

    #[test]
    fn shortest_path_picks_the_cheapest_accepting_string() {
        let fst: Fst<Tropical> = compile("a<1.0>|b<2.0>|ab<0.5>").unwrap();
        let (path, weight) = shortest_path(&fst).unwrap();
        assert_eq!(path, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(weight, Tropical::new(0.5));
    }

    #[test]
    fn shortest_path_of_the_empty_language_is_none() {
        let fst: Fst<Tropical> = compile("a-a").unwrap();
        assert!(shortest_path(&fst).is_none());
    }

    #[test]
    fn words_enumerates_shortest_first() {
        let fst: Fst<Boolean> = compile("a*").unwrap();
        let paths = words(&fst, 3, 10_000);
        let inputs: Vec<&str> = paths.iter().map(|p| p.input.as_str()).collect();
        assert_eq!(inputs, vec!["", "a", "aa"]);
    }

    #[test]
    fn words_reports_both_tapes() {
        let fst: Fst<Boolean> = compile("a:x").unwrap();
        let paths = words(&fst, 10, 10_000);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].input, "a");
        assert_eq!(paths[0].output, "x");
    }
}
