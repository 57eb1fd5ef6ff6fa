// Arena-based state graph: states, transitions, status flags, export.

use weft_core::semiring::Semiring;
use weft_core::symbols::{SymbolId, SymbolTable};

/// A state's identity: an index into its automaton's arena. Cyclic graphs
/// are represented without reference cycles because transitions store
/// target indices, never pointers; dropping the arena drops the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        StateId(index as u32)
    }
}

/// A labeled, weighted transition.
///
/// `output` is `None` on plain acceptor arcs, where the output tape is
/// understood to carry the input symbol. A transducer arc stores
/// `Some(symbol)`; `Some` equal to the input is normalized back to `None`
/// by the algorithms that construct arcs.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<W> {
    pub input: SymbolId,
    pub output: Option<SymbolId>,
    pub target: StateId,
    pub weight: W,
}

impl<W> Transition<W> {
    /// The symbol on the output tape: the explicit output if present,
    /// otherwise the input symbol.
    pub fn out_symbol(&self) -> SymbolId {
        self.output.unwrap_or(self.input)
    }

    /// True when the arc consumes nothing on either tape.
    pub fn is_epsilon(&self) -> bool {
        self.input.is_epsilon() && self.out_symbol().is_epsilon()
    }
}

/// A state: a finality marker carrying a semiring weight (`None` when
/// non-final) and the outgoing transitions in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct State<W> {
    pub final_weight: Option<W>,
    pub arcs: Vec<Transition<W>>,
}

impl<W> State<W> {
    fn new() -> Self {
        State { final_weight: None, arcs: Vec::new() }
    }

    pub fn is_final(&self) -> bool {
        self.final_weight.is_some()
    }
}

/// Status flags tracked per automaton. They are set by the transformations
/// that establish them and cleared by constructions that may break them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FstProps {
    pub deterministic: bool,
    pub epsilon_free: bool,
    pub minimal: bool,
}

/// A weighted finite-state automaton or transducer.
///
/// The arena of states, a designated start state, the symbol table the
/// labels are interned in, and the status flags. Each `Fst` exclusively
/// owns its arena and its symbol table: every transformation builds a
/// fresh `Fst`, and a finalized automaton is immutable, so it can be read
/// concurrently without synchronization.
#[derive(Debug, Clone)]
pub struct Fst<W: Semiring> {
    states: Vec<State<W>>,
    start: StateId,
    symbols: SymbolTable,
    props: FstProps,
}

impl<W: Semiring> Fst<W> {
    /// Create an automaton with a single non-final start state.
    pub fn new(symbols: SymbolTable) -> Self {
        Fst {
            states: vec![State::new()],
            start: StateId(0),
            symbols,
            props: FstProps::default(),
        }
    }

    /// An automaton with no states yet. Callers must add states and call
    /// [`set_start`](Self::set_start) before the value escapes the crate.
    pub(crate) fn empty(symbols: SymbolTable) -> Self {
        Fst { states: Vec::new(), start: StateId(0), symbols, props: FstProps::default() }
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub(crate) fn set_start(&mut self, start: StateId) {
        self.start = start;
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &State<W> {
        &self.states[id.index()]
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId::from_index)
    }

    /// All final states with their final weights.
    pub fn final_states(&self) -> impl Iterator<Item = (StateId, W)> + '_ {
        self.states.iter().enumerate().filter_map(|(i, s)| {
            s.final_weight.map(|w| (StateId::from_index(i), w))
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn props(&self) -> FstProps {
        self.props
    }

    pub(crate) fn set_props(&mut self, props: FstProps) {
        self.props = props;
    }

    pub fn add_state(&mut self) -> StateId {
        let id = StateId::from_index(self.states.len());
        self.states.push(State::new());
        id
    }

    /// Append a transition. Any structural change invalidates the status
    /// flags, which only the determinizer/minimizer re-establish.
    pub fn add_transition(&mut self, source: StateId, arc: Transition<W>) {
        debug_assert!(arc.target.index() < self.states.len());
        self.states[source.index()].arcs.push(arc);
        self.props = FstProps::default();
    }

    pub fn set_final(&mut self, state: StateId, weight: W) {
        self.states[state.index()].final_weight = Some(weight);
    }

    /// Remove and return a state's final weight.
    pub(crate) fn take_final(&mut self, state: StateId) -> Option<W> {
        self.states[state.index()].final_weight.take()
    }

    /// True when some arc actually maps its input to a different output,
    /// i.e. the machine defines a relation rather than a language.
    pub fn is_transducer(&self) -> bool {
        self.states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .any(|a| a.out_symbol() != a.input)
    }

    /// Structural determinism check: no input-epsilon arcs, and at most one
    /// arc per (state, input symbol).
    pub fn is_deterministic(&self) -> bool {
        let mut seen: Vec<SymbolId> = Vec::new();
        for state in &self.states {
            seen.clear();
            for arc in &state.arcs {
                if arc.input.is_epsilon() {
                    return false;
                }
                if seen.contains(&arc.input) {
                    return false;
                }
                seen.push(arc.input);
            }
        }
        true
    }

    /// The input-tape alphabet: symbols actually used on the input side.
    pub fn input_alphabet(&self) -> Vec<SymbolId> {
        let mut syms: Vec<SymbolId> = self
            .states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .map(|a| a.input)
            .filter(|s| !s.is_epsilon())
            .collect();
        syms.sort_unstable();
        syms.dedup();
        syms
    }

    /// The output-tape alphabet.
    pub fn output_alphabet(&self) -> Vec<SymbolId> {
        let mut syms: Vec<SymbolId> = self
            .states
            .iter()
            .flat_map(|s| s.arcs.iter())
            .map(|a| a.out_symbol())
            .filter(|s| !s.is_epsilon())
            .collect();
        syms.sort_unstable();
        syms.dedup();
        syms
    }

    /// Copy every state and arc of `other` into this automaton, interning
    /// `other`'s symbols into this table. Returns the state remapping,
    /// indexed by `other`'s state indices.
    pub(crate) fn splice(&mut self, other: &Fst<W>) -> Vec<StateId> {
        let sym_map = self.symbols.merge(&other.symbols);
        let state_map: Vec<StateId> =
            (0..other.states.len()).map(|_| self.add_state()).collect();
        for (i, state) in other.states.iter().enumerate() {
            let new_id = state_map[i];
            self.states[new_id.index()].final_weight = state.final_weight;
            for arc in &state.arcs {
                let input = sym_map[arc.input.index()];
                let output = arc.output.map(|o| sym_map[o.index()]);
                // re-normalize: an explicit output equal to the input is an
                // acceptor arc
                let output = output.filter(|&o| o != input);
                self.states[new_id.index()].arcs.push(Transition {
                    input,
                    output,
                    target: state_map[arc.target.index()],
                    weight: arc.weight,
                });
            }
        }
        self.props = FstProps::default();
        state_map
    }

    /// The ordered transition list consumed by external serialization and
    /// visualization collaborators. States are renumbered breadth-first
    /// from the start state so the listing is reproducible and unreachable
    /// states never appear; the start state is always row source 0.
    pub fn export_transitions(&self) -> Vec<TransitionRow<W>> {
        let mut order: Vec<StateId> = Vec::new();
        let mut renumber: Vec<Option<u32>> = vec![None; self.states.len()];
        let mut queue = std::collections::VecDeque::new();
        renumber[self.start.index()] = Some(0);
        order.push(self.start);
        queue.push_back(self.start);
        while let Some(id) = queue.pop_front() {
            for arc in &self.states[id.index()].arcs {
                if renumber[arc.target.index()].is_none() {
                    renumber[arc.target.index()] = Some(order.len() as u32);
                    order.push(arc.target);
                    queue.push_back(arc.target);
                }
            }
        }

        let mut rows = Vec::new();
        for &id in &order {
            let source = renumber[id.index()].unwrap_or(0);
            for arc in &self.states[id.index()].arcs {
                rows.push(TransitionRow {
                    source,
                    input: self.symbols.resolve(arc.input).to_string(),
                    output: arc
                        .output
                        .map(|o| self.symbols.resolve(o).to_string()),
                    target: renumber[arc.target.index()].unwrap_or(0),
                    weight: arc.weight,
                });
            }
        }
        rows
    }
}

/// One row of [`Fst::export_transitions`]: the sole data surface the core
/// exposes to serialization collaborators. The engine itself defines no
/// persisted file format.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransitionRow<W> {
    pub source: u32,
    pub input: String,
    pub output: Option<String>,
    pub target: u32,
    pub weight: W,
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::semiring::Tropical;

    fn two_state() -> Fst<Tropical> {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let mut fst = Fst::new(table);
        let q1 = fst.add_state();
        fst.add_transition(
            fst.start(),
            Transition { input: a, output: None, target: q1, weight: Tropical::one() },
        );
        fst.set_final(q1, Tropical::one());
        fst
    }

    #[test]
    fn arena_indices() {
        let fst = two_state();
        assert_eq!(fst.num_states(), 2);
        assert_eq!(fst.start().index(), 0);
        assert_eq!(fst.state(fst.start()).arcs.len(), 1);
        assert!(fst.state(StateId::from_index(1)).is_final());
    }

    #[test]
    fn acceptor_is_not_transducer() {
        let fst = two_state();
        assert!(!fst.is_transducer());

        let mut fst = two_state();
        let x = fst.symbols_mut().intern("x");
        let q2 = fst.add_state();
        fst.add_transition(
            fst.start(),
            Transition {
                input: SymbolId::EPSILON,
                output: Some(x),
                target: q2,
                weight: Tropical::one(),
            },
        );
        assert!(fst.is_transducer());
    }

    #[test]
    fn determinism_check() {
        let mut fst = two_state();
        assert!(fst.is_deterministic());

        let a = fst.symbols_mut().intern("a");
        let q2 = fst.add_state();
        fst.add_transition(
            fst.start(),
            Transition { input: a, output: None, target: q2, weight: Tropical::one() },
        );
        assert!(!fst.is_deterministic());
    }

    #[test]
    fn splice_remaps_symbols_and_states() {
        let mut left = two_state();
        let mut table = SymbolTable::new();
        let b = table.intern("b");
        let mut right: Fst<Tropical> = Fst::new(table);
        let q1 = right.add_state();
        right.add_transition(
            right.start(),
            Transition { input: b, output: None, target: q1, weight: Tropical::new(2.0) },
        );
        right.set_final(q1, Tropical::one());

        let map = left.splice(&right);
        assert_eq!(left.num_states(), 4);
        let spliced_start = map[0];
        let arc = &left.state(spliced_start).arcs[0];
        assert_eq!(left.symbols().resolve(arc.input), "b");
        assert_eq!(arc.target, map[1]);
    }

    #[test]
    fn export_renumbers_breadth_first() {
        let fst = two_state();
        let rows = fst.export_transitions();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, 0);
        assert_eq!(rows[0].target, 1);
        assert_eq!(rows[0].input, "a");
        assert_eq!(rows[0].output, None);
    }

    #[test]
    fn export_omits_unreachable_states() {
        let mut fst = two_state();
        fst.add_state(); // never connected
        let rows = fst.export_transitions();
        assert!(rows.iter().all(|r| r.source <= 1 && r.target <= 1));
    }
}
