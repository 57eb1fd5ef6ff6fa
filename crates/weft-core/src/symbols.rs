// Symbol interning: string-to-id and id-to-string mapping, plus greedy
// longest-match tokenization of input strings against the interned alphabet.

use hashbrown::HashMap;

/// An interned symbol. Index 0 is always epsilon (the empty string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SymbolId(u32);

impl SymbolId {
    /// The empty-string symbol, present in every table at index 0.
    pub const EPSILON: SymbolId = SymbolId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_epsilon(self) -> bool {
        self == Self::EPSILON
    }

    pub(crate) fn from_index(index: usize) -> Self {
        SymbolId(index as u32)
    }
}

/// A session-scoped symbol interner.
///
/// Each automaton owns its own table; there is no implicit global interner,
/// so independent compilations never interfere. Symbols may be
/// multi-character strings (quoted in the pattern syntax). Symbols match
/// across automata by string, never by raw id: binary operations merge the
/// right operand's table into the left one's via [`merge`](Self::merge) and
/// remap ids through the returned mapping.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<String>,
    index: HashMap<String, SymbolId>,
    /// Length in chars of the longest interned symbol, for tokenization.
    max_symbol_chars: usize,
}

impl SymbolTable {
    /// Create a table containing only epsilon.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            index: HashMap::new(),
            max_symbol_chars: 0,
        };
        table.symbols.push(String::new());
        table.index.insert(String::new(), SymbolId::EPSILON);
        table
    }

    /// Intern a symbol, returning its id. The empty string always maps to
    /// [`SymbolId::EPSILON`].
    pub fn intern(&mut self, symbol: &str) -> SymbolId {
        if let Some(&id) = self.index.get(symbol) {
            return id;
        }
        let id = SymbolId::from_index(self.symbols.len());
        self.symbols.push(symbol.to_string());
        self.index.insert(symbol.to_string(), id);
        self.max_symbol_chars = self.max_symbol_chars.max(symbol.chars().count());
        id
    }

    /// Look up a symbol without interning it.
    pub fn get(&self, symbol: &str) -> Option<SymbolId> {
        self.index.get(symbol).copied()
    }

    /// Resolve an id back to its string. Ids come from this table's own
    /// `intern`/`merge` calls, so the index is always in range.
    pub fn resolve(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()]
    }

    /// Number of interned symbols, epsilon included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        // epsilon is always present
        self.symbols.len() <= 1
    }

    /// Iterate over all symbols in id order, epsilon included.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::from_index(i), s.as_str()))
    }

    /// Merge another table into this one, interning every symbol of `other`
    /// by string. Returns the id remapping, indexed by the other table's
    /// symbol indices.
    pub fn merge(&mut self, other: &SymbolTable) -> Vec<SymbolId> {
        other.symbols.iter().map(|s| self.intern(s)).collect()
    }

    /// Tokenize an input string against the interned alphabet with greedy
    /// longest match, so multi-character symbols take precedence over their
    /// single-character prefixes. Characters that match no symbol yield
    /// `None` (they can never be consumed by a transition).
    pub fn tokenize(&self, input: &str) -> Vec<Option<SymbolId>> {
        let mut tokens = Vec::new();
        let mut rest = input;
        while !rest.is_empty() {
            let mut best: Option<(usize, SymbolId)> = None;
            for (count, (start, ch)) in rest.char_indices().enumerate() {
                if count >= self.max_symbol_chars {
                    break;
                }
                let end = start + ch.len_utf8();
                if let Some(&id) = self.index.get(&rest[..end]) {
                    best = Some((end, id));
                }
            }
            match best {
                Some((len, id)) => {
                    tokens.push(Some(id));
                    rest = &rest[len..];
                }
                None => {
                    let ch_len = rest.chars().next().map_or(1, char::len_utf8);
                    tokens.push(None);
                    rest = &rest[ch_len..];
                }
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_is_index_zero() {
        let mut table = SymbolTable::new();
        assert_eq!(table.intern(""), SymbolId::EPSILON);
        assert_eq!(table.resolve(SymbolId::EPSILON), "");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        assert_eq!(table.intern("a"), a);
        assert_eq!(table.resolve(a), "a");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn merge_remaps_by_string() {
        let mut left = SymbolTable::new();
        let a = left.intern("a");
        left.intern("b");

        let mut right = SymbolTable::new();
        right.intern("c");
        let ra = right.intern("a");

        let map = left.merge(&right);
        assert_eq!(map[SymbolId::EPSILON.index()], SymbolId::EPSILON);
        assert_eq!(map[ra.index()], a);
        assert_eq!(left.resolve(map[1]), "c");
        assert_eq!(left.len(), 4); // epsilon, a, b, c
    }

    #[test]
    fn tokenize_longest_match() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let plural = table.intern("[Pl]");
        let tokens = table.tokenize("a[Pl]a");
        assert_eq!(tokens, vec![Some(a), Some(plural), Some(a)]);
    }

    #[test]
    fn tokenize_unknown_chars() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        assert_eq!(table.tokenize("axa"), vec![Some(a), None, Some(a)]);
    }

    #[test]
    fn tokenize_multibyte() {
        let mut table = SymbolTable::new();
        let ae = table.intern("\u{00e4}");
        assert_eq!(table.tokenize("\u{00e4}\u{00e4}"), vec![Some(ae), Some(ae)]);
    }
}
