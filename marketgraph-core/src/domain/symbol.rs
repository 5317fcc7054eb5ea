//! Symbols and the canonical symbol order.
//!
//! Every matrix and list downstream of the fetch step is indexed in the
//! order of [`SymbolTable`], which is the lexicographic order of the
//! `exchange:ticker` identifiers.

use serde::{Deserialize, Serialize};

/// An `exchange:ticker` identifier with a human-readable display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
}

impl Symbol {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The ticker part of the identifier (`"NYSE:XOM"` → `"XOM"`).
    pub fn ticker(&self) -> &str {
        self.id.rsplit(':').next().unwrap_or(&self.id)
    }

    /// The exchange part of the identifier, if present.
    pub fn exchange(&self) -> Option<&str> {
        self.id.split_once(':').map(|(exchange, _)| exchange)
    }
}

/// A fixed set of symbols in canonical (sorted-by-id) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Build a table from any symbols. Sorts by id; duplicate ids keep the first entry.
    pub fn new(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut symbols: Vec<Symbol> = symbols.into_iter().collect();
        symbols.sort_by(|a, b| a.id.cmp(&b.id));
        symbols.dedup_by(|b, a| a.id == b.id);
        Self { symbols }
    }

    /// Build a table from `(id, name)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(id, name)| Symbol::new(id, name)))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// Position of an id in canonical order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.symbols
            .binary_search_by(|s| s.id.as_str().cmp(id))
            .ok()
    }

    pub fn ids(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.id.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.name.clone()).collect()
    }

    /// The subset of symbols accepted by `keep`, still in canonical order.
    pub fn retain(&self, mut keep: impl FnMut(&Symbol) -> bool) -> Self {
        Self {
            symbols: self.symbols.iter().filter(|s| keep(s)).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sorts_by_id() {
        let table = SymbolTable::from_pairs([
            ("NYSE:XOM", "Exxon"),
            ("NASDAQ:MSFT", "Microsoft"),
            ("NYSE:CVX", "Chevron"),
        ]);
        assert_eq!(table.ids(), vec!["NASDAQ:MSFT", "NYSE:CVX", "NYSE:XOM"]);
        assert_eq!(table.names(), vec!["Microsoft", "Chevron", "Exxon"]);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let table = SymbolTable::from_pairs([("NYSE:KO", "Coca Cola"), ("NYSE:KO", "Coke")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().name, "Coca Cola");
    }

    #[test]
    fn index_of_uses_canonical_order() {
        let table = SymbolTable::from_pairs([("NYSE:PEP", "Pepsi"), ("NYSE:KO", "Coca Cola")]);
        assert_eq!(table.index_of("NYSE:KO"), Some(0));
        assert_eq!(table.index_of("NYSE:PEP"), Some(1));
        assert_eq!(table.index_of("NYSE:MCD"), None);
    }

    #[test]
    fn retain_preserves_order() {
        let table = SymbolTable::from_pairs([("C", "c"), ("A", "a"), ("B", "b")]);
        let subset = table.retain(|s| s.id != "B");
        assert_eq!(subset.ids(), vec!["A", "C"]);
    }

    #[test]
    fn ticker_and_exchange() {
        let sym = Symbol::new("NASDAQ:CMCSA", "Comcast");
        assert_eq!(sym.ticker(), "CMCSA");
        assert_eq!(sym.exchange(), Some("NASDAQ"));

        let bare = Symbol::new("SPY", "SPDR");
        assert_eq!(bare.ticker(), "SPY");
        assert_eq!(bare.exchange(), None);
    }
}
