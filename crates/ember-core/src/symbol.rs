//! Symbol table: a flat, monotonic name -> index mapping.
//!
//! Shared across a whole compilation, including textually included
//! units, so that an identifier in an imported file resolves to the same
//! slot as in the including file.

use std::collections::HashMap;
use std::fmt;

/// Upper bound on the number of distinct symbols a single compilation may
/// introduce: indices are encoded as a single byte by `LOAD_VAR`/
/// `STORE_VAR`.
pub const MAX_SYMBOLS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub index: u8,
    pub is_function: bool,
}

#[derive(Debug)]
pub struct SymbolTableFull;

impl fmt::Display for SymbolTableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symbol table is full (max {MAX_SYMBOLS} symbols)")
    }
}

impl std::error::Error for SymbolTableFull {}

/// Dense, first-seen-order symbol table. Entries are never removed or
/// renumbered once assigned.
#[derive(Debug, Default)]
pub struct SymbolTable {
    order: Vec<Symbol>,
    indices: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.indices.get(name).map(|&i| self.order[i])
    }

    /// Finds `name`'s symbol, or inserts a new one with the next dense
    /// index. Existing entries are never re-numbered; a name already seen
    /// as a function keeps its recorded `is_function` flag regardless of
    /// what is passed on a later lookup.
    pub fn get_or_insert(
        &mut self,
        name: &str,
        is_function: bool,
    ) -> Result<Symbol, SymbolTableFull> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        if self.order.len() >= MAX_SYMBOLS {
            return Err(SymbolTableFull);
        }
        let symbol = Symbol {
            index: self.order.len() as u8,
            is_function,
        };
        self.order.push(symbol);
        self.indices.insert(name.to_string(), self.order.len() - 1);
        Ok(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_dense_first_seen_indices() {
        let mut table = SymbolTable::new();
        assert_eq!(table.get_or_insert("a", false).unwrap().index, 0);
        assert_eq!(table.get_or_insert("b", false).unwrap().index, 1);
        assert_eq!(table.get_or_insert("a", false).unwrap().index, 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_past_capacity() {
        let mut table = SymbolTable::new();
        for i in 0..MAX_SYMBOLS {
            table.get_or_insert(&format!("v{i}"), false).unwrap();
        }
        assert!(table.get_or_insert("overflow", false).is_err());
    }

    #[test]
    fn shared_table_resolves_included_names_to_same_index() {
        // Simulates the compiler passing the same table through an
        // `import`-driven recursive compile call.
        let mut table = SymbolTable::new();
        let outer = table.get_or_insert("shared", false).unwrap();
        let inner = table.get_or_insert("shared", false).unwrap();
        assert_eq!(outer.index, inner.index);
    }

    use proptest::prelude::*;

    proptest! {
        /// Property: for any sequence of distinct names, every
        /// assigned index stays within `[0, MAX_SYMBOLS)`.
        #[test]
        fn assigned_indices_are_always_in_bounds(
            names in proptest::collection::vec("[a-z]{1,8}", 1..64),
        ) {
            let mut table = SymbolTable::new();
            for name in &names {
                if let Ok(symbol) = table.get_or_insert(name, false) {
                    prop_assert!((symbol.index as usize) < MAX_SYMBOLS);
                }
            }
        }

        /// Re-inserting a name already seen never changes its index.
        #[test]
        fn reinsertion_is_idempotent(name in "[a-z]{1,8}") {
            let mut table = SymbolTable::new();
            let first = table.get_or_insert(&name, false).unwrap();
            let second = table.get_or_insert(&name, true).unwrap();
            prop_assert_eq!(first.index, second.index);
        }
    }
}
