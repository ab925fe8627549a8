//! Explicitly-owned caches for compiled grammars/tables. A host that compiles the same
//! grammar repeatedly (e.g. once per request) can keep one of these around instead of
//! rebuilding the table each time; there is no implicit global cache anywhere in this crate.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::grammar::Grammar;
use crate::table::{ParsingTable, TableBuildOptions, TableBuildReport, TableBuilder};

/// A structural fingerprint of a grammar's production list, used as a cache key. Two
/// grammars with the same productions in the same order hash identically regardless of
/// where they were constructed.
pub fn structural_hash(grammar: &Grammar) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for production in grammar.productions() {
        production.id.hash(&mut hasher);
        production.left.hash(&mut hasher);
        for symbol in &production.right {
            symbol.hash(&mut hasher);
        }
    }
    grammar.augmented_production().id.hash(&mut hasher);
    hasher.finish()
}

/// An owned cache mapping a grammar's structural hash to its compiled table. Not a
/// process-wide singleton: a caller creates one and threads it through explicitly.
#[derive(Default)]
pub struct TableCache {
    entries: HashMap<u64, ParsingTable>,
}

impl TableCache {
    pub fn new() -> Self {
        TableCache::default()
    }

    /// Return the cached table for `grammar` if present, otherwise build one with
    /// `options`, cache it, and return it.
    pub fn get_or_build(
        &mut self,
        grammar: &Grammar,
        options: TableBuildOptions,
    ) -> Result<(&ParsingTable, Option<TableBuildReport>), CompileError> {
        let key = structural_hash(grammar);
        if self.entries.contains_key(&key) {
            return Ok((self.entries.get(&key).unwrap(), None));
        }
        let (table, report) = TableBuilder::new(options, crate::conflict::ConflictResolver::default()).build(grammar)?;
        self.entries.insert(key, table);
        Ok((self.entries.get(&key).unwrap(), Some(report)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
