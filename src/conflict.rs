//! Operator-precedence conflict resolution, applied during table construction whenever a
//! shift and a reduce (or two reduces) compete for the same action-table cell.

use std::fmt::{self, Display, Formatter};

use crate::grammar::Production;
use crate::token::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    None,
}

/// One entry of the default operator-precedence table (data model, "Associativity rule").
#[derive(Debug, Clone, Copy)]
pub struct AssociativityRule {
    pub operator: Terminal,
    pub associativity: Associativity,
    pub precedence: u8,
}

/// Precedence/associativity for every operator terminal, lowest to highest. PLUS and MINUS
/// are keyed once each, at their binary level (5, left); NOT is keyed once, at level 8
/// (right). The grammar has no separate terminal for "unary MINUS" or "unary PLUS" — those
/// productions shift the same PLUS/MINUS terminal as their binary counterparts — so this
/// table cannot carry a distinct level-8 entry for them without a second key for the same
/// terminal. See DESIGN.md's Open-Question-1 for why this is unobservable: unary PLUS/MINUS
/// sit at the PRIMARY level and never reach a precedence-resolved action-table conflict in
/// this grammar.
const DEFAULT_RULES: &[AssociativityRule] = &[
    rule(Terminal::Or, Associativity::Left, 1),
    rule(Terminal::And, Associativity::Left, 2),
    rule(Terminal::Equal, Associativity::Left, 3),
    rule(Terminal::NotEqual, Associativity::Left, 3),
    rule(Terminal::Less, Associativity::Left, 4),
    rule(Terminal::LessEqual, Associativity::Left, 4),
    rule(Terminal::Greater, Associativity::Left, 4),
    rule(Terminal::GreaterEqual, Associativity::Left, 4),
    rule(Terminal::Plus, Associativity::Left, 5),
    rule(Terminal::Minus, Associativity::Left, 5),
    rule(Terminal::Multiply, Associativity::Left, 6),
    rule(Terminal::Divide, Associativity::Left, 6),
    rule(Terminal::Modulo, Associativity::Left, 6),
    rule(Terminal::Power, Associativity::Right, 7),
    rule(Terminal::Not, Associativity::Right, 8),
];

const fn rule(operator: Terminal, associativity: Associativity, precedence: u8) -> AssociativityRule {
    AssociativityRule {
        operator,
        associativity,
        precedence,
    }
}

/// A table of precedence/associativity rules, keyed by operator terminal. Defaults to
/// [`DEFAULT_RULES`] but is held as owned data (not a global) so a caller could in
/// principle build a different table (§9 design note: no hidden global state).
#[derive(Debug, Clone)]
pub struct PrecedenceTable {
    rules: Vec<AssociativityRule>,
}

impl PrecedenceTable {
    pub fn default_table() -> Self {
        PrecedenceTable {
            rules: DEFAULT_RULES.to_vec(),
        }
    }

    fn rule_for(&self, terminal: Terminal) -> Option<&AssociativityRule> {
        self.rules.iter().find(|r| r.operator == terminal)
    }

    /// Precedence of a terminal, or 0 if it carries none.
    pub fn precedence_of_terminal(&self, terminal: Terminal) -> u8 {
        self.rule_for(terminal).map(|r| r.precedence).unwrap_or(0)
    }

    pub fn associativity_of(&self, terminal: Terminal) -> Option<Associativity> {
        self.rule_for(terminal).map(|r| r.associativity)
    }

    /// Precedence of a production: the precedence of the rightmost terminal on its
    /// right-hand side that carries a defined precedence, or 0 if none does.
    pub fn precedence_of_production(&self, production: &Production) -> u8 {
        production
            .right
            .iter()
            .rev()
            .filter_map(|s| s.as_terminal())
            .map(|t| self.precedence_of_terminal(t))
            .find(|p| *p > 0)
            .unwrap_or(0)
    }
}

impl Default for PrecedenceTable {
    fn default() -> Self {
        PrecedenceTable::default_table()
    }
}

/// Outcome of resolving a single action-table cell conflict, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResolution {
    ShiftWins {
        terminal: Terminal,
        shift_state: usize,
        reduce_production: i32,
    },
    ReduceWins {
        terminal: Terminal,
        shift_state: usize,
        reduce_production: i32,
    },
    ReduceReduceByPrecedence {
        terminal: Terminal,
        winner: i32,
        loser: i32,
    },
    ReduceReduceByLowerId {
        terminal: Terminal,
        winner: i32,
        loser: i32,
    },
    Unresolvable {
        terminal: Terminal,
        shift_state: usize,
        reduce_production: i32,
    },
}

impl Display for ConflictResolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResolution::ShiftWins { terminal, reduce_production, .. } => write!(
                f,
                "shift/reduce on {}: shift wins over reduce by production {}",
                terminal, reduce_production
            ),
            ConflictResolution::ReduceWins { terminal, reduce_production, .. } => write!(
                f,
                "shift/reduce on {}: reduce by production {} wins over shift",
                terminal, reduce_production
            ),
            ConflictResolution::ReduceReduceByPrecedence { terminal, winner, loser } => write!(
                f,
                "reduce/reduce on {}: production {} wins over {} by precedence",
                terminal, winner, loser
            ),
            ConflictResolution::ReduceReduceByLowerId { terminal, winner, loser } => write!(
                f,
                "reduce/reduce on {}: production {} wins over {} (lower id, earlier-defined)",
                terminal, winner, loser
            ),
            ConflictResolution::Unresolvable { terminal, reduce_production, .. } => write!(
                f,
                "shift/reduce on {}: production {} has NONE associativity, unresolvable",
                terminal, reduce_production
            ),
        }
    }
}

/// Applies §4.6's shift/reduce and reduce/reduce policy and records every decision it
/// makes for the table builder's diagnostic report.
pub struct ConflictResolver {
    precedence: PrecedenceTable,
}

impl ConflictResolver {
    pub fn new(precedence: PrecedenceTable) -> Self {
        ConflictResolver { precedence }
    }

    pub fn precedence_table(&self) -> &PrecedenceTable {
        &self.precedence
    }

    /// Resolve a shift (on `terminal`, to `shift_state`) competing with a reduce by
    /// `reduce_production`. Returns `Some(true)` to keep the shift, `Some(false)` to
    /// replace it with the reduce, or `None` if the conflict is unresolvable (NONE
    /// associativity at equal precedence).
    pub fn resolve_shift_reduce(
        &self,
        terminal: Terminal,
        shift_state: usize,
        reduce_production: &Production,
    ) -> (Option<bool>, ConflictResolution) {
        let prec_shift = self.precedence.precedence_of_terminal(terminal);
        let prec_reduce = self.precedence.precedence_of_production(reduce_production);

        if prec_shift > prec_reduce {
            (
                Some(true),
                ConflictResolution::ShiftWins {
                    terminal,
                    shift_state,
                    reduce_production: reduce_production.id,
                },
            )
        } else if prec_shift < prec_reduce {
            (
                Some(false),
                ConflictResolution::ReduceWins {
                    terminal,
                    shift_state,
                    reduce_production: reduce_production.id,
                },
            )
        } else {
            match self.precedence.associativity_of(terminal) {
                Some(Associativity::Left) => (
                    Some(false),
                    ConflictResolution::ReduceWins {
                        terminal,
                        shift_state,
                        reduce_production: reduce_production.id,
                    },
                ),
                Some(Associativity::Right) | None => (
                    Some(true),
                    ConflictResolution::ShiftWins {
                        terminal,
                        shift_state,
                        reduce_production: reduce_production.id,
                    },
                ),
                Some(Associativity::None) => (
                    None,
                    ConflictResolution::Unresolvable {
                        terminal,
                        shift_state,
                        reduce_production: reduce_production.id,
                    },
                ),
            }
        }
    }

    /// Resolve a reduce/reduce conflict between `p1` and `p2` at `terminal`. Returns the
    /// winning production's id.
    pub fn resolve_reduce_reduce(
        &self,
        terminal: Terminal,
        p1: &Production,
        p2: &Production,
    ) -> (i32, ConflictResolution) {
        let prec1 = self.precedence.precedence_of_production(p1);
        let prec2 = self.precedence.precedence_of_production(p2);

        if prec1 != prec2 {
            let (winner, loser) = if prec1 > prec2 { (p1, p2) } else { (p2, p1) };
            (
                winner.id,
                ConflictResolution::ReduceReduceByPrecedence {
                    terminal,
                    winner: winner.id,
                    loser: loser.id,
                },
            )
        } else {
            let (winner, loser) = if p1.id < p2.id { (p1, p2) } else { (p2, p1) };
            (
                winner.id,
                ConflictResolution::ReduceReduceByLowerId {
                    terminal,
                    winner: winner.id,
                    loser: loser.id,
                },
            )
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        ConflictResolver::new(PrecedenceTable::default_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[test]
    fn power_outranks_multiply_by_precedence() {
        let table = PrecedenceTable::default_table();
        assert!(table.precedence_of_terminal(Terminal::Power) > table.precedence_of_terminal(Terminal::Multiply));
    }

    #[test]
    fn left_associative_operator_prefers_reduce_at_equal_precedence() {
        let resolver = ConflictResolver::default();
        let grammar = Grammar::new();
        let plus_production = grammar.get_production(11).unwrap(); // ARITH_EXPR -> ARITH_EXPR + TERM
        let (keep_shift, _) = resolver.resolve_shift_reduce(Terminal::Plus, 42, plus_production);
        assert_eq!(keep_shift, Some(false));
    }

    #[test]
    fn right_associative_operator_prefers_shift_at_equal_precedence() {
        let resolver = ConflictResolver::default();
        let grammar = Grammar::new();
        let power_production = grammar.get_production(18).unwrap(); // FACTOR -> PRIMARY ^ FACTOR
        let (keep_shift, _) = resolver.resolve_shift_reduce(Terminal::Power, 7, power_production);
        assert_eq!(keep_shift, Some(true));
    }

    #[test]
    fn reduce_reduce_prefers_lower_id_at_equal_precedence() {
        let resolver = ConflictResolver::default();
        let grammar = Grammar::new();
        let p25 = grammar.get_production(25).unwrap();
        let p26 = grammar.get_production(26).unwrap();
        let (winner, _) = resolver.resolve_reduce_reduce(Terminal::Dollar, p26, p25);
        assert_eq!(winner, 25);
    }
}
