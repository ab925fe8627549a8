//! FIRST/FOLLOW fixed-point computation over a [`Grammar`], memoized once per grammar
//! instance since both tables are pure functions of the production list.

use std::collections::{HashMap, HashSet};

use crate::grammar::Grammar;
use crate::token::{NonTerminal, Symbol, Terminal};

/// FIRST(A) and FOLLOW(A) for every non-terminal A of a grammar, computed once and then
/// read-only.
#[derive(Debug, Clone)]
pub struct FirstFollowTables {
    first: HashMap<NonTerminal, HashSet<Terminal>>,
    follow: HashMap<NonTerminal, HashSet<Terminal>>,
}

impl FirstFollowTables {
    /// Run both fixed-point computations to completion.
    pub fn compute(grammar: &Grammar) -> Self {
        let first = compute_first(grammar);
        let follow = compute_follow(grammar, &first);
        FirstFollowTables { first, follow }
    }

    pub fn first_of_non_terminal(&self, nt: NonTerminal) -> &HashSet<Terminal> {
        static EMPTY: once_cell::sync::Lazy<HashSet<Terminal>> =
            once_cell::sync::Lazy::new(HashSet::new);
        self.first.get(&nt).unwrap_or(&EMPTY)
    }

    pub fn follow_of(&self, nt: NonTerminal) -> &HashSet<Terminal> {
        static EMPTY: once_cell::sync::Lazy<HashSet<Terminal>> =
            once_cell::sync::Lazy::new(HashSet::new);
        self.follow.get(&nt).unwrap_or(&EMPTY)
    }

    /// FIRST of a symbol: `{t}` for a terminal, the memoized FIRST set for a non-terminal.
    pub fn first_of_symbol(&self, sym: Symbol) -> HashSet<Terminal> {
        match sym {
            Symbol::Terminal(t) => {
                let mut set = HashSet::new();
                set.insert(t);
                set
            }
            Symbol::NonTerminal(nt) => self.first_of_non_terminal(nt).clone(),
        }
    }

    /// FIRST of a symbol sequence followed by a trailing lookahead terminal, as used by
    /// the table builder's closure operation: `FIRST(β a)` where `β` is `tail` and `a` is
    /// `trailing`.
    pub fn first_of_sequence(&self, tail: &[Symbol], trailing: Terminal) -> HashSet<Terminal> {
        let mut result = HashSet::new();
        let mut all_nullable_so_far = true;

        for sym in tail {
            if !all_nullable_so_far {
                break;
            }
            match sym {
                Symbol::Terminal(Terminal::Epsilon) => continue,
                Symbol::Terminal(t) => {
                    result.insert(*t);
                    all_nullable_so_far = false;
                }
                Symbol::NonTerminal(nt) => {
                    let first_nt = self.first_of_non_terminal(*nt);
                    let nullable = first_nt.contains(&Terminal::Epsilon);
                    for t in first_nt {
                        if *t != Terminal::Epsilon {
                            result.insert(*t);
                        }
                    }
                    all_nullable_so_far = nullable;
                }
            }
        }

        if all_nullable_so_far {
            result.insert(trailing);
        }

        result
    }
}

fn compute_first(grammar: &Grammar) -> HashMap<NonTerminal, HashSet<Terminal>> {
    let mut first: HashMap<NonTerminal, HashSet<Terminal>> = grammar
        .non_terminals()
        .iter()
        .map(|nt| (*nt, HashSet::new()))
        .collect();

    loop {
        let mut changed = false;

        for production in grammar.productions() {
            let addition = first_of_rhs(&production.right, &first);
            let entry = first.get_mut(&production.left).unwrap();
            for t in addition {
                changed |= entry.insert(t);
            }
        }

        if !changed {
            break;
        }
    }

    first
}

/// FIRST of a right-hand-side symbol sequence under the FIRST table computed so far
/// (possibly partial, mid fixed-point). An empty sequence (ε-production) contributes
/// `{EPSILON}`.
fn first_of_rhs(
    rhs: &[Symbol],
    first: &HashMap<NonTerminal, HashSet<Terminal>>,
) -> HashSet<Terminal> {
    if rhs.is_empty() {
        let mut set = HashSet::new();
        set.insert(Terminal::Epsilon);
        return set;
    }

    let mut result = HashSet::new();
    let mut all_nullable_so_far = true;

    for sym in rhs {
        if !all_nullable_so_far {
            break;
        }
        match sym {
            Symbol::Terminal(Terminal::Epsilon) => continue,
            Symbol::Terminal(t) => {
                result.insert(*t);
                all_nullable_so_far = false;
            }
            Symbol::NonTerminal(nt) => {
                let first_nt = first.get(nt).cloned().unwrap_or_default();
                let nullable = first_nt.contains(&Terminal::Epsilon);
                for t in &first_nt {
                    if *t != Terminal::Epsilon {
                        result.insert(*t);
                    }
                }
                all_nullable_so_far = nullable;
            }
        }
    }

    if all_nullable_so_far {
        result.insert(Terminal::Epsilon);
    }

    result
}

fn compute_follow(
    grammar: &Grammar,
    first: &HashMap<NonTerminal, HashSet<Terminal>>,
) -> HashMap<NonTerminal, HashSet<Terminal>> {
    let mut follow: HashMap<NonTerminal, HashSet<Terminal>> = grammar
        .non_terminals()
        .iter()
        .map(|nt| (*nt, HashSet::new()))
        .collect();

    follow
        .get_mut(&grammar.start_symbol())
        .unwrap()
        .insert(Terminal::Dollar);

    loop {
        let mut changed = false;

        for production in grammar.productions().iter().chain(std::iter::once(grammar.augmented_production())) {
            let rhs = &production.right;
            for (i, sym) in rhs.iter().enumerate() {
                let Symbol::NonTerminal(b) = sym else {
                    continue;
                };
                let beta = &rhs[i + 1..];
                let first_beta = first_of_rhs(beta, first);
                let beta_nullable = first_beta.contains(&Terminal::Epsilon);

                let entry = follow.get_mut(b).unwrap();
                for t in first_beta.iter().filter(|t| **t != Terminal::Epsilon) {
                    changed |= entry.insert(*t);
                }

                if beta_nullable {
                    let follow_left = follow.get(&production.left).cloned().unwrap_or_default();
                    let entry = follow.get_mut(b).unwrap();
                    for t in follow_left {
                        changed |= entry.insert(t);
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    follow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_is_in_first_of_every_expression_level() {
        let grammar = Grammar::new();
        let tables = FirstFollowTables::compute(&grammar);
        for nt in [
            NonTerminal::Expr,
            NonTerminal::AndExpr,
            NonTerminal::CompExpr,
            NonTerminal::ArithExpr,
            NonTerminal::Term,
            NonTerminal::Factor,
            NonTerminal::Primary,
        ] {
            assert!(
                tables.first_of_non_terminal(nt).contains(&Terminal::Number),
                "NUMBER missing from FIRST({:?})",
                nt
            );
        }
    }

    #[test]
    fn follow_of_start_contains_dollar() {
        let grammar = Grammar::new();
        let tables = FirstFollowTables::compute(&grammar);
        assert!(tables.follow_of(NonTerminal::Start).contains(&Terminal::Dollar));
    }

    #[test]
    fn follow_of_expr_contains_right_paren_and_comma_from_call_and_if_contexts() {
        let grammar = Grammar::new();
        let tables = FirstFollowTables::compute(&grammar);
        let follow_expr = tables.follow_of(NonTerminal::Expr);
        assert!(follow_expr.contains(&Terminal::RightParen));
        assert!(follow_expr.contains(&Terminal::Comma));
        assert!(follow_expr.contains(&Terminal::Dollar));
    }

    #[test]
    fn first_of_sequence_falls_through_nullable_prefix_to_trailing_lookahead() {
        let grammar = Grammar::new();
        let tables = FirstFollowTables::compute(&grammar);
        // An empty tail always falls through to the trailing lookahead.
        let result = tables.first_of_sequence(&[], Terminal::Dollar);
        assert_eq!(result.len(), 1);
        assert!(result.contains(&Terminal::Dollar));
    }
}
