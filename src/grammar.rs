//! The fixed expression grammar: productions, the augmented start production, and the
//! validity checks that guard against a malformed table ever being built from it.

use std::fmt::{self, Display, Formatter};

use once_cell::unsync::OnceCell;

use crate::builder::BuilderKind;
use crate::first_follow::FirstFollowTables;
use crate::token::{NonTerminal, Symbol, Terminal};

/// Id of the augmented production (`START → EXPR DOLLAR`), per the data model's invariant
/// that it is always `-1`.
pub const AUGMENTED_PRODUCTION_ID: i32 = -1;

#[derive(Debug, Clone)]
pub struct Production {
    pub id: i32,
    pub name: &'static str,
    pub left: NonTerminal,
    pub right: Vec<Symbol>,
    pub builder: BuilderKind,
}

impl Production {
    pub fn is_augmented(&self) -> bool {
        self.id == AUGMENTED_PRODUCTION_ID
    }
}

impl PartialEq for Production {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Production {}

impl Display for Production {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} →", self.id, self.left)?;
        if self.right.is_empty() {
            write!(f, " ε")?;
        } else {
            for sym in &self.right {
                write!(f, " {}", sym)?;
            }
        }
        Ok(())
    }
}

/// A grammar failed one of the invariants checked by [`Grammar::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    pub message: String,
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "GrammarError: {}", self.message)
    }
}

/// The fixed grammar of expressions, built once via [`Grammar::new`] and read-only
/// thereafter.
pub struct Grammar {
    productions: Vec<Production>,
    augmented: Production,
    start_symbol: NonTerminal,
    first_follow: OnceCell<FirstFollowTables>,
}

macro_rules! prod {
    ($id:expr, $name:expr, $left:expr, [$($right:expr),* $(,)?], $builder:expr) => {
        Production {
            id: $id,
            name: $name,
            left: $left,
            right: vec![$($right),*],
            builder: $builder,
        }
    };
}

impl Grammar {
    /// Construct the default grammar of §6: 34 user productions (ids 0..33) plus the
    /// augmented start production (id -1).
    pub fn new() -> Self {
        use NonTerminal::*;
        use Symbol::NonTerminal as NT;
        use Symbol::Terminal as T;
        use Terminal::*;

        let productions = vec![
            prod!(0, "expr_or", Expr, [NT(Expr), T(Or), NT(AndExpr)], BuilderKind::BinaryOp("||")),
            prod!(1, "expr_pass", Expr, [NT(AndExpr)], BuilderKind::Identity),
            prod!(2, "and_expr_and", AndExpr, [NT(AndExpr), T(And), NT(CompExpr)], BuilderKind::BinaryOp("&&")),
            prod!(3, "and_expr_pass", AndExpr, [NT(CompExpr)], BuilderKind::Identity),
            prod!(4, "comp_eq", CompExpr, [NT(CompExpr), T(Equal), NT(ArithExpr)], BuilderKind::BinaryOp("==")),
            prod!(5, "comp_neq", CompExpr, [NT(CompExpr), T(NotEqual), NT(ArithExpr)], BuilderKind::BinaryOp("!=")),
            prod!(6, "comp_lt", CompExpr, [NT(CompExpr), T(Less), NT(ArithExpr)], BuilderKind::BinaryOp("<")),
            prod!(7, "comp_le", CompExpr, [NT(CompExpr), T(LessEqual), NT(ArithExpr)], BuilderKind::BinaryOp("<=")),
            prod!(8, "comp_gt", CompExpr, [NT(CompExpr), T(Greater), NT(ArithExpr)], BuilderKind::BinaryOp(">")),
            prod!(9, "comp_ge", CompExpr, [NT(CompExpr), T(GreaterEqual), NT(ArithExpr)], BuilderKind::BinaryOp(">=")),
            prod!(10, "comp_pass", CompExpr, [NT(ArithExpr)], BuilderKind::Identity),
            prod!(11, "arith_add", ArithExpr, [NT(ArithExpr), T(Plus), NT(Term)], BuilderKind::BinaryOp("+")),
            prod!(12, "arith_sub", ArithExpr, [NT(ArithExpr), T(Minus), NT(Term)], BuilderKind::BinaryOp("-")),
            prod!(13, "arith_pass", ArithExpr, [NT(Term)], BuilderKind::Identity),
            prod!(14, "term_mul", Term, [NT(Term), T(Multiply), NT(Factor)], BuilderKind::BinaryOp("*")),
            prod!(15, "term_div", Term, [NT(Term), T(Divide), NT(Factor)], BuilderKind::BinaryOp("/")),
            prod!(16, "term_mod", Term, [NT(Term), T(Modulo), NT(Factor)], BuilderKind::BinaryOp("%")),
            prod!(17, "term_pass", Term, [NT(Factor)], BuilderKind::Identity),
            prod!(18, "factor_pow", Factor, [NT(Primary), T(Power), NT(Factor)], BuilderKind::BinaryOp("^")),
            prod!(19, "factor_pass", Factor, [NT(Primary)], BuilderKind::Identity),
            prod!(20, "primary_paren", Primary, [T(LeftParen), NT(Expr), T(RightParen)], BuilderKind::Parenthesized),
            prod!(21, "primary_neg", Primary, [T(Minus), NT(Primary)], BuilderKind::UnaryOp("-")),
            prod!(22, "primary_pos", Primary, [T(Plus), NT(Primary)], BuilderKind::UnaryOp("+")),
            prod!(23, "primary_not", Primary, [T(Not), NT(Primary)], BuilderKind::UnaryOp("!")),
            prod!(24, "primary_number", Primary, [T(Number)], BuilderKind::Number),
            prod!(25, "primary_variable", Primary, [T(Variable)], BuilderKind::Variable),
            prod!(26, "primary_identifier", Primary, [T(Identifier)], BuilderKind::Variable),
            prod!(27, "primary_true", Primary, [T(True)], BuilderKind::BooleanTrue),
            prod!(28, "primary_false", Primary, [T(False)], BuilderKind::BooleanFalse),
            prod!(29, "primary_call", Primary, [T(Identifier), T(LeftParen), NT(Args), T(RightParen)], BuilderKind::FunctionCall),
            prod!(30, "primary_call_empty", Primary, [T(Identifier), T(LeftParen), T(RightParen)], BuilderKind::FunctionCallEmpty),
            prod!(31, "primary_if", Primary, [T(If), T(LeftParen), NT(Expr), T(Comma), NT(Expr), T(Comma), NT(Expr), T(RightParen)], BuilderKind::If),
            prod!(32, "args_single", Args, [NT(Expr)], BuilderKind::ArgsSingle),
            prod!(33, "args_multiple", Args, [NT(Args), T(Comma), NT(Expr)], BuilderKind::ArgsMultiple),
        ];

        let augmented = prod!(
            AUGMENTED_PRODUCTION_ID,
            "start",
            Start,
            [NT(Expr), T(Dollar)],
            BuilderKind::Start
        );

        Grammar {
            productions,
            augmented,
            start_symbol: Start,
            first_follow: OnceCell::new(),
        }
    }

    /// FIRST/FOLLOW tables for this grammar, computed on first use and cached for the
    /// lifetime of this `Grammar`.
    pub fn first_follow(&self) -> &FirstFollowTables {
        self.first_follow.get_or_init(|| FirstFollowTables::compute(self))
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn augmented_production(&self) -> &Production {
        &self.augmented
    }

    pub fn start_symbol(&self) -> NonTerminal {
        self.start_symbol
    }

    pub fn get_production(&self, id: i32) -> Option<&Production> {
        if id == AUGMENTED_PRODUCTION_ID {
            return Some(&self.augmented);
        }
        self.productions.get(usize::try_from(id).ok()?)
    }

    pub fn productions_for(&self, nt: NonTerminal) -> impl Iterator<Item = &Production> {
        self.productions.iter().filter(move |p| p.left == nt)
    }

    pub fn terminals(&self) -> &'static [Terminal] {
        Terminal::ALL
    }

    pub fn non_terminals(&self) -> &'static [NonTerminal] {
        NonTerminal::ALL
    }

    /// Check invariants 1, 2, 3, 4 of the data model against this grammar instance.
    pub fn is_valid(&self) -> Result<(), GrammarError> {
        if self.augmented.left != self.start_symbol
            || self.augmented.right.len() != 2
            || self.augmented.right.first() != Some(&Symbol::NonTerminal(NonTerminal::Expr))
            || self.augmented.right.get(1) != Some(&Symbol::Terminal(Terminal::Dollar))
        {
            return Err(GrammarError {
                message: "augmented production must have the form START -> EXPR DOLLAR".into(),
            });
        }

        for (index, production) in self.productions.iter().enumerate() {
            if production.id != index as i32 {
                return Err(GrammarError {
                    message: format!(
                        "production ids must be dense and index-aligned; found id {} at index {}",
                        production.id, index
                    ),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for production in self.productions.iter().chain(std::iter::once(&self.augmented)) {
            if !seen.insert(production.id) {
                return Err(GrammarError {
                    message: format!("duplicate production id {}", production.id),
                });
            }
        }

        Ok(())
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Grammar::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grammar_has_34_user_productions_plus_augmented() {
        let grammar = Grammar::new();
        assert_eq!(grammar.productions().len(), 34);
        assert_eq!(grammar.augmented_production().id, AUGMENTED_PRODUCTION_ID);
    }

    #[test]
    fn default_grammar_is_valid() {
        assert!(Grammar::new().is_valid().is_ok());
    }

    #[test]
    fn production_ids_are_dense_and_index_aligned() {
        let grammar = Grammar::new();
        for (index, production) in grammar.productions().iter().enumerate() {
            assert_eq!(production.id as usize, index);
        }
    }

    #[test]
    fn get_production_resolves_augmented_id() {
        let grammar = Grammar::new();
        assert!(grammar.get_production(-1).unwrap().is_augmented());
        assert_eq!(grammar.get_production(18).unwrap().name, "factor_pow");
        assert!(grammar.get_production(999).is_none());
    }

    #[test]
    fn productions_for_groups_by_left_hand_side() {
        let grammar = Grammar::new();
        let primary_count = grammar.productions_for(NonTerminal::Primary).count();
        assert_eq!(primary_count, 12);
    }
}
