//! A compiler front-end for a small calculator expression language: a hand-written lexer,
//! a grammar of 34 productions compiled into a canonical LR(1) table with LALR-style state
//! merging, and a shift/reduce driver that turns a token stream into an [`AstNode`].
//!
//! # Pipeline
//!
//! ```text
//! source text --lex--> tokens --parse (using a compiled table)--> AstNode
//! ```
//!
//! `compile` builds the [`ParsingTable`] once from the default [`Grammar`]; the resulting
//! table is immutable and may be reused, cached (see [`cache::TableCache`]), and shared
//! across any number of concurrent parses, each of which owns its own [`Parser`] state.
//!
//! # Example
//!
//! ```
//! use calcexpr::{compile_default_grammar, lex, parse};
//! use calcexpr::parser::ParserOptions;
//!
//! let table = compile_default_grammar().unwrap();
//! let grammar = calcexpr::grammar::Grammar::new();
//! let (tokens, errors) = lex("1 + 2 * 3");
//! assert!(errors.is_empty());
//! let ast = parse(&grammar, &table, &tokens, ParserOptions::default()).unwrap();
//! assert_eq!(ast.to_string(), "BinaryOp(+)");
//! ```

pub mod ast;
pub mod builder;
pub mod cache;
pub mod conflict;
pub mod error;
pub mod first_follow;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod table;
pub mod token;
pub mod util;

pub use ast::AstNode;
pub use error::CompileError;
pub use grammar::Grammar;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseFailure, ParseProgress, Parser, ParserOptions};
pub use table::{ParsingTable, TableBuildOptions, TableBuildReport};
pub use token::Token;

/// Tokenize `source`. Never fails outright: malformed input is reported in the returned
/// error list alongside a best-effort token stream (§4.1).
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::tokenize(source)
}

/// Compile a grammar into a [`ParsingTable`] using the default table-build options and
/// operator-precedence rules. Pure in `grammar`; the result may be cached by a structural
/// hash of the grammar's productions (see [`cache::structural_hash`]).
pub fn compile(grammar: &Grammar) -> Result<ParsingTable, CompileError> {
    grammar.is_valid()?;
    let (table, _report) =
        table::TableBuilder::new(TableBuildOptions::default(), conflict::ConflictResolver::default()).build(grammar)?;
    Ok(table)
}

/// Compile the default expression grammar (§6) in one call.
pub fn compile_default_grammar() -> Result<ParsingTable, CompileError> {
    compile(&Grammar::new())
}

/// Parse a complete token slice against a compiled table, producing an [`AstNode`] or a
/// [`ParseFailure`].
pub fn parse(
    grammar: &Grammar,
    table: &ParsingTable,
    tokens: &[Token],
    options: ParserOptions,
) -> Result<AstNode, ParseFailure> {
    Parser::new(grammar, table, options).parse(tokens)
}

/// Parse from an iterator of tokens, reporting progress at batch boundaries and checking
/// `is_cancelled` at every step (§4.5 streaming API, §5 suspension points). Semantics are
/// identical to [`parse`].
pub fn parse_streaming(
    grammar: &Grammar,
    table: &ParsingTable,
    tokens: impl Iterator<Item = Token>,
    options: ParserOptions,
    on_progress: impl FnMut(ParseProgress),
    is_cancelled: &dyn Fn() -> bool,
) -> Result<AstNode, ParseFailure> {
    Parser::new(grammar, table, options).parse_streaming(tokens, on_progress, is_cancelled)
}

/// Incremental reparse (§4.5): reparses `tokens` fully regardless of `previous`/
/// `change_start_index`, per the placeholder contract — "re-parse fully... implementers
/// may do better but must not regress correctness". See [`Parser::reparse`].
pub fn reparse(
    grammar: &Grammar,
    table: &ParsingTable,
    previous: Option<&AstNode>,
    change_start_index: usize,
    tokens: &[Token],
    options: ParserOptions,
) -> Result<AstNode, ParseFailure> {
    Parser::new(grammar, table, options).reparse(previous, change_start_index, tokens)
}

#[cfg(test)]
mod hand_table;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_pipeline_compiles_lexes_and_parses() {
        let grammar = Grammar::new();
        let table = compile(&grammar).unwrap();
        let (tokens, errors) = lex("2 * (3 + 4) - 1");
        assert!(errors.is_empty());
        let ast = parse(&grammar, &table, &tokens, ParserOptions::default()).unwrap();
        assert_eq!(ast.node_count(), 7);
    }

    #[test]
    fn compile_default_grammar_matches_compiling_a_fresh_default_grammar() {
        let table_a = compile_default_grammar().unwrap();
        let table_b = compile(&Grammar::new()).unwrap();
        assert_eq!(table_a.states().len(), table_b.states().len());
    }

    #[test]
    fn lex_always_terminates_the_token_stream_with_dollar() {
        let (tokens, _) = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, token::Terminal::Dollar);
    }
}
