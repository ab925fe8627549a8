//! The shift/reduce parser driver: a state-id stack, a parallel symbol stack, and a single
//! loop shared by the batch and streaming entry points.

use std::fmt::{self, Display, Formatter};

use crate::ast::AstNode;
use crate::builder::{apply_builder, InternalInvariantError, StackEntry};
use crate::grammar::Grammar;
use crate::table::{Action, ParsingTable};
use crate::token::{Terminal, Token};
use crate::util::{Level, Log};

/// The parser encountered a token with no matching action in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offending_token: Token,
    pub state: usize,
    pub expected: Vec<Terminal>,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyntaxError: unexpected {} in state {}, expected one of {:?}",
            self.offending_token, self.state, self.expected
        )
    }
}

/// A configured resource bound was exceeded during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimitError {
    pub message: String,
}

impl Display for ResourceLimitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceLimitError: {}", self.message)
    }
}

/// Everything that can stop a parse short of a returned AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    Syntax(SyntaxError),
    ResourceLimit(ResourceLimitError),
    Internal(InternalInvariantError),
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Syntax(e) => Display::fmt(e, f),
            ParseFailure::ResourceLimit(e) => Display::fmt(e, f),
            ParseFailure::Internal(e) => Display::fmt(e, f),
        }
    }
}

impl From<SyntaxError> for ParseFailure {
    fn from(e: SyntaxError) -> Self {
        ParseFailure::Syntax(e)
    }
}
impl From<ResourceLimitError> for ParseFailure {
    fn from(e: ResourceLimitError) -> Self {
        ParseFailure::ResourceLimit(e)
    }
}
impl From<InternalInvariantError> for ParseFailure {
    fn from(e: InternalInvariantError) -> Self {
        ParseFailure::Internal(e)
    }
}

/// Options governing a single parse (§5 resource model, §4.5 error recovery mode).
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub error_recovery: bool,
    pub debug: bool,
    pub max_steps: usize,
    pub max_depth: usize,
    pub max_tokens: usize,
    /// Number of consecutive failed shifts error recovery tolerates before giving up and
    /// surfacing a partial-AST failure.
    pub max_recovery_attempts: usize,
    /// How many tokens the streaming API consumes between progress callbacks.
    pub streaming_batch_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            error_recovery: false,
            debug: false,
            max_steps: 1_000_000,
            max_depth: 10_000,
            max_tokens: 1_000_000,
            max_recovery_attempts: 10,
            streaming_batch_size: 256,
        }
    }
}

/// Terminals panic-mode recovery synchronizes on: skip tokens until one of these (or
/// DOLLAR) is seen, then resume.
const SYNCHRONIZING_TERMINALS: &[Terminal] = &[Terminal::RightParen, Terminal::Comma, Terminal::Dollar];

/// Progress reported by the streaming API at batch boundaries.
#[derive(Debug, Clone, Copy)]
pub struct ParseProgress {
    pub tokens_consumed: usize,
    pub steps_taken: usize,
    pub stack_depth: usize,
}

/// A driver bound to one grammar/table pair. Not `Sync` across a single in-progress parse
/// (§5: "a single driver instance is not shared across threads") but the table and grammar
/// it borrows are themselves `Send + Sync` and may back many concurrently-running drivers.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    table: &'g ParsingTable,
    options: ParserOptions,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g ParsingTable, options: ParserOptions) -> Self {
        Parser { grammar, table, options }
    }

    /// Parse a complete token slice in one call.
    pub fn parse(&self, tokens: &[Token]) -> Result<AstNode, ParseFailure> {
        if tokens.len() > self.options.max_tokens {
            return Err(ResourceLimitError {
                message: format!(
                    "input has {} tokens, exceeding maxTokenCount of {}",
                    tokens.len(),
                    self.options.max_tokens
                ),
            }
            .into());
        }
        let mut iter = tokens.iter().cloned();
        self.drive(&mut iter, None, &|| false)
    }

    /// Parse from an iterator of tokens, invoking `on_progress` every
    /// `options.streaming_batch_size` tokens consumed, and `is_cancelled` at every step and
    /// at each progress boundary.
    pub fn parse_streaming(
        &self,
        tokens: impl Iterator<Item = Token>,
        mut on_progress: impl FnMut(ParseProgress),
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<AstNode, ParseFailure> {
        let mut iter = tokens;
        self.drive(&mut iter, Some(&mut on_progress), is_cancelled)
    }

    /// Incremental reparse (§4.5's placeholder contract): if `previous` is `None` or
    /// `change_start_index` is 0, reparse `tokens` fully. Every other `change_start_index`
    /// value also reparses fully today — the spec allows an implementer to do better but
    /// forbids regressing correctness, and this driver has no machinery yet for resuming a
    /// parse from a partial stack snapshot. `previous` is accepted (and ignored) so the
    /// signature matches the contract callers are meant to code against.
    pub fn reparse(
        &self,
        previous: Option<&AstNode>,
        change_start_index: usize,
        tokens: &[Token],
    ) -> Result<AstNode, ParseFailure> {
        let _ = (previous, change_start_index);
        self.parse(tokens)
    }

    fn drive(
        &self,
        tokens: &mut dyn Iterator<Item = Token>,
        mut on_progress: Option<&mut dyn FnMut(ParseProgress)>,
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<AstNode, ParseFailure> {
        let log: Log<String> = if self.options.debug { Log::Verbose(String::new()) } else { Log::None };

        let mut state_stack: Vec<usize> = vec![self.table.start_state()];
        let mut symbol_stack: Vec<StackEntry> = Vec::new();

        let mut current = tokens.next().unwrap_or_else(|| Token::dollar(crate::util::Position::start()));
        let mut tokens_consumed = 1usize;
        let mut steps = 0usize;
        let mut recovery_attempts = 0usize;

        loop {
            if is_cancelled() {
                return Err(ResourceLimitError {
                    message: "parse was cancelled".into(),
                }
                .into());
            }

            steps += 1;
            if steps > self.options.max_steps {
                return Err(ResourceLimitError {
                    message: format!("exceeded maxParsingSteps ({})", self.options.max_steps),
                }
                .into());
            }
            if state_stack.len() > self.options.max_depth {
                return Err(ResourceLimitError {
                    message: format!("exceeded maxStackDepth ({})", self.options.max_depth),
                }
                .into());
            }

            if let Some(cb) = on_progress.as_deref_mut() {
                if tokens_consumed % self.options.streaming_batch_size == 0 {
                    cb(ParseProgress {
                        tokens_consumed,
                        steps_taken: steps,
                        stack_depth: state_stack.len(),
                    });
                    if is_cancelled() {
                        return Err(ResourceLimitError {
                            message: "parse was cancelled".into(),
                        }
                        .into());
                    }
                }
            }

            let top = *state_stack.last().unwrap();
            let action = self.table.action(top, current.kind).cloned();

            log.emit(Level::Verbose, || {
                format!("state {} token {} action {:?}", top, current, action)
            });

            match action {
                Some(Action::Shift(next_state)) => {
                    symbol_stack.push(StackEntry::Token(current.clone()));
                    state_stack.push(next_state);
                    recovery_attempts = 0;
                    current = tokens.next().unwrap_or_else(|| Token::dollar(current.position));
                    tokens_consumed += 1;
                }
                Some(Action::Reduce(production_id)) => {
                    let production = self
                        .grammar
                        .get_production(production_id)
                        .ok_or_else(|| InternalInvariantError {
                            builder: crate::builder::BuilderKind::Identity,
                            message: format!("reduce referenced unknown production id {}", production_id),
                        })?;
                    let arity = production.right.len();
                    if symbol_stack.len() < arity || state_stack.len() <= arity {
                        return Err(InternalInvariantError {
                            builder: production.builder,
                            message: "reduce popped past the bottom of the stack".into(),
                        }
                        .into());
                    }
                    let children: Vec<StackEntry> = symbol_stack.split_off(symbol_stack.len() - arity);
                    state_stack.truncate(state_stack.len() - arity);

                    let result = apply_builder(production.builder, children)?;
                    symbol_stack.push(result);

                    let new_top = *state_stack.last().unwrap();
                    let goto_state = self.table.goto(new_top, production.left).ok_or_else(|| {
                        InternalInvariantError {
                            builder: production.builder,
                            message: format!(
                                "no goto entry for state {} on non-terminal {}",
                                new_top, production.left
                            ),
                        }
                    })?;
                    state_stack.push(goto_state);
                }
                Some(Action::Accept) => {
                    return symbol_stack
                        .pop()
                        .and_then(StackEntry::into_node)
                        .ok_or_else(|| {
                            InternalInvariantError {
                                builder: crate::builder::BuilderKind::Start,
                                message: "accept reached with an empty or non-node symbol stack".into(),
                            }
                            .into()
                        });
                }
                Some(Action::Error(message)) => {
                    return Err(InternalInvariantError {
                        builder: crate::builder::BuilderKind::Identity,
                        message: format!("table contains an unresolved conflict: {}", message),
                    }
                    .into());
                }
                None => {
                    let expected = self.table.expected_terminals(top);
                    let syntax_error = SyntaxError {
                        offending_token: current.clone(),
                        state: top,
                        expected,
                    };

                    if !self.options.error_recovery {
                        return Err(syntax_error.into());
                    }

                    recovery_attempts += 1;
                    if recovery_attempts > self.options.max_recovery_attempts {
                        return Err(syntax_error.into());
                    }

                    if current.kind == Terminal::Dollar {
                        return Err(syntax_error.into());
                    }

                    while !SYNCHRONIZING_TERMINALS.contains(&current.kind) {
                        current = tokens.next().unwrap_or_else(|| Token::dollar(current.position));
                        tokens_consumed += 1;
                        if current.kind == Terminal::Dollar {
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::table::TableBuilder;

    fn parse_str(source: &str) -> Result<AstNode, ParseFailure> {
        let grammar = Grammar::new();
        let (table, _) = TableBuilder::default().build(&grammar).unwrap();
        let (tokens, lex_errors) = Lexer::tokenize(source);
        assert!(lex_errors.is_empty(), "unexpected lex errors: {:?}", lex_errors);
        let parser = Parser::new(&grammar, &table, ParserOptions::default());
        parser.parse(&tokens)
    }

    #[test]
    fn parses_simple_arithmetic_with_correct_precedence() {
        let ast = parse_str("1 + 2 * 3").unwrap();
        assert_eq!(
            ast,
            AstNode::binary_op(
                "+",
                AstNode::Number(1.0),
                AstNode::binary_op("*", AstNode::Number(2.0), AstNode::Number(3.0))
            )
        );
    }

    #[test]
    fn power_is_right_associative() {
        let ast = parse_str("2 ^ 3 ^ 2").unwrap();
        assert_eq!(
            ast,
            AstNode::binary_op(
                "^",
                AstNode::Number(2.0),
                AstNode::binary_op("^", AstNode::Number(3.0), AstNode::Number(2.0))
            )
        );
    }

    #[test]
    fn parenthesized_expression_overrides_precedence() {
        let ast = parse_str("(1 + 2) * 3").unwrap();
        assert_eq!(
            ast,
            AstNode::binary_op("*", AstNode::binary_op("+", AstNode::Number(1.0), AstNode::Number(2.0)), AstNode::Number(3.0))
        );
    }

    #[test]
    fn function_call_and_if_parse() {
        let ast = parse_str("if(x > 0, max(x, 1), 0)").unwrap();
        assert_eq!(
            ast,
            AstNode::if_node(
                AstNode::binary_op(">", AstNode::Variable("x".into()), AstNode::Number(0.0)),
                AstNode::FunctionCall {
                    name: "max".into(),
                    args: vec![AstNode::Variable("x".into()), AstNode::Number(1.0)],
                },
                AstNode::Number(0.0),
            )
        );
    }

    #[test]
    fn unmatched_paren_is_a_syntax_error_in_strict_mode() {
        let err = parse_str("(1 + 2").unwrap_err();
        assert!(matches!(err, ParseFailure::Syntax(_)));
    }

    #[test]
    fn error_recovery_skips_to_a_synchronizing_terminal_and_resumes() {
        let grammar = Grammar::new();
        let (table, _) = TableBuilder::default().build(&grammar).unwrap();
        // The stray extra "1" before the comma has no valid action; recovery mode skips
        // forward to the next synchronizing terminal (COMMA here) and resumes.
        let (tokens, _) = Lexer::tokenize("max(1 1, 2)");
        let options = ParserOptions {
            error_recovery: true,
            ..ParserOptions::default()
        };
        let parser = Parser::new(&grammar, &table, options);
        let ast = parser.parse(&tokens).expect("recovery should reach a successful parse");
        assert_eq!(
            ast,
            AstNode::FunctionCall {
                name: "max".into(),
                args: vec![AstNode::Number(1.0), AstNode::Number(2.0)],
            }
        );
    }

    #[test]
    fn strict_mode_fails_immediately_without_recovery() {
        let err = parse_str("max(1 1, 2)").unwrap_err();
        assert!(matches!(err, ParseFailure::Syntax(_)));
    }

    #[test]
    fn boolean_and_comparison_operators_combine() {
        let ast = parse_str("true && (1 < 2)").unwrap();
        assert_eq!(
            ast,
            AstNode::binary_op("&&", AstNode::Boolean(true), AstNode::binary_op("<", AstNode::Number(1.0), AstNode::Number(2.0)))
        );
    }

    #[test]
    fn reparse_with_no_previous_result_is_equivalent_to_a_fresh_parse() {
        let grammar = Grammar::new();
        let (table, _) = TableBuilder::default().build(&grammar).unwrap();
        let (tokens, _) = Lexer::tokenize("1 + 2 * 3");
        let parser = Parser::new(&grammar, &table, ParserOptions::default());
        let fresh = parser.parse(&tokens).unwrap();
        let reparsed = parser.reparse(None, 0, &tokens).unwrap();
        assert_eq!(fresh, reparsed);
    }

    #[test]
    fn reparse_ignores_a_nonzero_change_start_index_and_still_reparses_fully() {
        let grammar = Grammar::new();
        let (table, _) = TableBuilder::default().build(&grammar).unwrap();
        let (tokens, _) = Lexer::tokenize("1 + 2 * 3");
        let parser = Parser::new(&grammar, &table, ParserOptions::default());
        let previous = parser.parse(&tokens).unwrap();
        let reparsed = parser.reparse(Some(&previous), 4, &tokens).unwrap();
        assert_eq!(previous, reparsed);
    }

    #[test]
    fn unary_minus_binds_tighter_than_power_in_this_grammars_literal_productions() {
        // PRIMARY -> MINUS PRIMARY and FACTOR -> PRIMARY POWER FACTOR together mean the
        // MINUS is consumed within PRIMARY before POWER is considered, so "-2^2" parses as
        // (-2)^2 under the grammar exactly as specified.
        let ast = parse_str("-2^2").unwrap();
        assert_eq!(
            ast,
            AstNode::binary_op("^", AstNode::unary_op("-", AstNode::Number(2.0)), AstNode::Number(2.0))
        );
    }
}
