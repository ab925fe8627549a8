//! AST builders: one per production, represented as a tagged enum dispatched over by a
//! single function rather than a hierarchy of builder objects attached by reference.

use std::fmt::{self, Display, Formatter};

use crate::ast::AstNode;
use crate::token::{Terminal, Token};

/// Either a shifted [`Token`] or a previously-reduced [`AstNode`] sitting on the parser's
/// symbol stack — the tagged union that replaces a dynamically-typed stack of arbitrary
/// objects.
#[derive(Debug, Clone)]
pub enum StackEntry {
    Token(Token),
    Node(AstNode),
}

impl StackEntry {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            StackEntry::Token(t) => Some(t),
            StackEntry::Node(_) => None,
        }
    }

    pub fn into_node(self) -> Option<AstNode> {
        match self {
            StackEntry::Node(n) => Some(n),
            StackEntry::Token(_) => None,
        }
    }
}

/// One entry per production of the grammar (spec §4.7's builder table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Identity,
    Start,
    Parenthesized,
    Number,
    Variable,
    BooleanTrue,
    BooleanFalse,
    BinaryOp(&'static str),
    UnaryOp(&'static str),
    FunctionCall,
    FunctionCallEmpty,
    If,
    ArgsSingle,
    ArgsMultiple,
}

/// A builder received children of a shape that disagrees with its production's
/// right-hand side length or symbol kinds. This can only happen if the parsing table and
/// the grammar have drifted out of sync with each other; it is unconditionally fatal, the
/// one error kind in this crate that is never expected to be produced by any valid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalInvariantError {
    pub builder: BuilderKind,
    pub message: String,
}

impl Display for InternalInvariantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InternalInvariantError: builder {:?} received malformed children: {}",
            self.builder, self.message
        )
    }
}

fn fail(builder: BuilderKind, message: impl Into<String>) -> InternalInvariantError {
    InternalInvariantError {
        builder,
        message: message.into(),
    }
}

/// Apply `builder` to the popped `children` (already in left-to-right order, length equal
/// to the production's right-hand side length) and produce the reduction's result.
pub fn apply_builder(
    builder: BuilderKind,
    mut children: Vec<StackEntry>,
) -> Result<StackEntry, InternalInvariantError> {
    match builder {
        BuilderKind::Identity => {
            expect_len(builder, &children, 1)?;
            let node = children.pop().unwrap();
            expect_node(builder, node)
        }
        BuilderKind::Start => {
            // [node] or [node, DOLLAR]
            if children.is_empty() || children.len() > 2 {
                return Err(fail(
                    builder,
                    format!("expected 1 or 2 children, got {}", children.len()),
                ));
            }
            let node = children.remove(0);
            expect_node(builder, node)
        }
        BuilderKind::Parenthesized => {
            expect_len(builder, &children, 3)?;
            let node = children.remove(1);
            expect_node(builder, node)
        }
        BuilderKind::Number => {
            expect_len(builder, &children, 1)?;
            let token = expect_token(builder, children.remove(0))?;
            let value: f64 = token
                .lexeme
                .parse()
                .map_err(|_| fail(builder, format!("invalid numeric lexeme '{}'", token.lexeme)))?;
            Ok(StackEntry::Node(AstNode::Number(value)))
        }
        BuilderKind::Variable => {
            expect_len(builder, &children, 1)?;
            let token = expect_token(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::Variable(token.lexeme)))
        }
        BuilderKind::BooleanTrue => {
            expect_len(builder, &children, 1)?;
            expect_token(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::Boolean(true)))
        }
        BuilderKind::BooleanFalse => {
            expect_len(builder, &children, 1)?;
            expect_token(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::Boolean(false)))
        }
        BuilderKind::BinaryOp(op) => {
            expect_len(builder, &children, 3)?;
            let right = expect_node(builder, children.remove(2))?;
            expect_token(builder, children.remove(1))?;
            let left = expect_node(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::binary_op(
                op,
                node_of(left)?,
                node_of(right)?,
            )))
        }
        BuilderKind::UnaryOp(op) => {
            expect_len(builder, &children, 2)?;
            let operand = expect_node(builder, children.remove(1))?;
            expect_token(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::unary_op(op, node_of(operand)?)))
        }
        BuilderKind::FunctionCall => {
            expect_len(builder, &children, 4)?;
            expect_token(builder, children.remove(3))?; // ')'
            let args_node = expect_node(builder, children.remove(2))?; // ARGS
            expect_token(builder, children.remove(1))?; // '('
            let ident = expect_token(builder, children.remove(0))?;
            let args = match node_of(args_node)? {
                AstNode::Args(list) => list,
                other => return Err(fail(builder, format!("expected ARGS node, got {:?}", other))),
            };
            if args.len() > crate::ast::MAX_CALL_ARGS {
                return Err(fail(
                    builder,
                    format!(
                        "function call to '{}' has {} arguments, exceeding the maximum of {}",
                        ident.lexeme,
                        args.len(),
                        crate::ast::MAX_CALL_ARGS
                    ),
                ));
            }
            Ok(StackEntry::Node(AstNode::FunctionCall {
                name: ident.lexeme,
                args,
            }))
        }
        BuilderKind::FunctionCallEmpty => {
            expect_len(builder, &children, 3)?;
            expect_token(builder, children.remove(2))?;
            expect_token(builder, children.remove(1))?;
            let ident = expect_token(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::FunctionCall {
                name: ident.lexeme,
                args: Vec::new(),
            }))
        }
        BuilderKind::If => {
            expect_len(builder, &children, 8)?;
            expect_token(builder, children.remove(7))?; // ')'
            let else_branch = expect_node(builder, children.remove(6))?;
            expect_token(builder, children.remove(5))?; // ','
            let then_branch = expect_node(builder, children.remove(4))?;
            expect_token(builder, children.remove(3))?; // ','
            let cond = expect_node(builder, children.remove(2))?;
            expect_token(builder, children.remove(1))?; // '('
            expect_token(builder, children.remove(0))?; // IF
            Ok(StackEntry::Node(AstNode::if_node(
                node_of(cond)?,
                node_of(then_branch)?,
                node_of(else_branch)?,
            )))
        }
        BuilderKind::ArgsSingle => {
            expect_len(builder, &children, 1)?;
            let node = expect_node(builder, children.remove(0))?;
            Ok(StackEntry::Node(AstNode::Args(vec![node_of(node)?])))
        }
        BuilderKind::ArgsMultiple => {
            expect_len(builder, &children, 3)?;
            let next = expect_node(builder, children.remove(2))?;
            expect_token(builder, children.remove(1))?; // ','
            let args_node = expect_node(builder, children.remove(0))?;
            let mut list = match node_of(args_node)? {
                AstNode::Args(list) => list,
                other => return Err(fail(builder, format!("expected ARGS node, got {:?}", other))),
            };
            list.push(node_of(next)?);
            Ok(StackEntry::Node(AstNode::Args(list)))
        }
    }
}

fn expect_len(
    builder: BuilderKind,
    children: &[StackEntry],
    expected: usize,
) -> Result<(), InternalInvariantError> {
    if children.len() != expected {
        Err(fail(
            builder,
            format!("expected {} children, got {}", expected, children.len()),
        ))
    } else {
        Ok(())
    }
}

fn expect_node(
    builder: BuilderKind,
    entry: StackEntry,
) -> Result<StackEntry, InternalInvariantError> {
    match &entry {
        StackEntry::Node(_) => Ok(entry),
        StackEntry::Token(t) => Err(fail(builder, format!("expected a node, got token {}", t))),
    }
}

fn expect_token(
    builder: BuilderKind,
    entry: StackEntry,
) -> Result<Token, InternalInvariantError> {
    match entry {
        StackEntry::Token(t) => Ok(t),
        StackEntry::Node(n) => Err(fail(builder, format!("expected a token, got node {}", n))),
    }
}

fn node_of(entry: StackEntry) -> Result<AstNode, InternalInvariantError> {
    match entry {
        StackEntry::Node(n) => Ok(n),
        StackEntry::Token(t) => Err(InternalInvariantError {
            builder: BuilderKind::Identity,
            message: format!("expected a node, got token {}", t),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Position;

    fn tok(kind: Terminal, lexeme: &str) -> StackEntry {
        StackEntry::Token(Token::new(kind, lexeme, Position::start()))
    }

    #[test]
    fn number_builder_parses_lexeme() {
        let result = apply_builder(BuilderKind::Number, vec![tok(Terminal::Number, "3.5")]).unwrap();
        assert_eq!(result.into_node(), Some(AstNode::Number(3.5)));
    }

    #[test]
    fn binary_op_builder_combines_children_in_order() {
        let left = StackEntry::Node(AstNode::Number(1.0));
        let right = StackEntry::Node(AstNode::Number(2.0));
        let op = tok(Terminal::Plus, "+");
        let result = apply_builder(BuilderKind::BinaryOp("+"), vec![left, op, right]).unwrap();
        assert_eq!(
            result.into_node(),
            Some(AstNode::binary_op("+", AstNode::Number(1.0), AstNode::Number(2.0)))
        );
    }

    #[test]
    fn arity_mismatch_is_an_internal_invariant_error() {
        let err = apply_builder(BuilderKind::Number, vec![]).unwrap_err();
        assert!(err.message.contains("expected 1 children"));
    }

    #[test]
    fn function_call_rejects_too_many_arguments() {
        let args = AstNode::Args((0..11).map(|i| AstNode::Number(i as f64)).collect());
        let children = vec![
            tok(Terminal::Identifier, "f"),
            tok(Terminal::LeftParen, "("),
            StackEntry::Node(args),
            tok(Terminal::RightParen, ")"),
        ];
        let err = apply_builder(BuilderKind::FunctionCall, children).unwrap_err();
        assert!(err.message.contains("exceeding the maximum"));
    }
}
