//! The abstract syntax tree: a single sum type plus pure query functions over it, replacing
//! the open class hierarchy the distilled design started from with pattern matching.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// An AST node. Immutable; cheap to share since nodes are plain values (`Clone` deep-copies
/// the whole subtree, which is exactly what "deep copy" means for a value type).
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Number(f64),
    Boolean(bool),
    Variable(String),
    BinaryOp {
        op: String,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    UnaryOp {
        op: String,
        operand: Box<AstNode>,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
    },
    If {
        cond: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Box<AstNode>,
    },
    /// Intermediate accumulator for `ARGS`; never present in a final AST handed back to a
    /// caller of the parser.
    Args(Vec<AstNode>),
}

/// Function-call argument lists are capped at this arity (spec data model, `FunctionCall`).
pub const MAX_CALL_ARGS: usize = 10;

impl AstNode {
    pub fn binary_op(op: impl Into<String>, left: AstNode, right: AstNode) -> Self {
        AstNode::BinaryOp {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary_op(op: impl Into<String>, operand: AstNode) -> Self {
        AstNode::UnaryOp {
            op: op.into(),
            operand: Box::new(operand),
        }
    }

    pub fn if_node(cond: AstNode, then_branch: AstNode, else_branch: AstNode) -> Self {
        AstNode::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    /// The number of edges from this node to its deepest descendant (a leaf has depth 0).
    pub fn depth(&self) -> usize {
        match self {
            AstNode::Number(_) | AstNode::Boolean(_) | AstNode::Variable(_) => 0,
            AstNode::UnaryOp { operand, .. } => 1 + operand.depth(),
            AstNode::BinaryOp { left, right, .. } => 1 + left.depth().max(right.depth()),
            AstNode::If {
                cond,
                then_branch,
                else_branch,
            } => 1 + cond.depth().max(then_branch.depth()).max(else_branch.depth()),
            AstNode::FunctionCall { args, .. } => {
                1 + args.iter().map(AstNode::depth).max().unwrap_or(0)
            }
            AstNode::Args(list) => list.iter().map(AstNode::depth).max().unwrap_or(0),
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + match self {
            AstNode::Number(_) | AstNode::Boolean(_) | AstNode::Variable(_) => 0,
            AstNode::UnaryOp { operand, .. } => operand.node_count(),
            AstNode::BinaryOp { left, right, .. } => left.node_count() + right.node_count(),
            AstNode::If {
                cond,
                then_branch,
                else_branch,
            } => cond.node_count() + then_branch.node_count() + else_branch.node_count(),
            AstNode::FunctionCall { args, .. } => args.iter().map(AstNode::node_count).sum(),
            AstNode::Args(list) => list.iter().map(AstNode::node_count).sum(),
        }
    }

    /// The set of free variable names referenced anywhere in this subtree.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            AstNode::Number(_) | AstNode::Boolean(_) => {}
            AstNode::Variable(name) => {
                out.insert(name.clone());
            }
            AstNode::UnaryOp { operand, .. } => operand.collect_variables(out),
            AstNode::BinaryOp { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            AstNode::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.collect_variables(out);
                then_branch.collect_variables(out);
                else_branch.collect_variables(out);
            }
            AstNode::FunctionCall { args, .. } => {
                for a in args {
                    a.collect_variables(out);
                }
            }
            AstNode::Args(list) => {
                for a in list {
                    a.collect_variables(out);
                }
            }
        }
    }

    /// Render this subtree as an indented tree for debugging (`options.debug` in the
    /// parser), via `ptree`.
    pub fn print_tree(&self) -> std::io::Result<()> {
        ptree::print_tree(&AstTreeView(self))
    }
}

struct AstTreeView<'a>(&'a AstNode);

impl<'a> ptree::TreeItem for AstTreeView<'a> {
    type Child = AstTreeView<'a>;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.0.label())
    }

    fn children(&self) -> std::borrow::Cow<[Self::Child]> {
        let kids: Vec<AstTreeView<'a>> = self.0.children().into_iter().map(AstTreeView).collect();
        std::borrow::Cow::Owned(kids)
    }
}

impl AstNode {
    fn label(&self) -> String {
        match self {
            AstNode::Number(v) => format!("Number({})", v),
            AstNode::Boolean(v) => format!("Boolean({})", v),
            AstNode::Variable(name) => format!("Variable({})", name),
            AstNode::BinaryOp { op, .. } => format!("BinaryOp({})", op),
            AstNode::UnaryOp { op, .. } => format!("UnaryOp({})", op),
            AstNode::FunctionCall { name, args } => format!("FunctionCall({}, {} args)", name, args.len()),
            AstNode::If { .. } => "If".to_string(),
            AstNode::Args(list) => format!("Args({})", list.len()),
        }
    }

    fn children(&self) -> Vec<&AstNode> {
        match self {
            AstNode::Number(_) | AstNode::Boolean(_) | AstNode::Variable(_) => vec![],
            AstNode::UnaryOp { operand, .. } => vec![operand.as_ref()],
            AstNode::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            AstNode::If {
                cond,
                then_branch,
                else_branch,
            } => vec![cond.as_ref(), then_branch.as_ref(), else_branch.as_ref()],
            AstNode::FunctionCall { args, .. } => args.iter().collect(),
            AstNode::Args(list) => list.iter().collect(),
        }
    }
}

impl Display for AstNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_of_leaf_is_zero() {
        assert_eq!(AstNode::Number(1.0).depth(), 0);
    }

    #[test]
    fn depth_and_count_of_binary_tree() {
        let tree = AstNode::binary_op("+", AstNode::Number(1.0), AstNode::binary_op(
            "*",
            AstNode::Number(2.0),
            AstNode::Number(3.0),
        ));
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn variables_collects_free_variable_names_only() {
        let tree = AstNode::if_node(
            AstNode::binary_op(">", AstNode::Variable("a".into()), AstNode::Number(0.0)),
            AstNode::Variable("a".into()),
            AstNode::unary_op("-", AstNode::Variable("a".into())),
        );
        let vars: Vec<_> = tree.variables().into_iter().collect();
        assert_eq!(vars, vec!["a".to_string()]);
    }

    #[test]
    fn function_call_args_do_not_leak_the_function_name_as_a_variable() {
        let call = AstNode::FunctionCall {
            name: "max".into(),
            args: vec![AstNode::Variable("x".into())],
        };
        assert_eq!(call.variables(), ["x".to_string()].into_iter().collect());
    }

    #[test]
    fn structural_equality_ignores_identity() {
        let a = AstNode::binary_op("+", AstNode::Number(1.0), AstNode::Number(2.0));
        let b = AstNode::binary_op("+", AstNode::Number(1.0), AstNode::Number(2.0));
        assert_eq!(a, b);
    }
}
