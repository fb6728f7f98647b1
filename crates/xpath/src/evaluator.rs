//! Tree-walking evaluator over compiled expressions.

use smallvec::SmallVec;
use std::iter;

use crate::compiler::ir::{CompiledXPath, ExprIR, NodeTestIR, PathIR, PathStartIR};
use crate::document::NodeRef;
use crate::functions::{self, Focus};
use crate::model::NodeKind;
use crate::parser::ast::{Axis, BinaryOp};
use crate::runtime::Error;
use crate::value::XPathValue;

/// Evaluate `compiled` with `context` as the context node (position 1 of 1).
pub fn evaluate<'d>(compiled: &CompiledXPath, context: NodeRef<'d>) -> Result<XPathValue<'d>, Error> {
    let focus = Focus { node: context, position: 1, size: 1 };
    evaluate_expr(&compiled.root, &focus)
}

/// Evaluate and require a node-set result.
pub fn evaluate_nodes<'d>(compiled: &CompiledXPath, context: NodeRef<'d>) -> Result<Vec<NodeRef<'d>>, Error> {
    evaluate(compiled, context)?.into_nodes()
}

pub fn evaluate_expr<'d>(expr: &ExprIR, focus: &Focus<'d>) -> Result<XPathValue<'d>, Error> {
    match expr {
        ExprIR::Literal(s) => Ok(XPathValue::String(s.clone())),
        ExprIR::Number(n) => Ok(XPathValue::Number(*n)),
        ExprIR::Call { func, args } => {
            let values = args.iter().map(|a| evaluate_expr(a, focus)).collect::<Result<Vec<_>, _>>()?;
            functions::call(*func, values, focus)
        }
        ExprIR::Binary { left, op: BinaryOp::Or, right } => {
            if evaluate_expr(left, focus)?.to_boolean() {
                return Ok(XPathValue::Boolean(true));
            }
            Ok(XPathValue::Boolean(evaluate_expr(right, focus)?.to_boolean()))
        }
        ExprIR::Binary { left, op: BinaryOp::And, right } => {
            if !evaluate_expr(left, focus)?.to_boolean() {
                return Ok(XPathValue::Boolean(false));
            }
            Ok(XPathValue::Boolean(evaluate_expr(right, focus)?.to_boolean()))
        }
        ExprIR::Binary { left, op, right } => {
            let l = evaluate_expr(left, focus)?;
            let r = evaluate_expr(right, focus)?;
            Ok(binary(*op, &l, &r))
        }
        ExprIR::Negate(inner) => Ok(XPathValue::Number(-evaluate_expr(inner, focus)?.to_number())),
        ExprIR::Union(l, r) => {
            let mut nodes = evaluate_expr(l, focus)?.into_nodes()?;
            nodes.extend(evaluate_expr(r, focus)?.into_nodes()?);
            Ok(XPathValue::NodeSet(doc_order_distinct(nodes)))
        }
        ExprIR::Filter { primary, predicates } => {
            let nodes = evaluate_expr(primary, focus)?.into_nodes()?;
            Ok(XPathValue::NodeSet(apply_predicates(nodes, predicates)?))
        }
        ExprIR::Path(path) => evaluate_path(path, focus).map(XPathValue::NodeSet),
    }
}

fn evaluate_path<'d>(path: &PathIR, focus: &Focus<'d>) -> Result<Vec<NodeRef<'d>>, Error> {
    let mut current = match &path.start {
        PathStartIR::Root => vec![focus.node.document().root()],
        PathStartIR::Context => vec![focus.node],
        PathStartIR::Expr(e) => evaluate_expr(e, focus)?.into_nodes()?,
    };
    for step in &path.steps {
        let mut next = Vec::new();
        for node in &current {
            let candidates: Vec<NodeRef<'d>> =
                axis_nodes(*node, step.axis).filter(|n| node_test(n, step.axis, &step.test)).collect();
            next.extend(apply_predicates(candidates, &step.predicates)?);
        }
        current = if current.len() > 1 || step.axis.is_reverse() { doc_order_distinct(next) } else { next };
    }
    Ok(current)
}

/// Nodes along `axis` in axis order: document order for forward axes, proximity for reverse ones.
fn axis_nodes<'d>(node: NodeRef<'d>, axis: Axis) -> Box<dyn Iterator<Item = NodeRef<'d>> + 'd> {
    match axis {
        Axis::Child => Box::new(node.children()),
        Axis::Descendant => Box::new(node.descendants()),
        Axis::DescendantOrSelf => Box::new(iter::once(node).chain(node.descendants())),
        Axis::Parent => Box::new(node.parent().into_iter()),
        Axis::Ancestor => Box::new(node.ancestors()),
        Axis::AncestorOrSelf => Box::new(iter::once(node).chain(node.ancestors())),
        Axis::FollowingSibling => Box::new(node.following_siblings()),
        Axis::PrecedingSibling => Box::new(node.preceding_siblings()),
        Axis::Following => Box::new(node.following()),
        Axis::Preceding => Box::new(node.preceding().rev()),
        Axis::Attribute => Box::new(node.attributes()),
        Axis::SelfAxis => Box::new(iter::once(node)),
        // rejected by the compiler
        Axis::Namespace => Box::new(iter::empty()),
    }
}

fn node_test(node: &NodeRef<'_>, axis: Axis, test: &NodeTestIR) -> bool {
    let principal = if axis == Axis::Attribute { NodeKind::Attribute } else { NodeKind::Element };
    match test {
        NodeTestIR::Name(name) => {
            node.kind() == principal
                && node.local_name() == name.local.as_str()
                && node.namespace_uri() == name.ns_uri.as_deref()
        }
        NodeTestIR::NsWildcard(ns) => node.kind() == principal && node.namespace_uri() == Some(ns.as_str()),
        NodeTestIR::Any => node.kind() == principal,
        NodeTestIR::AnyKind => true,
        NodeTestIR::KindText => node.kind() == NodeKind::Text,
        NodeTestIR::KindComment => node.kind() == NodeKind::Comment,
        NodeTestIR::KindProcessingInstruction(target) => {
            node.kind() == NodeKind::ProcessingInstruction && target.as_deref().is_none_or(|t| node.local_name() == t)
        }
    }
}

// Positions are far below 2^52.
#[allow(clippy::cast_precision_loss)]
fn apply_predicates<'d>(mut nodes: Vec<NodeRef<'d>>, predicates: &[ExprIR]) -> Result<Vec<NodeRef<'d>>, Error> {
    for predicate in predicates {
        if nodes.is_empty() {
            break;
        }
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let focus = Focus { node, position: i + 1, size };
            let keep = match evaluate_expr(predicate, &focus)? {
                XPathValue::Number(n) => (n - (i + 1) as f64).abs() < f64::EPSILON,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    Ok(nodes)
}

fn doc_order_distinct(mut nodes: Vec<NodeRef<'_>>) -> Vec<NodeRef<'_>> {
    nodes.sort_unstable_by_key(NodeRef::id);
    nodes.dedup();
    nodes
}

fn binary<'d>(op: BinaryOp, l: &XPathValue<'d>, r: &XPathValue<'d>) -> XPathValue<'d> {
    use BinaryOp::*;
    match op {
        Add => XPathValue::Number(l.to_number() + r.to_number()),
        Sub => XPathValue::Number(l.to_number() - r.to_number()),
        Mul => XPathValue::Number(l.to_number() * r.to_number()),
        Div => XPathValue::Number(l.to_number() / r.to_number()),
        // truncating remainder, the sign follows the dividend
        Mod => XPathValue::Number(l.to_number() % r.to_number()),
        Eq | Ne | Lt | Le | Gt | Ge => XPathValue::Boolean(compare(op, l, r)),
        // short-circuited in `evaluate_expr`
        Or => XPathValue::Boolean(l.to_boolean() || r.to_boolean()),
        And => XPathValue::Boolean(l.to_boolean() && r.to_boolean()),
    }
}

/// XPath 1.0 comparison: node-sets compare existentially through their string-values.
fn compare(op: BinaryOp, l: &XPathValue<'_>, r: &XPathValue<'_>) -> bool {
    match (l, r) {
        (XPathValue::NodeSet(_), XPathValue::Boolean(b)) => compare_scalars(op, &XPathValue::Boolean(l.to_boolean()), &XPathValue::Boolean(*b)),
        (XPathValue::Boolean(b), XPathValue::NodeSet(_)) => compare_scalars(op, &XPathValue::Boolean(*b), &XPathValue::Boolean(r.to_boolean())),
        (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => {
            let right: SmallVec<[XPathValue<'_>; 8]> = b.iter().map(|n| XPathValue::String(n.string_value())).collect();
            a.iter().any(|n| {
                let left = XPathValue::String(n.string_value());
                right.iter().any(|rv| compare_scalars(op, &left, rv))
            })
        }
        (XPathValue::NodeSet(a), scalar) => {
            a.iter().any(|n| compare_scalars(op, &XPathValue::String(n.string_value()), scalar))
        }
        (scalar, XPathValue::NodeSet(b)) => {
            b.iter().any(|n| compare_scalars(op, scalar, &XPathValue::String(n.string_value())))
        }
        _ => compare_scalars(op, l, r),
    }
}

#[allow(clippy::float_cmp)]
fn compare_scalars(op: BinaryOp, l: &XPathValue<'_>, r: &XPathValue<'_>) -> bool {
    use BinaryOp::*;
    match op {
        Eq | Ne => {
            let equal = match (l, r) {
                (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => l.to_boolean() == r.to_boolean(),
                (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => l.to_number() == r.to_number(),
                _ => l.to_xpath_string() == r.to_xpath_string(),
            };
            if op == Eq { equal } else { !equal }
        }
        Lt => l.to_number() < r.to_number(),
        Le => l.to_number() <= r.to_number(),
        Gt => l.to_number() > r.to_number(),
        Ge => l.to_number() >= r.to_number(),
        Add | Sub | Mul | Div | Mod | Or | And => false,
    }
}
