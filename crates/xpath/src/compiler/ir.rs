use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::functions::Function;
use crate::model::ExpandedName;
use crate::parser::ast::{Axis, BinaryOp};
use crate::runtime::StaticContext;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprIR {
    Literal(String),
    Number(f64),
    Call { func: Function, args: Vec<ExprIR> },
    Binary { left: Box<ExprIR>, op: BinaryOp, right: Box<ExprIR> },
    Negate(Box<ExprIR>),
    Union(Box<ExprIR>, Box<ExprIR>),
    Filter { primary: Box<ExprIR>, predicates: Vec<ExprIR> },
    Path(PathIR),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathIR {
    pub start: PathStartIR,
    pub steps: Vec<StepIR>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathStartIR {
    Root,
    Context,
    Expr(Box<ExprIR>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepIR {
    pub axis: Axis,
    pub test: NodeTestIR,
    pub predicates: SmallVec<[ExprIR; 1]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTestIR {
    Name(ExpandedName),
    NsWildcard(CompactString),
    Any,
    AnyKind,
    KindText,
    KindComment,
    KindProcessingInstruction(Option<String>),
}

/// A compiled expression, bound to the static context it was compiled under.
#[derive(Debug, Clone)]
pub struct CompiledXPath {
    pub(crate) root: ExprIR,
    pub(crate) static_ctx: Arc<StaticContext>,
    pub(crate) source: String,
}

impl CompiledXPath {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_ctx
    }

    /// Lowered expression tree.
    pub fn ir(&self) -> &ExprIR {
        &self.root
    }

    /// Whether the expression text is explicitly anchored at the context node (starts with `.`).
    pub fn is_context_relative(&self) -> bool {
        self.source.trim_start().starts_with('.')
    }
}
