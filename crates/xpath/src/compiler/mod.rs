use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::{Arc, OnceLock};

use crate::functions::Function;
use crate::model::ExpandedName;
use crate::parser::ast::{self, Axis};
use crate::parser::parse_xpath;
use crate::runtime::{Error, ErrorCode, StaticContext};

pub mod ir;

static DEFAULT_STATIC_CONTEXT: OnceLock<StaticContext> = OnceLock::new();

fn default_static_ctx() -> &'static StaticContext {
    DEFAULT_STATIC_CONTEXT.get_or_init(StaticContext::default)
}

/// Compile using a lazily initialized default `StaticContext`.
pub fn compile_xpath(expr: &str) -> Result<ir::CompiledXPath, Error> {
    compile_inner(expr, default_static_ctx())
}

/// Compile with an explicitly provided `StaticContext`.
pub fn compile_xpath_with_context(expr: &str, static_ctx: &StaticContext) -> Result<ir::CompiledXPath, Error> {
    compile_inner(expr, static_ctx)
}

fn compile_inner(expr: &str, static_ctx: &StaticContext) -> Result<ir::CompiledXPath, Error> {
    let ast = parse_xpath(expr)?;
    let compiler = Compiler { static_ctx };
    let root = compiler.lower_expr(&ast)?;
    tracing::trace!(expression = expr, "compiled XPath expression");
    Ok(ir::CompiledXPath { root, static_ctx: Arc::new(static_ctx.clone()), source: expr.to_string() })
}

struct Compiler<'a> {
    static_ctx: &'a StaticContext,
}

type CResult<T> = Result<T, Error>;

impl Compiler<'_> {
    fn lower_expr(&self, e: &ast::Expr) -> CResult<ir::ExprIR> {
        use ast::Expr as E;
        Ok(match e {
            E::Literal(s) => ir::ExprIR::Literal(s.clone()),
            E::Number(n) => ir::ExprIR::Number(*n),
            E::VarRef(name) => {
                return Err(Error::from_code(ErrorCode::XPST0008, format!("variable ${name} is not declared")));
            }
            E::FunctionCall { name, args } => {
                let func = self.resolve_function(name, args.len())?;
                let args = args.iter().map(|a| self.lower_expr(a)).collect::<CResult<Vec<_>>>()?;
                ir::ExprIR::Call { func, args }
            }
            E::Binary { left, op, right } => ir::ExprIR::Binary {
                left: Box::new(self.lower_expr(left)?),
                op: *op,
                right: Box::new(self.lower_expr(right)?),
            },
            E::Negate(inner) => ir::ExprIR::Negate(Box::new(self.lower_expr(inner)?)),
            E::Union(l, r) => ir::ExprIR::Union(Box::new(self.lower_expr(l)?), Box::new(self.lower_expr(r)?)),
            E::Filter { primary, predicates } => ir::ExprIR::Filter {
                primary: Box::new(self.lower_expr(primary)?),
                predicates: predicates.iter().map(|p| self.lower_expr(p)).collect::<CResult<Vec<_>>>()?,
            },
            E::Path(path) => ir::ExprIR::Path(self.lower_path(path)?),
        })
    }

    fn lower_path(&self, path: &ast::PathExpr) -> CResult<ir::PathIR> {
        let start = match &path.start {
            ast::PathStart::Root => ir::PathStartIR::Root,
            ast::PathStart::Context => ir::PathStartIR::Context,
            ast::PathStart::Expr(e) => ir::PathStartIR::Expr(Box::new(self.lower_expr(e)?)),
        };
        let steps = path.steps.iter().map(|s| self.lower_step(s)).collect::<CResult<Vec<_>>>()?;
        Ok(ir::PathIR { start, steps })
    }

    fn lower_step(&self, step: &ast::Step) -> CResult<ir::StepIR> {
        if step.axis == Axis::Namespace {
            return Err(Error::syntax("the namespace axis is not supported"));
        }
        let predicates = step.predicates.iter().map(|p| self.lower_expr(p)).collect::<CResult<SmallVec<_>>>()?;
        Ok(ir::StepIR { axis: step.axis, test: self.lower_test(step.axis, &step.test)?, predicates })
    }

    fn lower_test(&self, axis: Axis, test: &ast::NodeTest) -> CResult<ir::NodeTestIR> {
        use ast::NodeTest as T;
        Ok(match test {
            T::Name(name) => {
                let ns = match &name.prefix {
                    Some(prefix) => Some(self.resolve_prefix(prefix)?),
                    // Unprefixed attribute names are never in a namespace.
                    None if axis == Axis::Attribute => None,
                    None => self.static_ctx.default_element_namespace.clone(),
                };
                ir::NodeTestIR::Name(ExpandedName { ns_uri: ns, local: CompactString::from(name.local.as_str()) })
            }
            T::NsWildcard(prefix) => ir::NodeTestIR::NsWildcard(self.resolve_prefix(prefix)?),
            T::Any => ir::NodeTestIR::Any,
            T::Node => ir::NodeTestIR::AnyKind,
            T::Text => ir::NodeTestIR::KindText,
            T::Comment => ir::NodeTestIR::KindComment,
            T::ProcessingInstruction(target) => ir::NodeTestIR::KindProcessingInstruction(target.clone()),
        })
    }

    fn resolve_prefix(&self, prefix: &str) -> CResult<CompactString> {
        self.static_ctx
            .resolve_prefix(prefix)
            .map(CompactString::from)
            .ok_or_else(|| Error::from_code(ErrorCode::XPST0081, format!("namespace prefix `{prefix}` is not bound")))
    }

    fn resolve_function(&self, name: &ast::LexName, arity: usize) -> CResult<Function> {
        let unknown = || Error::from_code(ErrorCode::XPST0017, format!("unknown function {name}#{arity}"));
        if name.prefix.is_some() {
            return Err(unknown());
        }
        let func = Function::lookup(&name.local).ok_or_else(unknown)?;
        let (min, max) = func.arity();
        if arity < min || max.is_some_and(|m| arity > m) {
            return Err(unknown());
        }
        Ok(func)
    }
}
