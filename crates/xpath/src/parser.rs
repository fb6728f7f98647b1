use pest::Parser;
use pest::iterators::Pair;

use crate::runtime::Error;

pub mod ast;

use ast::{Axis, BinaryOp, Expr, LexName, NodeTest, PathExpr, PathStart, Step};

#[derive(pest_derive::Parser)]
#[grammar = "xpath.pest"]
pub struct XPathParser;

type BuildResult<T> = Result<T, Error>;

/// Parse an XPath 1.0 expression into its syntax tree.
pub fn parse_xpath(input: &str) -> Result<Expr, Error> {
    XPathParser::parse_to_ast(input)
}

impl XPathParser {
    pub fn parse_to_ast(input: &str) -> BuildResult<Expr> {
        let mut pairs = Self::parse(Rule::xpath, input).map_err(|e| Error::syntax(e.to_string()))?;
        let root = pairs.next().ok_or_else(|| Error::syntax("empty expression"))?;
        let expr = root.into_inner().next().ok_or_else(|| Error::syntax("empty expression"))?;
        Self::build_expr(expr)
    }

    /// Walk down a pair to the first terminal token rule (e.g. `OP_PLUS`, `K_AND`).
    fn first_token_rule(pair: &Pair<Rule>) -> Rule {
        let mut current = pair.clone();
        loop {
            let mut inner = current.clone().into_inner();
            if let Some(next) = inner.next() {
                current = next;
            } else {
                return current.as_rule();
            }
        }
    }

    fn unexpected(pair: &Pair<Rule>) -> Error {
        Error::syntax(format!("unexpected {:?} at `{}`", pair.as_rule(), pair.as_str()))
    }

    fn single_inner(pair: Pair<Rule>) -> BuildResult<Pair<Rule>> {
        let unexpected = Self::unexpected(&pair);
        pair.into_inner().next().ok_or(unexpected)
    }

    fn build_expr(pair: Pair<Rule>) -> BuildResult<Expr> {
        match pair.as_rule() {
            Rule::expr | Rule::path_expr | Rule::primary_expr | Rule::parenthesized | Rule::location_path => {
                Self::build_expr(Self::single_inner(pair)?)
            }
            Rule::or_expr
            | Rule::and_expr
            | Rule::equality_expr
            | Rule::relational_expr
            | Rule::additive_expr
            | Rule::multiplicative_expr => Self::fold_binary(pair),
            Rule::unary_expr => {
                let mut negations = 0usize;
                let mut operand = None;
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::OP_MINUS => negations += 1,
                        _ => operand = Some(Self::build_expr(p)?),
                    }
                }
                let mut expr = operand.ok_or_else(|| Error::syntax("missing operand after `-`"))?;
                for _ in 0..negations {
                    expr = Expr::Negate(Box::new(expr));
                }
                Ok(expr)
            }
            Rule::union_expr => {
                let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::OP_PIPE);
                let first = inner.next().ok_or_else(|| Error::syntax("empty union"))?;
                let mut expr = Self::build_expr(first)?;
                for right in inner {
                    expr = Expr::Union(Box::new(expr), Box::new(Self::build_expr(right)?));
                }
                Ok(expr)
            }
            Rule::filter_path => {
                let mut inner = pair.into_inner();
                let filter = inner.next().ok_or_else(|| Error::syntax("missing filter expression"))?;
                let primary = Self::build_expr(filter)?;
                let Some(sep) = inner.next() else { return Ok(primary) };
                let mut steps = Vec::new();
                if Self::first_token_rule(&sep) == Rule::OP_DSLASH {
                    steps.push(Step::descendant_or_self());
                }
                if let Some(rel) = inner.next() {
                    steps.extend(Self::build_steps(rel)?);
                }
                Ok(Expr::Path(PathExpr { start: PathStart::Expr(Box::new(primary)), steps }))
            }
            Rule::filter_expr => {
                let mut inner = pair.into_inner();
                let primary = Self::build_expr(inner.next().ok_or_else(|| Error::syntax("missing primary"))?)?;
                let predicates = inner.map(Self::build_predicate).collect::<BuildResult<Vec<_>>>()?;
                if predicates.is_empty() {
                    Ok(primary)
                } else {
                    Ok(Expr::Filter { primary: Box::new(primary), predicates })
                }
            }
            Rule::literal => {
                let content = pair.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default();
                Ok(Expr::Literal(content))
            }
            Rule::number => {
                let raw = pair.as_str();
                raw.parse::<f64>().map(Expr::Number).map_err(|_| Error::syntax(format!("invalid number `{raw}`")))
            }
            Rule::function_call => {
                let mut inner = pair.into_inner();
                let name = inner.next().ok_or_else(|| Error::syntax("missing function name"))?;
                let name = LexName::parse(name.as_str());
                let args = inner.map(Self::build_expr).collect::<BuildResult<Vec<_>>>()?;
                Ok(Expr::FunctionCall { name, args })
            }
            Rule::var_ref => {
                let name = Self::single_inner(pair)?;
                Ok(Expr::VarRef(LexName::parse(name.as_str())))
            }
            Rule::absolute_path => {
                let mut steps = Vec::new();
                let mut inner = pair.into_inner();
                if let Some(lead) = inner.next()
                    && lead.as_rule() == Rule::OP_DSLASH
                {
                    steps.push(Step::descendant_or_self());
                }
                if let Some(rel) = inner.next() {
                    steps.extend(Self::build_steps(rel)?);
                }
                Ok(Expr::Path(PathExpr { start: PathStart::Root, steps }))
            }
            Rule::relative_path => {
                Ok(Expr::Path(PathExpr { start: PathStart::Context, steps: Self::build_steps(pair)? }))
            }
            _ => Err(Self::unexpected(&pair)),
        }
    }

    fn fold_binary(pair: Pair<Rule>) -> BuildResult<Expr> {
        let mut inner = pair.into_inner();
        let first = inner.next().ok_or_else(|| Error::syntax("missing operand"))?;
        let mut expr = Self::build_expr(first)?;
        while let Some(op_pair) = inner.next() {
            let op = Self::binary_op(&op_pair).ok_or_else(|| Self::unexpected(&op_pair))?;
            let right = inner.next().ok_or_else(|| Error::syntax("missing right operand"))?;
            expr = Expr::Binary { left: Box::new(expr), op, right: Box::new(Self::build_expr(right)?) };
        }
        Ok(expr)
    }

    fn binary_op(pair: &Pair<Rule>) -> Option<BinaryOp> {
        Some(match Self::first_token_rule(pair) {
            Rule::K_OR => BinaryOp::Or,
            Rule::K_AND => BinaryOp::And,
            Rule::OP_EQ => BinaryOp::Eq,
            Rule::OP_NE => BinaryOp::Ne,
            Rule::OP_LT => BinaryOp::Lt,
            Rule::OP_LTE => BinaryOp::Le,
            Rule::OP_GT => BinaryOp::Gt,
            Rule::OP_GTE => BinaryOp::Ge,
            Rule::OP_PLUS => BinaryOp::Add,
            Rule::OP_MINUS => BinaryOp::Sub,
            Rule::OP_STAR => BinaryOp::Mul,
            Rule::K_DIV => BinaryOp::Div,
            Rule::K_MOD => BinaryOp::Mod,
            _ => return None,
        })
    }

    fn build_predicate(pair: Pair<Rule>) -> BuildResult<Expr> {
        Self::build_expr(Self::single_inner(pair)?)
    }

    /// `relative_path` → steps, expanding `//` separators.
    fn build_steps(pair: Pair<Rule>) -> BuildResult<Vec<Step>> {
        let mut steps = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::step => steps.push(Self::build_step(p)?),
                Rule::path_sep => {
                    if Self::first_token_rule(&p) == Rule::OP_DSLASH {
                        steps.push(Step::descendant_or_self());
                    }
                }
                _ => return Err(Self::unexpected(&p)),
            }
        }
        Ok(steps)
    }

    fn build_step(pair: Pair<Rule>) -> BuildResult<Step> {
        let mut axis = Axis::Child;
        let mut test = None;
        let mut predicates = Vec::new();
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::abbrev_parent => return Ok(Step { axis: Axis::Parent, test: NodeTest::Node, predicates }),
                Rule::abbrev_self => return Ok(Step { axis: Axis::SelfAxis, test: NodeTest::Node, predicates }),
                Rule::axis_spec => {
                    let specifier = Self::single_inner(p)?;
                    axis = match specifier.as_rule() {
                        Rule::OP_AT => Axis::Attribute,
                        _ => Axis::from_name(specifier.as_str())
                            .ok_or_else(|| Error::syntax(format!("unknown axis `{}`", specifier.as_str())))?,
                    };
                }
                Rule::node_test => test = Some(Self::build_node_test(p)?),
                Rule::predicate => predicates.push(Self::build_predicate(p)?),
                _ => return Err(Self::unexpected(&p)),
            }
        }
        let test = test.ok_or_else(|| Error::syntax("step without node test"))?;
        Ok(Step { axis, test, predicates })
    }

    fn build_node_test(pair: Pair<Rule>) -> BuildResult<NodeTest> {
        let test = Self::single_inner(pair)?;
        match test.as_rule() {
            Rule::kind_test => {
                let mut inner = test.into_inner();
                let kind = inner.next().ok_or_else(|| Error::syntax("missing node type"))?;
                let target = inner.next().and_then(|lit| lit.into_inner().next()).map(|s| s.as_str().to_string());
                Ok(match kind.as_str() {
                    "comment" => NodeTest::Comment,
                    "text" => NodeTest::Text,
                    "node" => NodeTest::Node,
                    _ => NodeTest::ProcessingInstruction(target),
                })
            }
            Rule::name_test => {
                let inner = Self::single_inner(test)?;
                Ok(match inner.as_rule() {
                    Rule::OP_STAR => NodeTest::Any,
                    Rule::ns_wildcard => {
                        let prefix = Self::single_inner(inner)?;
                        NodeTest::NsWildcard(prefix.as_str().to_string())
                    }
                    _ => NodeTest::Name(LexName::parse(inner.as_str())),
                })
            }
            _ => Err(Self::unexpected(&test)),
        }
    }
}
