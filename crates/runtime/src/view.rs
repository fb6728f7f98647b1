use lingo_xpath::{Document, NodeRef, XPathValue};

use crate::cache::QueryCache;
use crate::error::ExtractError;

/// Read-only query facade over one document.
///
/// Every operation takes an optional context node; `None` evaluates against the
/// document root. Context nodes from another document are rejected with
/// [`ExtractError::ForeignNode`].
#[derive(Debug, Clone, Copy)]
pub struct QueryView<'d> {
    document: &'d Document,
    cache: &'d QueryCache,
}

impl<'d> QueryView<'d> {
    pub fn new(document: &'d Document, cache: &'d QueryCache) -> Self {
        Self { document, cache }
    }

    pub fn document(&self) -> &'d Document {
        self.document
    }

    pub fn cache(&self) -> &'d QueryCache {
        self.cache
    }

    pub fn evaluate(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<XPathValue<'d>, ExtractError> {
        let context = self.context_node(context)?;
        let compiled = self.cache.compile(expression)?;
        lingo_xpath::evaluate(&compiled, context)
            .map_err(|source| ExtractError::Evaluation { expression: expression.to_string(), source })
    }

    pub fn as_node(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<Option<NodeRef<'d>>, ExtractError> {
        self.as_node_at(expression, 0, context)
    }

    pub fn as_node_at(
        &self,
        expression: &str,
        index: usize,
        context: Option<NodeRef<'d>>,
    ) -> Result<Option<NodeRef<'d>>, ExtractError> {
        Ok(self.as_node_list(expression, context)?.get(index).copied())
    }

    /// Matching nodes in document order.
    pub fn as_node_list(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<Vec<NodeRef<'d>>, ExtractError> {
        self.evaluate(expression, context)?
            .into_nodes()
            .map_err(|source| ExtractError::Evaluation { expression: expression.to_string(), source })
    }

    /// String value of the result, trimmed. Empty when nothing matches.
    pub fn as_string(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<String, ExtractError> {
        Ok(self.evaluate(expression, context)?.to_xpath_string().trim().to_string())
    }

    pub fn as_number(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<f64, ExtractError> {
        Ok(self.evaluate(expression, context)?.to_number())
    }

    pub fn as_boolean(&self, expression: &str, context: Option<NodeRef<'d>>) -> Result<bool, ExtractError> {
        Ok(self.evaluate(expression, context)?.to_boolean())
    }

    /// Nodes selected by `expression` with `node` as the context. The expression must start with `.`.
    pub fn relative(&self, node: NodeRef<'d>, expression: &str) -> Result<Vec<NodeRef<'d>>, ExtractError> {
        ensure_relative(expression)?;
        self.as_node_list(expression, Some(node))
    }

    fn context_node(&self, node: Option<NodeRef<'d>>) -> Result<NodeRef<'d>, ExtractError> {
        match node {
            None => Ok(self.document.root()),
            Some(n) if n.belongs_to(self.document) => Ok(n),
            Some(_) => Err(ExtractError::ForeignNode),
        }
    }
}

pub(crate) fn ensure_relative(expression: &str) -> Result<(), ExtractError> {
    if expression.trim_start().starts_with('.') {
        Ok(())
    } else {
        Err(ExtractError::InvalidRelativeExpression(expression.to_string()))
    }
}
