//! Memoized compilation of query expressions.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use lingo_xpath::{CompiledXPath, StaticContext, compile_xpath_with_context};

use crate::error::ExtractError;

/// Compiled expressions keyed by their exact source text.
///
/// Compilation is idempotent, so concurrent callers racing on the same expression
/// may both compile it; the first insert wins and both receive that entry.
#[derive(Debug)]
pub struct QueryCache {
    entries: DashMap<String, Arc<CompiledXPath>>,
    static_ctx: StaticContext,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(StaticContext::default())
    }
}

impl QueryCache {
    pub fn new(static_ctx: StaticContext) -> Self {
        Self { entries: DashMap::new(), static_ctx }
    }

    pub fn compile(&self, expression: &str) -> Result<Arc<CompiledXPath>, ExtractError> {
        if let Some(hit) = self.entries.get(expression) {
            return Ok(Arc::clone(hit.value()));
        }
        trace!(expression, "query cache miss");
        let compiled = compile_xpath_with_context(expression, &self.static_ctx)
            .map_err(|source| ExtractError::InvalidExpression { expression: expression.to_string(), source })?;
        let entry = self.entries.entry(expression.to_string()).or_insert_with(|| Arc::new(compiled));
        Ok(Arc::clone(entry.value()))
    }

    /// Install a new default element namespace.
    ///
    /// Compiled expressions carry the old default in their name tests, so a change
    /// drops every entry. Setting the current value again keeps the cache.
    pub fn set_default_namespace(&mut self, uri: Option<&str>) {
        let uri = uri.filter(|u| !u.is_empty());
        if self.static_ctx.default_element_namespace() == uri {
            return;
        }
        debug!(
            previous = self.static_ctx.default_element_namespace(),
            current = uri,
            dropped = self.entries.len(),
            "default namespace changed, query cache invalidated"
        );
        self.static_ctx.set_default_element_namespace(uri);
        self.entries.clear();
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.static_ctx.default_element_namespace()
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_ctx
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
