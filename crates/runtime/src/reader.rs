//! Typed extraction surface over one document.
//!
//! Every operation takes an expression list: alternatives for locating the same value.
//! Members are tried in order and the first one that selects at least one node wins;
//! a member selecting nodes with empty text still wins. With root paths configured a
//! member expands to one expression per root path, and all of those are collected.

use indexmap::IndexMap;
use tracing::trace;

use lingo_xpath::{Document, NodeRef};

use crate::binding::Variable;
use crate::cache::QueryCache;
use crate::config::EngineConfig;
use crate::error::ExtractError;
use crate::locale::Locale;
use crate::resolver::{ResolvedVariable, VariableResolver, bucket, value_of};
use crate::template::Template;
use crate::view::QueryView;

#[derive(Debug, Clone, Copy)]
pub struct DocumentReader<'d> {
    resolver: VariableResolver<'d>,
}

impl<'d> DocumentReader<'d> {
    pub fn new(document: &'d Document, cache: &'d QueryCache) -> Self {
        Self { resolver: VariableResolver::new(QueryView::new(document, cache)) }
    }

    /// Reader using the root paths and locale settings of `config`.
    pub fn with_config(document: &'d Document, cache: &'d QueryCache, config: &'d EngineConfig) -> Self {
        let resolver = VariableResolver::new(QueryView::new(document, cache))
            .with_root_paths(&config.root_paths)
            .with_inherited_lang(config.inherit_lang);
        Self { resolver }
    }

    #[must_use]
    pub fn with_root_paths(self, root_paths: &'d [String]) -> Self {
        Self { resolver: self.resolver.with_root_paths(root_paths) }
    }

    pub fn view(&self) -> QueryView<'d> {
        self.resolver.view()
    }

    pub fn resolver(&self) -> VariableResolver<'d> {
        self.resolver
    }

    fn first_match<S, K, V>(
        &self,
        key_path: Option<&str>,
        expressions: &[S],
        mut key_fn: impl FnMut(Option<NodeRef<'d>>) -> K,
        mut value_fn: impl FnMut(NodeRef<'d>) -> V,
    ) -> Result<Vec<(K, V)>, ExtractError>
    where
        S: AsRef<str>,
    {
        for (i, expression) in expressions.iter().enumerate() {
            let pairs =
                self.resolver.resolve_variable(key_path, std::slice::from_ref(expression), &mut key_fn, &mut value_fn)?;
            if !pairs.is_empty() {
                return Ok(pairs);
            }
            if i + 1 < expressions.len() {
                let expression: &str = expression.as_ref();
                trace!(expression, "no match, trying next expression");
            }
        }
        Ok(Vec::new())
    }

    fn localized<S: AsRef<str>>(&self, expressions: &[S]) -> Result<ResolvedVariable, ExtractError> {
        let resolver = self.resolver;
        let pairs = self.first_match(None, expressions, |_| (), |node| (resolver.locale_of(node), value_of(node)))?;
        Ok(bucket(pairs.into_iter().map(|(_, v)| v)))
    }

    /// First value of the first locale.
    pub fn resolve_single<S: AsRef<str>>(&self, expressions: &[S]) -> Result<Option<String>, ExtractError> {
        Ok(self.localized(expressions)?.into_values().flatten().next())
    }

    /// Every value, locales in order of first appearance.
    pub fn resolve_multi<S: AsRef<str>>(&self, expressions: &[S]) -> Result<Vec<String>, ExtractError> {
        Ok(self.localized(expressions)?.into_values().flatten().collect())
    }

    /// First value per locale.
    pub fn resolve_localized<S: AsRef<str>>(&self, expressions: &[S]) -> Result<IndexMap<Locale, String>, ExtractError> {
        Ok(self
            .localized(expressions)?
            .into_iter()
            .filter_map(|(locale, values)| values.into_iter().next().map(|v| (locale, v)))
            .collect())
    }

    pub fn resolve_localized_multi<S: AsRef<str>>(&self, expressions: &[S]) -> Result<ResolvedVariable, ExtractError> {
        self.localized(expressions)
    }

    /// Resolve each variable's expression list independently.
    pub fn resolve_variables(&self, variables: &[Variable]) -> Result<IndexMap<String, ResolvedVariable>, ExtractError> {
        variables
            .iter()
            .map(|var| Ok::<_, ExtractError>((var.name.clone(), self.localized(&var.expressions)?)))
            .collect()
    }

    /// Render `template` per locale. Variables the template names but `variables` lacks
    /// count as unresolved.
    pub fn resolve_template(
        &self,
        template: &Template,
        variables: &[Variable],
    ) -> Result<IndexMap<Locale, String>, ExtractError> {
        Ok(template.render(&self.resolve_variables(variables)?))
    }

    /// Rendering of the first locale.
    pub fn resolve_template_first(
        &self,
        template: &Template,
        variables: &[Variable],
    ) -> Result<Option<String>, ExtractError> {
        Ok(self.resolve_template(template, variables)?.into_values().next())
    }

    /// Map from the text of `key_path` (relative to each match) to the match's text.
    /// Matches without a key are skipped; the first value for a key wins.
    ///
    /// The winning member is chosen by node matches alone: a member whose matches all
    /// lack a key still wins, and yields an empty map without trying later members.
    pub fn resolve_keyed_map<S: AsRef<str>>(
        &self,
        expressions: &[S],
        key_path: &str,
    ) -> Result<IndexMap<String, String>, ExtractError> {
        let mut map = IndexMap::new();
        for (key, value) in self.keyed(expressions, key_path, value_of)? {
            map.entry(key).or_insert(value);
        }
        Ok(map)
    }

    /// Like [`resolve_keyed_map`](Self::resolve_keyed_map) but keeps the matched nodes.
    pub fn resolve_keyed_map_nodes<S: AsRef<str>>(
        &self,
        expressions: &[S],
        key_path: &str,
    ) -> Result<IndexMap<String, NodeRef<'d>>, ExtractError> {
        let mut map = IndexMap::new();
        for (key, node) in self.keyed(expressions, key_path, |node| node)? {
            map.entry(key).or_insert(node);
        }
        Ok(map)
    }

    /// Like [`resolve_keyed_map`](Self::resolve_keyed_map) but collects every value per key.
    pub fn resolve_keyed_map_multi<S: AsRef<str>>(
        &self,
        expressions: &[S],
        key_path: &str,
    ) -> Result<IndexMap<String, Vec<String>>, ExtractError> {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in self.keyed(expressions, key_path, value_of)? {
            map.entry(key).or_default().push(value);
        }
        Ok(map)
    }

    fn keyed<S, V>(
        &self,
        expressions: &[S],
        key_path: &str,
        value_fn: impl FnMut(NodeRef<'d>) -> V,
    ) -> Result<Vec<(String, V)>, ExtractError>
    where
        S: AsRef<str>,
    {
        let pairs = self.first_match(Some(key_path), expressions, |key| key.map(value_of), value_fn)?;
        Ok(pairs.into_iter().filter_map(|(key, value)| key.map(|k| (k, value))).collect())
    }
}
