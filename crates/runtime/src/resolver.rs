//! Turning expression lists into locale-bucketed values.

use indexmap::IndexMap;
use tracing::trace;

use lingo_xpath::NodeRef;

use crate::error::ExtractError;
use crate::locale::Locale;
use crate::view::{QueryView, ensure_relative};

/// Values of one variable per locale, both in encounter order.
pub type ResolvedVariable = IndexMap<Locale, Vec<String>>;

/// Evaluates raw expressions, with root-path prefixing, and maps every match through
/// caller supplied key and value functions.
#[derive(Debug, Clone, Copy)]
pub struct VariableResolver<'d> {
    view: QueryView<'d>,
    root_paths: &'d [String],
    inherit_lang: bool,
}

impl<'d> VariableResolver<'d> {
    pub fn new(view: QueryView<'d>) -> Self {
        Self { view, root_paths: &[], inherit_lang: false }
    }

    #[must_use]
    pub fn with_root_paths(mut self, root_paths: &'d [String]) -> Self {
        self.root_paths = root_paths;
        self
    }

    #[must_use]
    pub fn with_inherited_lang(mut self, inherit: bool) -> Self {
        self.inherit_lang = inherit;
        self
    }

    pub fn view(&self) -> QueryView<'d> {
        self.view
    }

    /// Concrete expressions for `expressions`: every root path in order, each combined
    /// with every raw expression in order. Without root paths the input is returned as is.
    pub fn expand<S: AsRef<str>>(&self, expressions: &[S]) -> Vec<String> {
        if self.root_paths.is_empty() {
            return expressions.iter().map(|e| e.as_ref().to_string()).collect();
        }
        self.root_paths
            .iter()
            .flat_map(|root| expressions.iter().map(move |e| format!("{root}{}", e.as_ref())))
            .collect()
    }

    /// Evaluate every expanded expression and collect one `(key, value)` pair per match.
    ///
    /// With a `key_path`, the key function receives the first node that path selects
    /// relative to the match (`None` if it selects nothing). All expressions are
    /// evaluated; picking a winner is up to the caller.
    pub fn resolve_variable<S, K, V>(
        &self,
        key_path: Option<&str>,
        expressions: &[S],
        mut key_fn: impl FnMut(Option<NodeRef<'d>>) -> K,
        mut value_fn: impl FnMut(NodeRef<'d>) -> V,
    ) -> Result<Vec<(K, V)>, ExtractError>
    where
        S: AsRef<str>,
    {
        if let Some(path) = key_path {
            ensure_relative(path).map_err(|e| ExtractError::resolution(path, e))?;
        }
        let mut pairs = Vec::new();
        for expression in self.expand(expressions) {
            let nodes =
                self.view.as_node_list(&expression, None).map_err(|e| ExtractError::resolution(&expression, e))?;
            trace!(expression = expression.as_str(), matches = nodes.len(), "resolved expression");
            for node in nodes {
                let key = match key_path {
                    Some(path) => {
                        self.view.relative(node, path).map_err(|e| ExtractError::resolution(path, e))?.first().copied()
                    }
                    None => None,
                };
                pairs.push((key_fn(key), value_fn(node)));
            }
        }
        Ok(pairs)
    }

    /// Values of all matches of `expressions`, bucketed by the locale of each match.
    pub fn resolve_localized<S: AsRef<str>>(&self, expressions: &[S]) -> Result<ResolvedVariable, ExtractError> {
        let pairs = self.resolve_variable(None, expressions, |_| (), |node| (self.locale_of(node), value_of(node)))?;
        Ok(bucket(pairs.into_iter().map(|(_, v)| v)))
    }

    pub fn locale_of(&self, node: NodeRef<'_>) -> Locale {
        let tag = if self.inherit_lang { node.inherited_lang() } else { node.lang() };
        Locale::from_tag(tag)
    }
}

/// Trimmed string-value of a matched node.
pub fn value_of(node: NodeRef<'_>) -> String {
    node.string_value().trim().to_string()
}

pub(crate) fn bucket(values: impl IntoIterator<Item = (Locale, String)>) -> ResolvedVariable {
    let mut out = ResolvedVariable::new();
    for (locale, value) in values {
        out.entry(locale).or_default().push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryCache;
    use lingo_xpath::Document;

    #[test]
    fn root_paths_come_before_raw_expressions() {
        let doc = Document::parse("<r/>").unwrap();
        let cache = QueryCache::default();
        let roots = vec!["/a".to_string(), "/b".to_string()];
        let resolver = VariableResolver::new(QueryView::new(&doc, &cache)).with_root_paths(&roots);
        assert_eq!(resolver.expand(&["/x", "/y"]), ["/a/x", "/a/y", "/b/x", "/b/y"]);
    }

    #[test]
    fn repeated_locales_append_in_encounter_order() {
        let values = [(Locale::parse("de"), "1"), (Locale::ROOT, "2"), (Locale::parse("de"), "3")];
        let bucketed = bucket(values.into_iter().map(|(l, v)| (l, v.to_string())));
        assert_eq!(bucketed.keys().map(ToString::to_string).collect::<Vec<_>>(), ["de", "und"]);
        assert_eq!(bucketed[&Locale::parse("de")], ["1", "3"]);
    }
}
