use serde::Deserialize;
use std::collections::BTreeMap;

use lingo_xpath::{StaticContext, StaticContextBuilder};

use crate::binding::{BindingDecl, BindingRegistry};
use crate::cache::QueryCache;
use crate::error::ExtractError;

/// Engine settings, usually loaded from JSON.
///
/// ```
/// use lingo_runtime::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{
///     "default_namespace": "urn:books",
///     "root_paths": ["/library/book"],
///     "bindings": [{ "field": "title", "expressions": ["/title"] }]
/// }"#).unwrap();
/// assert_eq!(config.root_paths, ["/library/book"]);
/// assert_eq!(config.registry().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Namespace of unprefixed element names in expressions.
    pub default_namespace: Option<String>,
    /// Extra prefix bindings available to every expression.
    pub namespaces: BTreeMap<String, String>,
    /// Prefixes prepended to every raw expression before evaluation.
    pub root_paths: Vec<String>,
    /// Take the locale from the nearest `xml:lang` on an ancestor when the matched node has none.
    pub inherit_lang: bool,
    pub bindings: Vec<BindingDecl>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ExtractError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn static_context(&self) -> StaticContext {
        let mut builder = StaticContextBuilder::new();
        if let Some(ns) = &self.default_namespace {
            builder = builder.with_default_element_namespace(ns.as_str());
        }
        for (prefix, uri) in &self.namespaces {
            builder = builder.with_namespace(prefix.as_str(), uri.as_str());
        }
        builder.build()
    }

    /// A fresh query cache compiling under this configuration's namespaces.
    pub fn query_cache(&self) -> QueryCache {
        QueryCache::new(self.static_context())
    }

    /// Validate the declared bindings and collect them into a registry.
    pub fn registry(&self) -> Result<BindingRegistry, ExtractError> {
        let mut builder = BindingRegistry::builder();
        for decl in &self.bindings {
            builder = builder.register(decl.to_binding()?);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "root_path": "/a" }"#).unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }

    #[test]
    fn namespaces_reach_the_static_context() {
        let config =
            EngineConfig::from_json_str(r#"{ "default_namespace": "urn:d", "namespaces": { "b": "urn:b" } }"#).unwrap();
        let ctx = config.static_context();
        assert_eq!(ctx.default_element_namespace(), Some("urn:d"));
        assert_eq!(ctx.resolve_prefix("b"), Some("urn:b"));
        assert!(!config.inherit_lang);
    }
}
