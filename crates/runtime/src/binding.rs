//! Field bindings and the registry that dispatches on them.
//!
//! A binding maps a field name either to a plain expression list or to a template with
//! its variables, plus the shape of the result. All declaration errors surface when the
//! binding is built, so a binding that exists can always be resolved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

use crate::error::ExtractError;
use crate::locale::Locale;
use crate::reader::DocumentReader;
use crate::resolver::ResolvedVariable;
use crate::template::Template;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("field `{field}` must declare exactly one of an expression list or a template")]
    AmbiguousDeclaration { field: String },
    #[error("field `{field}` uses undeclared template variables: {}", names.join(", "))]
    MissingVariable { field: String, names: Vec<String> },
    #[error("field `{field}` is templated and cannot produce {cardinality}")]
    IncompatibleCardinality { field: String, cardinality: Cardinality },
    #[error("field `{field}` declares an empty expression list")]
    EmptyExpressionList { field: String },
    #[error("field `{field}` declares variable `{name}` more than once")]
    DuplicateVariable { field: String, name: String },
    #[error("binding declared without a field name")]
    EmptyFieldName,
    #[error("field `{0}` is registered more than once")]
    DuplicateField(String),
    #[error("no binding registered for field `{0}`")]
    UnknownField(String),
}

/// Result shape of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    List,
    LocaleMap,
    LocaleMapList,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Cardinality::Single => "a single value",
            Cardinality::List => "a list",
            Cardinality::LocaleMap => "a locale map",
            Cardinality::LocaleMapList => "a locale map of lists",
        })
    }
}

/// A named template variable and the expression list that locates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub expressions: Vec<String>,
}

impl Variable {
    pub fn new<I, S>(name: impl Into<String>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), expressions: expressions.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Expressions(Vec<String>),
    Template { template: Template, variables: Vec<Variable> },
}

/// Resolved field value, shaped by the binding's [`Cardinality`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Option<String>),
    List(Vec<String>),
    LocaleMap(IndexMap<Locale, String>),
    LocaleMapList(ResolvedVariable),
}

impl FieldValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Whether nothing was found for the field.
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Single(value) => value.is_none(),
            FieldValue::List(values) => values.is_empty(),
            FieldValue::LocaleMap(map) => map.is_empty(),
            FieldValue::LocaleMapList(map) => map.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    field: String,
    strategy: Strategy,
    cardinality: Cardinality,
}

impl Binding {
    pub fn builder(field: impl Into<String>) -> BindingBuilder {
        BindingBuilder {
            field: field.into(),
            expressions: None,
            template: None,
            variables: Vec::new(),
            cardinality: Cardinality::default(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn resolve(&self, reader: &DocumentReader<'_>) -> Result<FieldValue, ExtractError> {
        Ok(match (&self.strategy, self.cardinality) {
            (Strategy::Expressions(exprs), Cardinality::Single) => FieldValue::Single(reader.resolve_single(exprs)?),
            (Strategy::Expressions(exprs), Cardinality::List) => FieldValue::List(reader.resolve_multi(exprs)?),
            (Strategy::Expressions(exprs), Cardinality::LocaleMap) => {
                FieldValue::LocaleMap(reader.resolve_localized(exprs)?)
            }
            (Strategy::Expressions(exprs), Cardinality::LocaleMapList) => {
                FieldValue::LocaleMapList(reader.resolve_localized_multi(exprs)?)
            }
            (Strategy::Template { template, variables }, Cardinality::Single) => {
                FieldValue::Single(reader.resolve_template_first(template, variables)?)
            }
            (Strategy::Template { template, variables }, Cardinality::LocaleMap) => {
                FieldValue::LocaleMap(reader.resolve_template(template, variables)?)
            }
            // rejected by `BindingBuilder::build`
            (Strategy::Template { .. }, cardinality) => {
                return Err(BindingError::IncompatibleCardinality { field: self.field.clone(), cardinality }.into());
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct BindingBuilder {
    field: String,
    expressions: Option<Vec<String>>,
    template: Option<String>,
    variables: Vec<Variable>,
    cardinality: Cardinality,
}

impl BindingBuilder {
    #[must_use]
    pub fn expressions<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expressions = Some(expressions.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    #[must_use]
    pub fn variable<I, S>(mut self, name: impl Into<String>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables.push(Variable::new(name, expressions));
        self
    }

    #[must_use]
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn build(self) -> Result<Binding, ExtractError> {
        let field = self.field;
        if field.trim().is_empty() {
            return Err(BindingError::EmptyFieldName.into());
        }
        let strategy = match (self.expressions, self.template) {
            (Some(expressions), None) if self.variables.is_empty() => {
                if expressions.is_empty() {
                    return Err(BindingError::EmptyExpressionList { field }.into());
                }
                Strategy::Expressions(expressions)
            }
            (None, Some(source)) => {
                if matches!(self.cardinality, Cardinality::List | Cardinality::LocaleMapList) {
                    return Err(BindingError::IncompatibleCardinality { field, cardinality: self.cardinality }.into());
                }
                let template = Template::parse(&source)?;
                let mut declared = BTreeSet::new();
                for var in &self.variables {
                    if var.expressions.is_empty() {
                        return Err(BindingError::EmptyExpressionList { field }.into());
                    }
                    if !declared.insert(var.name.as_str()) {
                        return Err(BindingError::DuplicateVariable { field, name: var.name.clone() }.into());
                    }
                }
                let mut missing: Vec<String> =
                    template.variable_names().iter().filter(|n| !declared.contains(n.as_str())).cloned().collect();
                if !missing.is_empty() {
                    missing.sort();
                    return Err(BindingError::MissingVariable { field, names: missing }.into());
                }
                Strategy::Template { template, variables: self.variables }
            }
            _ => return Err(BindingError::AmbiguousDeclaration { field }.into()),
        };
        Ok(Binding { field, strategy, cardinality: self.cardinality })
    }
}

/// Serialized form of a binding, as found in [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingDecl {
    pub field: String,
    #[serde(default)]
    pub expressions: Option<Vec<String>>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl BindingDecl {
    pub fn to_binding(&self) -> Result<Binding, ExtractError> {
        let mut builder = Binding::builder(self.field.as_str()).cardinality(self.cardinality);
        if let Some(expressions) = &self.expressions {
            builder = builder.expressions(expressions.iter().map(String::as_str));
        }
        if let Some(template) = &self.template {
            builder = builder.template(template.as_str());
        }
        for (name, expressions) in &self.variables {
            builder = builder.variable(name.as_str(), expressions.iter().map(String::as_str));
        }
        builder.build()
    }
}

/// Bindings by field name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: IndexMap<String, Binding>,
}

#[derive(Debug, Default)]
pub struct BindingRegistryBuilder {
    bindings: Vec<Binding>,
}

impl BindingRegistryBuilder {
    #[must_use]
    pub fn register(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn build(self) -> Result<BindingRegistry, BindingError> {
        let mut bindings = IndexMap::with_capacity(self.bindings.len());
        for binding in self.bindings {
            let field = binding.field.clone();
            if bindings.insert(field.clone(), binding).is_some() {
                return Err(BindingError::DuplicateField(field));
            }
        }
        debug!(fields = bindings.len(), "binding registry built");
        Ok(BindingRegistry { bindings })
    }
}

impl BindingRegistry {
    pub fn builder() -> BindingRegistryBuilder {
        BindingRegistryBuilder::default()
    }

    pub fn get(&self, field: &str) -> Option<&Binding> {
        self.bindings.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn resolve(&self, field: &str, reader: &DocumentReader<'_>) -> Result<FieldValue, ExtractError> {
        let binding = self.get(field).ok_or_else(|| BindingError::UnknownField(field.to_string()))?;
        binding.resolve(reader)
    }

    /// Resolve every registered field in registration order.
    pub fn resolve_all(&self, reader: &DocumentReader<'_>) -> Result<IndexMap<String, FieldValue>, ExtractError> {
        self.bindings
            .iter()
            .map(|(field, binding)| Ok::<_, ExtractError>((field.clone(), binding.resolve(reader)?)))
            .collect()
    }
}
