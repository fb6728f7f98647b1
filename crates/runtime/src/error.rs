use thiserror::Error;

use crate::binding::BindingError;
use crate::template::TemplateError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid expression `{expression}`: {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: lingo_xpath::Error,
    },
    #[error("relative expression `{0}` must start with `.`")]
    InvalidRelativeExpression(String),
    #[error("context node belongs to a different document")]
    ForeignNode,
    #[error("evaluation of `{expression}` failed: {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: lingo_xpath::Error,
    },
    #[error("failed to resolve `{expression}`: {source}")]
    Resolution {
        expression: String,
        #[source]
        source: Box<ExtractError>,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn resolution(expression: &str, source: ExtractError) -> Self {
        ExtractError::Resolution { expression: expression.to_string(), source: Box::new(source) }
    }

    /// The innermost error below any `Resolution` wrappers.
    pub fn root_cause(&self) -> &ExtractError {
        match self {
            ExtractError::Resolution { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
