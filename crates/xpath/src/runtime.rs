use compact_str::CompactString;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error as ThisError;

use crate::model::XML_NS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Static,
    Dynamic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Static => "static",
            ErrorKind::Dynamic => "dynamic",
        })
    }
}

/// Error codes emitted by the parser, compiler and evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    XPST0003, // syntax error
    XPST0008, // unsupported / undeclared variable reference
    XPST0017, // unknown function or wrong arity
    XPST0081, // unbound namespace prefix
    XPTY0004, // type error
    XPTY0019, // path step applied to a non-node
    FOER0000, // generic
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            XPST0003 => "err:XPST0003",
            XPST0008 => "err:XPST0008",
            XPST0017 => "err:XPST0017",
            XPST0081 => "err:XPST0081",
            XPTY0004 => "err:XPTY0004",
            XPTY0019 => "err:XPTY0019",
            FOER0000 => "err:FOER0000",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            XPST0003 | XPST0008 | XPST0017 | XPST0081 => ErrorKind::Static,
            XPTY0004 | XPTY0019 | FOER0000 => ErrorKind::Dynamic,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{kind} error {code}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { kind: code.kind(), code, message: msg.into() }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPST0003, msg)
    }

    pub fn type_err(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPTY0004, msg)
    }

    pub fn is_static(&self) -> bool {
        self.kind == ErrorKind::Static
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceBindings {
    pub by_prefix: HashMap<CompactString, CompactString>,
}

impl NamespaceBindings {
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(CompactString::as_str)
    }
}

/// Compile-time environment: prefix bindings and the default element namespace.
///
/// Both are baked into compiled expressions, so an expression compiled under one
/// context must not be reused under another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContext {
    pub default_element_namespace: Option<CompactString>,
    pub namespaces: NamespaceBindings,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut namespaces = NamespaceBindings::default();
        // The xml prefix is always bound and cannot be rebound.
        namespaces.by_prefix.insert("xml".into(), XML_NS.into());
        Self { default_element_namespace: None, namespaces }
    }
}

impl StaticContext {
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.resolve(prefix)
    }

    pub fn default_element_namespace(&self) -> Option<&str> {
        self.default_element_namespace.as_deref()
    }

    /// Replace the default element namespace; `None` and `""` both clear it.
    pub fn set_default_element_namespace(&mut self, uri: Option<&str>) {
        self.default_element_namespace = uri.filter(|u| !u.is_empty()).map(CompactString::from);
    }
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self { ctx: StaticContext::default() }
    }

    /// Namespace applied to unprefixed element name tests.
    #[must_use]
    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        self.ctx.default_element_namespace = if uri.is_empty() { None } else { Some(uri.into()) };
        self
    }

    /// Bind `prefix` to `uri`. Attempts to rebind `xml` are ignored.
    #[must_use]
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        let uri: String = uri.into();
        if prefix != "xml" {
            self.ctx.namespaces.by_prefix.insert(CompactString::from(prefix), CompactString::from(uri));
        }
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}
