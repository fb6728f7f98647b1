//! Locale-aware extraction of text values from XML documents.
//!
//! Values are located with lists of XPath expressions, bucketed by the `xml:lang` of
//! the matched nodes and optionally composed through templates with collapsible
//! contexts. [`BindingRegistry`] ties it together: it maps field names to validated
//! [`Binding`]s and resolves them against a [`DocumentReader`].
//!
//! ```
//! use lingo_runtime::{Binding, BindingRegistry, DocumentReader, Document, QueryCache};
//!
//! let doc = Document::parse(r#"<book xml:lang="en"><title>Dune</title><sub>Part One</sub></book>"#).unwrap();
//! let registry = BindingRegistry::builder()
//!     .register(
//!         Binding::builder("heading")
//!             .template("{title}<: {subtitle}>")
//!             .variable("title", ["/book/title"])
//!             .variable("subtitle", ["/book/subtitle", "/book/sub"])
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let cache = QueryCache::default();
//! let reader = DocumentReader::new(&doc, &cache);
//! let value = registry.resolve("heading", &reader).unwrap();
//! assert_eq!(value.as_single(), Some("Dune: Part One"));
//! ```

mod binding;
mod cache;
mod config;
mod error;
mod locale;
mod reader;
mod resolver;
pub mod template;
mod view;

pub use binding::{
    Binding, BindingBuilder, BindingDecl, BindingError, BindingRegistry, BindingRegistryBuilder, Cardinality,
    FieldValue, Strategy, Variable,
};
pub use cache::QueryCache;
pub use config::EngineConfig;
pub use error::ExtractError;
pub use lingo_xpath::{Document, NodeRef, XmlError};
pub use locale::Locale;
pub use reader::DocumentReader;
pub use resolver::{ResolvedVariable, VariableResolver, value_of};
pub use template::{Template, TemplateError};
pub use view::QueryView;
