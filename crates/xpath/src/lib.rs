//! XPath 1.0 over immutable, thread-shareable XML documents.
//!
//! ```
//! use lingo_xpath::{Document, compile_xpath, evaluate};
//!
//! let doc = Document::parse("<r><a>1</a><a>2</a></r>").unwrap();
//! let compiled = compile_xpath("sum(/r/a)").unwrap();
//! let value = evaluate(&compiled, doc.root()).unwrap();
//! assert_eq!(value.to_number(), 3.0);
//! ```

pub mod compiler;
pub mod document;
pub mod evaluator;
pub mod functions;
pub mod model;
pub mod parser;
pub mod runtime;
pub mod value;

pub use compiler::ir::CompiledXPath;
pub use compiler::{compile_xpath, compile_xpath_with_context};
pub use document::{Document, NodeId, NodeRef, XmlError};
pub use evaluator::{evaluate, evaluate_nodes};
pub use model::{ExpandedName, NodeKind, QName, XML_NS};
pub use parser::parse_xpath;
pub use runtime::{Error, ErrorCode, ErrorKind, StaticContext, StaticContextBuilder};
pub use value::XPathValue;
