//! Immutable XML document stored as a flat arena in document order.
//!
//! Nodes are appended while parsing in exactly the order XPath defines as document
//! order (element, its attributes, then its children), so ordering two nodes of the
//! same document is an integer comparison of their ids. Each node also records where
//! its subtree ends, which turns the `descendant`, `following` and `preceding` axes
//! into range scans.
//!
//! ```
//! use lingo_xpath::Document;
//!
//! let doc = Document::parse(r#"<book xml:lang="de"><title>Ein Titel</title></book>"#).unwrap();
//! let book = doc.root_element().unwrap();
//! assert_eq!(book.lang(), Some("de"));
//! assert_eq!(book.string_value(), "Ein Titel");
//! ```

use compact_str::CompactString;
use quick_xml::NsReader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

use crate::model::{NodeKind, QName, XML_NS};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },
    #[error("invalid UTF-8 in XML: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("unknown entity reference `&{0};`")]
    UnknownEntity(String),
    #[error("unexpected end of XML inside `{0}`")]
    UnexpectedEof(String),
    #[error("document exceeds the supported number of nodes")]
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: Option<NodeId>,
    attributes: Vec<NodeId>,
    children: Vec<NodeId>,
    // one past the last node of this subtree, attributes included
    end: u32,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Parse `input` into an immutable document.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let mut reader = NsReader::from_str(input);
        let mut tree = TreeBuilder::new();
        loop {
            let position = reader.buffer_position() as u64;
            let parse_err = |e: &dyn fmt::Display| XmlError::Parse { position, message: e.to_string() };
            let (resolve, event) = reader.read_resolved_event().map_err(|e| parse_err(&e))?;
            let element_ns = resolve_namespace(resolve, position)?;
            match event {
                Event::Start(e) => {
                    let (name, attrs) = element_parts(&reader, &e, element_ns, position)?;
                    tree.open_element(name, attrs)?;
                }
                Event::Empty(e) => {
                    let (name, attrs) = element_parts(&reader, &e, element_ns, position)?;
                    tree.open_element(name, attrs)?;
                    tree.close_element()?;
                }
                Event::End(_) => tree.close_element()?,
                Event::Text(e) => {
                    let text = e.decode().map_err(|e| parse_err(&e))?;
                    tree.text.push_str(&text);
                }
                Event::CData(e) => tree.text.push_str(std::str::from_utf8(e.as_ref())?),
                Event::GeneralRef(e) => {
                    let raw = e.decode().map_err(|e| parse_err(&e))?;
                    tree.text.push_str(&resolve_entity(&raw)?);
                }
                Event::Comment(e) => {
                    let text = std::str::from_utf8(e.as_ref())?;
                    tree.leaf(NodeKind::Comment, None, text.to_string())?;
                }
                Event::PI(e) => {
                    let content = std::str::from_utf8(e.as_ref())?;
                    let (target, data) = content.split_once(char::is_whitespace).unwrap_or((content, ""));
                    tree.leaf(
                        NodeKind::ProcessingInstruction,
                        Some(QName::new(None, target, None)),
                        data.trim().to_string(),
                    )?;
                }
                Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }
        tree.finish()
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef { doc: self, id: NodeId(0) }
    }

    /// The document element, if any.
    pub fn root_element(&self) -> Option<NodeRef<'_>> {
        self.root().children().find(|n| n.kind() == NodeKind::Element)
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { doc: self, id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    // Indices handed out here always come from the arena itself.
    #[allow(clippy::cast_possible_truncation)]
    fn handle(&self, index: usize) -> NodeRef<'_> {
        NodeRef { doc: self, id: NodeId(index as u32) }
    }
}

/// Lightweight handle to a node of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl Hash for NodeRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::from_ref(self.doc).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id.0)
            .field("kind", &self.kind())
            .field("name", &self.name().map(QName::qualified))
            .finish()
    }
}

impl<'d> NodeRef<'d> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Whether this handle points into `doc`.
    pub fn belongs_to(&self, doc: &Document) -> bool {
        std::ptr::eq(self.doc, doc)
    }

    fn data(&self) -> &'d NodeData {
        self.doc.data(self.id)
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn name(&self) -> Option<&'d QName> {
        self.data().name.as_ref()
    }

    pub fn local_name(&self) -> &'d str {
        self.name().map_or("", |n| n.local.as_str())
    }

    pub fn namespace_uri(&self) -> Option<&'d str> {
        self.name().and_then(|n| n.ns_uri.as_deref())
    }

    /// Text of attribute, text, comment and processing-instruction nodes.
    pub fn value(&self) -> Option<&'d str> {
        self.data().value.as_deref()
    }

    pub fn parent(&self) -> Option<NodeRef<'d>> {
        self.data().parent.map(|id| NodeRef { doc: self.doc, id })
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| NodeRef { doc, id })
    }

    pub fn attributes(&self) -> impl DoubleEndedIterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        self.data().attributes.iter().map(move |&id| NodeRef { doc, id })
    }

    /// Value of the attribute `{ns_uri}local` on this element.
    pub fn attribute(&self, ns_uri: Option<&str>, local: &str) -> Option<&'d str> {
        self.attributes()
            .find(|a| a.local_name() == local && a.namespace_uri() == ns_uri)
            .and_then(|a| a.value())
    }

    /// Descendants in document order, attributes excluded.
    pub fn descendants(&self) -> impl DoubleEndedIterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        (self.id.index() + 1..self.data().end as usize)
            .filter(move |&i| doc.nodes[i].kind != NodeKind::Attribute)
            .map(move |i| doc.handle(i))
    }

    /// Nodes after this node's subtree, in document order.
    pub fn following(&self) -> impl DoubleEndedIterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        (self.data().end as usize..doc.nodes.len())
            .filter(move |&i| doc.nodes[i].kind != NodeKind::Attribute)
            .map(move |i| doc.handle(i))
    }

    /// Nodes before this node that are not its ancestors, in document order.
    pub fn preceding(&self) -> impl DoubleEndedIterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        let id = self.id.0;
        (0..self.id.index())
            .filter(move |&i| doc.nodes[i].kind != NodeKind::Attribute && doc.nodes[i].end <= id)
            .map(move |i| doc.handle(i))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'d>> + use<'d> {
        std::iter::successors(self.parent(), NodeRef::parent)
    }

    pub fn following_siblings(&self) -> impl Iterator<Item = NodeRef<'d>> + use<'d> {
        self.siblings().filter({
            let id = self.id;
            move |n| n.id > id
        })
    }

    /// Preceding siblings, nearest first.
    pub fn preceding_siblings(&self) -> impl Iterator<Item = NodeRef<'d>> + use<'d> {
        let id = self.id;
        let doc = self.doc;
        let siblings: &'d [NodeId] = match (self.kind(), self.data().parent) {
            (NodeKind::Attribute, _) | (_, None) => &[],
            (_, Some(p)) => &doc.data(p).children,
        };
        siblings.iter().rev().filter(move |&&s| s < id).map(move |&s| NodeRef { doc, id: s })
    }

    fn siblings(&self) -> impl Iterator<Item = NodeRef<'d>> + use<'d> {
        let doc = self.doc;
        let siblings: &'d [NodeId] = match (self.kind(), self.data().parent) {
            (NodeKind::Attribute, _) | (_, None) => &[],
            (_, Some(p)) => &doc.data(p).children,
        };
        siblings.iter().map(move |&id| NodeRef { doc, id })
    }

    pub fn is_ancestor_of(&self, other: &NodeRef<'_>) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id < other.id && other.id.0 < self.data().end
    }

    /// XPath string-value.
    pub fn string_value(&self) -> String {
        match self.kind() {
            NodeKind::Root | NodeKind::Element => {
                let mut out = String::new();
                for i in self.id.index() + 1..self.data().end as usize {
                    let node = &self.doc.nodes[i];
                    if node.kind == NodeKind::Text {
                        out.push_str(node.value.as_deref().unwrap_or_default());
                    }
                }
                out
            }
            _ => self.value().unwrap_or_default().to_string(),
        }
    }

    /// The element itself, or the element owning an attribute, text or other leaf node.
    pub fn owner_element(&self) -> Option<NodeRef<'d>> {
        match self.kind() {
            NodeKind::Element => Some(*self),
            NodeKind::Root => None,
            _ => self.parent().filter(|p| p.kind() == NodeKind::Element),
        }
    }

    /// `xml:lang` declared directly on the owning element.
    pub fn lang(&self) -> Option<&'d str> {
        self.owner_element().and_then(|e| e.attribute(Some(XML_NS), "lang"))
    }

    /// `xml:lang` of the nearest ancestor-or-self element declaring one.
    pub fn inherited_lang(&self) -> Option<&'d str> {
        let start = self.owner_element()?;
        std::iter::once(start)
            .chain(start.ancestors())
            .find_map(|e| e.attribute(Some(XML_NS), "lang"))
    }
}

struct TreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
    text: String,
}

impl TreeBuilder {
    fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Root,
            name: None,
            value: None,
            parent: None,
            attributes: Vec::new(),
            children: Vec::new(),
            end: 1,
        };
        Self { nodes: vec![root], open: vec![NodeId(0)], text: String::new() }
    }

    fn push(&mut self, kind: NodeKind, name: Option<QName>, value: Option<String>) -> Result<NodeId, XmlError> {
        let raw = u32::try_from(self.nodes.len()).map_err(|_| XmlError::TooLarge)?;
        let id = NodeId(raw);
        let parent = self.open.last().copied();
        self.nodes.push(NodeData {
            kind,
            name,
            value,
            parent,
            attributes: Vec::new(),
            children: Vec::new(),
            end: raw + 1,
        });
        if let Some(p) = parent {
            let pdata = &mut self.nodes[p.index()];
            if kind == NodeKind::Attribute { pdata.attributes.push(id) } else { pdata.children.push(id) }
        }
        Ok(id)
    }

    fn flush_text(&mut self) -> Result<(), XmlError> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text);
        // Text directly under the root (whitespace around the document element) is not kept.
        if self.open.len() > 1 {
            self.push(NodeKind::Text, None, Some(text))?;
        }
        Ok(())
    }

    fn leaf(&mut self, kind: NodeKind, name: Option<QName>, value: String) -> Result<(), XmlError> {
        self.flush_text()?;
        self.push(kind, name, Some(value))?;
        Ok(())
    }

    fn open_element(&mut self, name: QName, attrs: Vec<(QName, String)>) -> Result<(), XmlError> {
        self.flush_text()?;
        let id = self.push(NodeKind::Element, Some(name), None)?;
        self.open.push(id);
        for (attr_name, value) in attrs {
            self.push(NodeKind::Attribute, Some(attr_name), Some(value))?;
        }
        Ok(())
    }

    fn close_element(&mut self) -> Result<(), XmlError> {
        self.flush_text()?;
        if self.open.len() > 1
            && let Some(id) = self.open.pop()
        {
            let end = u32::try_from(self.nodes.len()).map_err(|_| XmlError::TooLarge)?;
            self.nodes[id.index()].end = end;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Document, XmlError> {
        self.flush_text()?;
        if self.open.len() > 1 {
            let open = self.open[self.open.len() - 1];
            let name = self.nodes[open.index()].name.as_ref().map(QName::qualified).unwrap_or_default();
            return Err(XmlError::UnexpectedEof(name));
        }
        let end = u32::try_from(self.nodes.len()).map_err(|_| XmlError::TooLarge)?;
        self.nodes[0].end = end;
        Ok(Document { nodes: self.nodes })
    }
}

fn element_parts(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    ns: Option<CompactString>,
    position: u64,
) -> Result<(QName, Vec<(QName, String)>), XmlError> {
    let qname = start.name();
    let prefix = qname.prefix().map(|p| std::str::from_utf8(p.as_ref()).map(CompactString::from)).transpose()?;
    let local_name = start.local_name();
    let local = std::str::from_utf8(local_name.as_ref())?;
    let name = QName { prefix, local: local.into(), ns_uri: ns };

    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse { position, message: e.to_string() })?;
        let key = attr.key;
        if key.as_ref() == b"xmlns" {
            continue;
        }
        if let Some(prefix) = key.prefix()
            && prefix.as_ref() == b"xmlns"
        {
            continue;
        }
        let (attr_resolve, _) = reader.resolver().resolve_attribute(key);
        let attr_ns = resolve_namespace(attr_resolve, position)?;
        let attr_prefix =
            key.prefix().map(|p| std::str::from_utf8(p.as_ref()).map(CompactString::from)).transpose()?;
        let attr_local_name = key.local_name();
        let attr_local = std::str::from_utf8(attr_local_name.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse { position, message: e.to_string() })?;
        attrs.push((
            QName { prefix: attr_prefix, local: attr_local.into(), ns_uri: attr_ns },
            value.into_owned(),
        ));
    }
    Ok((name, attrs))
}

fn resolve_namespace(resolve: ResolveResult<'_>, position: u64) -> Result<Option<CompactString>, XmlError> {
    match resolve {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).as_ref().into())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) if prefix == b"xml" => Ok(Some(XML_NS.into())),
        ResolveResult::Unknown(prefix) => Err(XmlError::Parse {
            position,
            message: format!("undeclared namespace prefix `{}`", String::from_utf8_lossy(&prefix)),
        }),
    }
}

fn resolve_entity(raw: &str) -> Result<String, XmlError> {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return Ok(resolved.into());
    }
    let code = if let Some(rest) = raw.strip_prefix('#') {
        if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            rest.parse::<u32>().ok()
        }
    } else {
        None
    };
    code.and_then(char::from_u32)
        .map(String::from)
        .ok_or_else(|| XmlError::UnknownEntity(raw.to_string()))
}
