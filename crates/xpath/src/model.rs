use compact_str::CompactString;
use std::fmt;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Lexical name as it appeared in the source, together with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<CompactString>,
    pub local: CompactString,
    pub ns_uri: Option<CompactString>,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str, ns_uri: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(CompactString::from),
            local: CompactString::from(local),
            ns_uri: ns_uri.map(CompactString::from),
        }
    }

    pub fn expanded(&self) -> ExpandedName {
        ExpandedName { ns_uri: self.ns_uri.clone(), local: self.local.clone() }
    }

    /// `prefix:local` or just `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local),
            None => self.local.to_string(),
        }
    }
}

/// Namespace URI + local name; the identity used by name tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<CompactString>,
    pub local: CompactString,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<&str>, local: &str) -> Self {
        Self { ns_uri: ns_uri.map(CompactString::from), local: CompactString::from(local) }
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}
