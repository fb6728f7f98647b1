//! XPath 1.0 value model and the conversions between its four types.

use crate::document::NodeRef;
use crate::runtime::{Error, ErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<'d> {
    /// Nodes in document order without duplicates.
    NodeSet(Vec<NodeRef<'d>>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'d> XPathValue<'d> {
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::NodeSet(nodes) => nodes.first().map_or(f64::NAN, |n| string_to_number(&n.string_value())),
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// `string()` conversion: the first node's string-value for node-sets.
    pub fn to_xpath_string(&self) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes.first().map(NodeRef::string_value).unwrap_or_default(),
            XPathValue::String(s) => s.clone(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::Boolean(b) => b.to_string(),
        }
    }

    pub fn into_nodes(self) -> Result<Vec<NodeRef<'d>>, Error> {
        match self {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::from_code(
                ErrorCode::XPTY0019,
                format!("expected a node-set, found {}", other.type_name()),
            )),
        }
    }
}

/// XPath 1.0 `number()` applied to a string: optional minus sign, digits with an optional
/// fraction, surrounding whitespace. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    let digits = t.strip_prefix('-').unwrap_or(t);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1;
    if valid { t.parse::<f64>().unwrap_or(f64::NAN) } else { f64::NAN }
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        // shortest round-trip form, never in exponent notation
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_parsing_follows_xpath_lexical_rules() {
        assert!((string_to_number(" 12.5 ") - 12.5).abs() < f64::EPSILON);
        assert!((string_to_number("-3") + 3.0).abs() < f64::EPSILON);
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("+1").is_nan());
        assert!(string_to_number(".").is_nan());
        assert!(string_to_number("").is_nan());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }
}
