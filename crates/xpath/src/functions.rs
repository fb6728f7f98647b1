//! XPath 1.0 core function library (plus `ends-with`).

use crate::document::NodeRef;
use crate::runtime::Error;
use crate::value::XPathValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Last,
    Position,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    EndsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        use Function::*;
        Some(match name {
            "last" => Last,
            "position" => Position,
            "count" => Count,
            "local-name" => LocalName,
            "namespace-uri" => NamespaceUri,
            "name" => Name,
            "string" => String,
            "concat" => Concat,
            "starts-with" => StartsWith,
            "ends-with" => EndsWith,
            "contains" => Contains,
            "substring-before" => SubstringBefore,
            "substring-after" => SubstringAfter,
            "substring" => Substring,
            "string-length" => StringLength,
            "normalize-space" => NormalizeSpace,
            "translate" => Translate,
            "boolean" => Boolean,
            "not" => Not,
            "true" => True,
            "false" => False,
            "lang" => Lang,
            "number" => Number,
            "sum" => Sum,
            "floor" => Floor,
            "ceiling" => Ceiling,
            "round" => Round,
            _ => return None,
        })
    }

    /// Accepted argument counts: `(min, max)`, `None` for variadic.
    pub fn arity(self) -> (usize, Option<usize>) {
        use Function::*;
        match self {
            Last | Position | True | False => (0, Some(0)),
            LocalName | NamespaceUri | Name | String | StringLength | NormalizeSpace | Number => (0, Some(1)),
            Count | Boolean | Not | Lang | Sum | Floor | Ceiling | Round => (1, Some(1)),
            StartsWith | EndsWith | Contains | SubstringBefore | SubstringAfter => (2, Some(2)),
            Substring => (2, Some(3)),
            Translate => (3, Some(3)),
            Concat => (2, None),
        }
    }
}

/// Focus of evaluation: context node, its position and the context size.
#[derive(Debug, Clone, Copy)]
pub struct Focus<'d> {
    pub node: NodeRef<'d>,
    pub position: usize,
    pub size: usize,
}

// Context sizes and positions are far below 2^52.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn call<'d>(func: Function, args: Vec<XPathValue<'d>>, focus: &Focus<'d>) -> Result<XPathValue<'d>, Error> {
    use Function::*;
    let mut args = args.into_iter();
    let mut next = move || args.next();
    let string_arg = |v: Option<XPathValue<'d>>| v.map_or_else(|| focus.node.string_value(), |v| v.to_xpath_string());
    let node_arg = |v: Option<XPathValue<'d>>| -> Result<Option<NodeRef<'d>>, Error> {
        match v {
            None => Ok(Some(focus.node)),
            Some(v) => Ok(v.into_nodes()?.first().copied()),
        }
    };

    Ok(match func {
        Last => XPathValue::Number(focus.size as f64),
        Position => XPathValue::Number(focus.position as f64),
        Count => XPathValue::Number(required(next())?.into_nodes()?.len() as f64),
        LocalName => XPathValue::String(node_arg(next())?.map(|n| n.local_name().to_string()).unwrap_or_default()),
        NamespaceUri => {
            XPathValue::String(node_arg(next())?.and_then(|n| n.namespace_uri()).unwrap_or_default().to_string())
        }
        Name => XPathValue::String(
            node_arg(next())?.and_then(|n| n.name()).map(crate::model::QName::qualified).unwrap_or_default(),
        ),
        String => XPathValue::String(string_arg(next())),
        Concat => {
            let mut out = std::string::String::new();
            while let Some(v) = next() {
                out.push_str(&v.to_xpath_string());
            }
            XPathValue::String(out)
        }
        StartsWith => {
            let (s, p) = (string_arg(next()), string_arg(next()));
            XPathValue::Boolean(s.starts_with(&p))
        }
        EndsWith => {
            let (s, p) = (string_arg(next()), string_arg(next()));
            XPathValue::Boolean(s.ends_with(&p))
        }
        Contains => {
            let (s, p) = (string_arg(next()), string_arg(next()));
            XPathValue::Boolean(s.contains(&p))
        }
        SubstringBefore => {
            let (s, p) = (string_arg(next()), string_arg(next()));
            XPathValue::String(s.find(&p).map(|i| s[..i].to_string()).unwrap_or_default())
        }
        SubstringAfter => {
            let (s, p) = (string_arg(next()), string_arg(next()));
            XPathValue::String(s.find(&p).map(|i| s[i + p.len()..].to_string()).unwrap_or_default())
        }
        Substring => {
            let s = string_arg(next());
            let start = required(next())?.to_number();
            let len = next().map(|v| v.to_number());
            XPathValue::String(substring(&s, start, len))
        }
        StringLength => XPathValue::Number(string_arg(next()).chars().count() as f64),
        NormalizeSpace => XPathValue::String(string_arg(next()).split_whitespace().collect::<Vec<_>>().join(" ")),
        Translate => {
            let (s, from, to) = (string_arg(next()), string_arg(next()), string_arg(next()));
            XPathValue::String(translate(&s, &from, &to))
        }
        Boolean => XPathValue::Boolean(required(next())?.to_boolean()),
        Not => XPathValue::Boolean(!required(next())?.to_boolean()),
        True => XPathValue::Boolean(true),
        False => XPathValue::Boolean(false),
        Lang => {
            let wanted = string_arg(next());
            XPathValue::Boolean(focus.node.inherited_lang().is_some_and(|l| lang_matches(l, &wanted)))
        }
        Number => XPathValue::Number(next().map_or_else(
            || XPathValue::NodeSet(vec![focus.node]).to_number(),
            |v| v.to_number(),
        )),
        Sum => XPathValue::Number(
            required(next())?
                .into_nodes()?
                .iter()
                .map(|n| crate::value::string_to_number(&n.string_value()))
                .sum(),
        ),
        Floor => XPathValue::Number(required(next())?.to_number().floor()),
        Ceiling => XPathValue::Number(required(next())?.to_number().ceil()),
        Round => XPathValue::Number(round(required(next())?.to_number())),
    })
}

fn required(v: Option<XPathValue<'_>>) -> Result<XPathValue<'_>, Error> {
    v.ok_or_else(|| Error::type_err("missing function argument"))
}

fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    // -0.5 rounds to -0, which compares equal to 0 anyway.
    (n + 0.5).floor()
}

// Character positions are compared as doubles so NaN and infinities fall out naturally.
#[allow(clippy::cast_precision_loss)]
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    let first = round(start);
    let last = len.map_or(f64::INFINITY, |l| first + round(l));
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= first && p < last
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

/// `lang()` matching: equal ignoring case, or `wanted` followed by a `-` subtag.
fn lang_matches(lang: &str, wanted: &str) -> bool {
    let lang = lang.to_ascii_lowercase();
    let wanted = wanted.to_ascii_lowercase();
    lang == wanted || lang.strip_prefix(wanted.as_str()).is_some_and(|rest| rest.starts_with('-'))
}
