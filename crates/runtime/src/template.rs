//! Templates with `{name}` placeholders and collapsible `<...>` contexts.
//!
//! A context is an optional sub-phrase: when a placeholder directly inside it has no
//! value (or an empty one) the whole context, delimiters included, renders as nothing.
//! Contexts nest, and inner contexts are settled before their parent is judged, so in
//! `{a}<: {b}< [{c}]>>` a missing `c` only drops ` [..]` while a missing `b` drops
//! everything after `{a}`. A placeholder outside any context is required: if it has no
//! value at all, the template does not render for that locale.
//!
//! `\<` and `\>` stand for literal angle brackets. Any other backslash is literal.
//!
//! ```
//! use indexmap::IndexMap;
//! use lingo_runtime::{Locale, ResolvedVariable, Template};
//!
//! let template = Template::parse("{title}<: {subtitle}>").unwrap();
//! let mut vars = IndexMap::new();
//! vars.insert("title".to_string(), ResolvedVariable::from([(Locale::parse("en"), vec!["Dune".to_string()])]));
//! let rendered = template.render(&vars);
//! assert_eq!(rendered[&Locale::parse("en")], "Dune");
//! ```

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::trace;

use crate::locale::Locale;
use crate::resolver::ResolvedVariable;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_-]+)\}").expect("placeholder pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("mismatched context delimiter at byte {position}")]
    MismatchedDelimiters { position: usize },
}

/// Names of all placeholders in `template`, deduplicated.
pub fn variable_names(template: &str) -> BTreeSet<String> {
    PLACEHOLDER.captures_iter(template).map(|c| c[1].to_string()).collect()
}

/// A context block located by [`extract_context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpan<'a> {
    /// Text between the delimiters, escapes untouched.
    pub inner: &'a str,
    /// Byte range of the block including both delimiters.
    pub span: Range<usize>,
}

/// Find the innermost context that closes first.
///
/// For `a<b<c>d>e` this is `c`. Replacing that span and calling again walks the
/// contexts innermost-first. The whole input is checked for balance on every call.
pub fn extract_context(template: &str) -> Result<Option<ContextSpan<'_>>, TemplateError> {
    let mut open: Vec<usize> = Vec::new();
    let mut first: Option<Range<usize>> = None;
    for (pos, token) in Scanner::new(template) {
        match token {
            Token::Open => open.push(pos),
            Token::Close => {
                let start = open.pop().ok_or(TemplateError::MismatchedDelimiters { position: pos })?;
                first.get_or_insert(start..pos + 1);
            }
            Token::Char(_) => {}
        }
    }
    if let Some(&position) = open.first() {
        return Err(TemplateError::MismatchedDelimiters { position });
    }
    Ok(first.map(|span| ContextSpan { inner: &template[span.start + 1..span.end - 1], span }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Char(char),
    Open,
    Close,
}

/// Character scanner with the two states plain and escape-pending folded into a
/// one-character lookahead.
struct Scanner<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.char_indices().peekable() }
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, Token);

    fn next(&mut self) -> Option<Self::Item> {
        let (pos, c) = self.chars.next()?;
        let token = match c {
            '\\' => match self.chars.peek() {
                Some(&(_, escaped @ ('<' | '>'))) => {
                    self.chars.next();
                    Token::Char(escaped)
                }
                _ => Token::Char('\\'),
            },
            '<' => Token::Open,
            '>' => Token::Close,
            c => Token::Char(c),
        };
        Some((pos, token))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(String),
    Context(Vec<Segment>),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    // placeholder names in order of first appearance
    names: IndexSet<String>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut stack: Vec<(usize, Vec<Segment>)> = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        let mut text = String::new();
        let mut tokens = Scanner::new(source).peekable();

        while let Some((pos, token)) = tokens.next() {
            match token {
                Token::Open => {
                    flush_text(&mut text, &mut current);
                    stack.push((pos, std::mem::take(&mut current)));
                }
                Token::Close => {
                    flush_text(&mut text, &mut current);
                    let (_, mut parent) = stack.pop().ok_or(TemplateError::MismatchedDelimiters { position: pos })?;
                    parent.push(Segment::Context(std::mem::take(&mut current)));
                    current = parent;
                }
                Token::Char('{') => match placeholder(&mut tokens) {
                    Ok(name) => {
                        flush_text(&mut text, &mut current);
                        current.push(Segment::Placeholder(name));
                    }
                    Err(consumed) => {
                        text.push('{');
                        text.push_str(&consumed);
                    }
                },
                Token::Char(c) => text.push(c),
            }
        }
        if let Some((position, _)) = stack.first() {
            return Err(TemplateError::MismatchedDelimiters { position: *position });
        }
        flush_text(&mut text, &mut current);
        let names = PLACEHOLDER.captures_iter(source).map(|c| c[1].to_string()).collect();
        Ok(Self { source: source.to_string(), segments: current, names })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names anywhere in the template, in order of first appearance.
    pub fn variable_names(&self) -> &IndexSet<String> {
        &self.names
    }

    pub fn is_constant(&self) -> bool {
        self.names.is_empty()
    }

    /// Render for every locale any referenced variable has a value in, in order of
    /// first appearance (placeholders in template order, then each variable's locales).
    /// Locales where a required placeholder is unresolved are left out.
    /// A template without placeholders renders once, for the root locale.
    pub fn render(&self, variables: &IndexMap<String, ResolvedVariable>) -> IndexMap<Locale, String> {
        let root = Locale::ROOT;
        let locales: IndexSet<&Locale> = if self.is_constant() {
            IndexSet::from([&root])
        } else {
            self.names.iter().filter_map(|n| variables.get(n)).flat_map(IndexMap::keys).collect()
        };
        let mut out = IndexMap::new();
        for locale in locales {
            match self.render_locale(locale, variables) {
                Some(text) => {
                    out.insert(locale.clone(), text);
                }
                None => trace!(template = self.source.as_str(), %locale, "template unresolved for locale"),
            }
        }
        out
    }

    /// Render for one locale, falling back to a variable's first available locale.
    pub fn render_locale(&self, locale: &Locale, variables: &IndexMap<String, ResolvedVariable>) -> Option<String> {
        let find = |name: &str| lookup(variables, name, locale);
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Placeholder(name) => out.push_str(find(name)?),
                Segment::Context(children) => out.push_str(&render_context(children, &find)),
            }
        }
        Some(out)
    }
}

/// Parse the rest of a `{name}` placeholder after its opening brace. On failure the
/// characters consumed so far are handed back as literal text.
fn placeholder(tokens: &mut Peekable<Scanner<'_>>) -> Result<String, String> {
    let mut name = String::new();
    while let Some(&(_, Token::Char(c))) = tokens.peek() {
        if c == '}' && !name.is_empty() {
            tokens.next();
            return Ok(name);
        }
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            break;
        }
        name.push(c);
        tokens.next();
    }
    Err(name)
}

fn flush_text(text: &mut String, into: &mut Vec<Segment>) {
    if !text.is_empty() {
        into.push(Segment::Text(std::mem::take(text)));
    }
}

fn render_context<'v>(segments: &[Segment], find: &impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) => out.push_str(t),
            Segment::Placeholder(name) => match find(name) {
                Some(value) if !value.is_empty() => out.push_str(value),
                _ => return String::new(),
            },
            Segment::Context(children) => out.push_str(&render_context(children, find)),
        }
    }
    out
}

/// First value of `name` for `locale`, else the first value of its first locale that has one.
fn lookup<'v>(variables: &'v IndexMap<String, ResolvedVariable>, name: &str, locale: &Locale) -> Option<&'v str> {
    let variable = variables.get(name)?;
    variable
        .get(locale)
        .filter(|values| !values.is_empty())
        .or_else(|| variable.values().find(|values| !values.is_empty()))
        .and_then(|values| values.first())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::innermost("a<b<c>d>e", Some("c"), 3..6)]
    #[case::first_closed("<x>-<y>", Some("x"), 0..3)]
    #[case::escaped_brackets_ignored(r"a\<b<c>", Some("c"), 4..7)]
    #[case::escape_inside_context(r"<a\>b>", Some(r"a\>b"), 0..6)]
    fn extracts_innermost_context(#[case] input: &str, #[case] inner: Option<&str>, #[case] span: Range<usize>) {
        let ctx = extract_context(input).unwrap().unwrap();
        assert_eq!(Some(ctx.inner), inner);
        assert_eq!(ctx.span, span);
    }

    #[test]
    fn no_context_left() {
        assert_eq!(extract_context(r"plain \<text\>").unwrap(), None);
    }

    #[rstest]
    #[case("a<b", 1)]
    #[case("a>b", 1)]
    #[case("<<a>", 0)]
    #[case("<a>>", 3)]
    fn unbalanced_delimiters(#[case] input: &str, #[case] position: usize) {
        assert_eq!(extract_context(input), Err(TemplateError::MismatchedDelimiters { position }));
        assert_eq!(Template::parse(input), Err(TemplateError::MismatchedDelimiters { position }));
    }

    #[test]
    fn repeated_extraction_walks_innermost_first() {
        let mut remaining = "a<b<c>d>e<f>".to_string();
        let mut seen = Vec::new();
        while let Some(ctx) = extract_context(&remaining).unwrap() {
            seen.push(ctx.inner.to_string());
            let span = ctx.span.clone();
            remaining.replace_range(span, "#");
        }
        assert_eq!(seen, ["c", "b#d", "f"]);
        assert_eq!(remaining, "a#e#");
    }

    #[test]
    fn placeholder_grammar() {
        let names = variable_names("{a}{b-c}{d_1}{a}{not valid}{}{é}");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), ["a", "b-c", "d_1"]);
    }

    #[test]
    fn parse_builds_a_context_tree() {
        let t = Template::parse(r"{a}<: {b}< \<{c}\>>>").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Placeholder("a".into()),
                Segment::Context(vec![
                    Segment::Text(": ".into()),
                    Segment::Placeholder("b".into()),
                    Segment::Context(vec![
                        Segment::Text(" <".into()),
                        Segment::Placeholder("c".into()),
                        Segment::Text(">".into()),
                    ]),
                ]),
            ]
        );
    }

    #[test]
    fn broken_placeholders_stay_literal() {
        let t = Template::parse("{a b} {x").unwrap();
        assert_eq!(t.segments, vec![Segment::Text("{a b} {x".into())]);
        assert!(t.is_constant());
    }
}
