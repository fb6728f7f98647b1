//! Locale keys derived from `xml:lang` values.
//!
//! Only the language and script subtags take part in the key, so `de`, `de-DE` and
//! `de_AT` all land in the same bucket while `sr-Latn` and `sr-Cyrl` stay apart.
//! Anything that does not start with a plausible language subtag is the root locale.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
    language: Option<String>,
    script: Option<String>,
}

impl Locale {
    /// The unspecified locale used for nodes without a usable language tag.
    pub const ROOT: Locale = Locale { language: None, script: None };

    pub fn parse(tag: &str) -> Self {
        let mut subtags = tag.trim().split(['-', '_']);
        let Some(language) = subtags.next().filter(|l| is_language(l)) else {
            return Self::ROOT;
        };
        let language = language.to_ascii_lowercase();
        if language == "und" {
            return Self::ROOT;
        }
        let script = subtags.next().filter(|s| s.len() == 4 && s.chars().all(|c| c.is_ascii_alphabetic())).map(title_case);
        Locale { language: Some(language), script }
    }

    /// Locale for an optional tag; a missing tag is the root locale.
    pub fn from_tag(tag: Option<&str>) -> Self {
        tag.map_or(Self::ROOT, Self::parse)
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.language.is_none()
    }
}

fn is_language(subtag: &str) -> bool {
    (2..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphabetic())
}

fn title_case(subtag: &str) -> String {
    let mut out = String::with_capacity(subtag.len());
    for (i, c) in subtag.chars().enumerate() {
        out.push(if i == 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() });
    }
    out
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.language, &self.script) {
            (None, _) => f.write_str("und"),
            (Some(language), None) => f.write_str(language),
            (Some(language), Some(script)) => write!(f, "{language}-{script}"),
        }
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
