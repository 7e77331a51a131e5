// src/template/syntax.rs

//! `${name}` template syntax.
//!
//! - `${name}` is a reference, replaced by whatever the caller's lookup
//!   returns for `name`.
//! - `$$` is a literal `$`.
//! - Any other `$` is literal.
//!
//! The whole source is tokenized before the first lookup, so a syntax error
//! never leaves a half-expanded value behind.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{LauncherError, Result};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(?:\$|\{([^}]*)(\})?)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Reference(&'a str),
}

pub fn tokenize(source: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            segments.push(Segment::Literal(&source[last..whole.start()]));
        }
        last = whole.end();

        match (caps.get(1), caps.get(2)) {
            (None, _) => segments.push(Segment::Literal("$")),
            (Some(_), None) => return Err(syntax_error(source, "unterminated reference")),
            (Some(name), Some(_)) if name.as_str().is_empty() => {
                return Err(syntax_error(source, "empty reference"));
            }
            (Some(name), Some(_)) => segments.push(Segment::Reference(name.as_str())),
        }
    }

    if last < source.len() {
        segments.push(Segment::Literal(&source[last..]));
    }
    Ok(segments)
}

/// Expand every reference in `source` through `lookup`.
pub fn expand<F>(source: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(source.len());
    for segment in tokenize(source)? {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Reference(name) => out.push_str(&lookup(name)?),
        }
    }
    Ok(out)
}

fn syntax_error(source: &str, reason: &str) -> LauncherError {
    LauncherError::TemplateSyntax {
        source_text: source.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(name: &str) -> Result<String> {
        Ok(name.to_uppercase())
    }

    #[test]
    fn references_and_literals_interleave() {
        assert_eq!(
            tokenize("a${b}c${d}").unwrap(),
            vec![
                Segment::Literal("a"),
                Segment::Reference("b"),
                Segment::Literal("c"),
                Segment::Reference("d"),
            ]
        );
        assert_eq!(expand("-D${x}=${y.z}", upper).unwrap(), "-DX=Y.Z");
    }

    #[test]
    fn dollar_escapes() {
        assert_eq!(expand("cost: $$5", upper).unwrap(), "cost: $5");
        assert_eq!(expand("$$${a}", upper).unwrap(), "$A");
        assert_eq!(expand("$HOME and $", upper).unwrap(), "$HOME and $");
    }

    #[test]
    fn malformed_references_are_errors() {
        assert!(matches!(
            expand("${open", upper),
            Err(LauncherError::TemplateSyntax { reason, .. }) if reason.contains("unterminated")
        ));
        assert!(matches!(
            expand("x${}y", upper),
            Err(LauncherError::TemplateSyntax { reason, .. }) if reason.contains("empty")
        ));
    }

    #[test]
    fn no_lookup_happens_on_syntax_error() {
        let mut calls = 0;
        let result = expand("${a}${", |_| {
            calls += 1;
            Ok(String::new())
        });
        assert!(result.is_err());
        assert_eq!(calls, 0);
    }
}
