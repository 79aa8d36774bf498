use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::ast::Expression;
use crate::lexer::Lexer;
use crate::parser::Parser;

fn annotation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"#::\s*(.*?)\s*$").ok())
        .as_ref()
}

/// Collects `#:: <type>` comment annotations keyed by 1-based line number.
pub fn scan_comment_annotations(source: &str) -> BTreeMap<usize, String> {
    let Some(pattern) = annotation_pattern() else {
        return BTreeMap::new();
    };

    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let captures = pattern.captures(line)?;
            let text = captures.get(1)?.as_str();
            (!text.is_empty()).then(|| (index + 1, text.to_string()))
        })
        .collect()
}

/// Comment annotations parsed into annotation expressions.
#[derive(Debug, Default, Clone)]
pub struct AnnotationMap {
    entries: BTreeMap<usize, Expression>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_source(source: &str) -> Self {
        Self::parse(&scan_comment_annotations(source))
    }

    /// Parses each annotation text. Text that is not a valid expression is
    /// logged and skipped.
    pub fn parse(annotations: &BTreeMap<usize, String>) -> Self {
        let mut entries = BTreeMap::new();
        for (line, text) in annotations {
            match parse_annotation_text(text, *line) {
                Ok(expression) => {
                    entries.insert(*line, expression);
                }
                Err(error) => {
                    debug!(line, annotation = %text, %error, "ignoring comment annotation");
                }
            }
        }
        Self { entries }
    }

    pub fn get(&self, line: usize) -> Option<&Expression> {
        self.entries.get(&line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses annotation text as if it appeared on `line`.
fn parse_annotation_text(text: &str, line: usize) -> anyhow::Result<Expression> {
    let mut tokens = Lexer::from_str(text).tokenize()?;
    for token in &mut tokens {
        token.line = line;
    }
    Parser::new(tokens).parse_annotation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExpressionKind;

    #[test]
    fn scans_annotations_with_one_based_lines() {
        let source = "x = []  #:: [int]\ny = 1\nz = {}    #::   {str: int}   \n";
        let annotations = scan_comment_annotations(source);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations.get(&1).map(String::as_str), Some("[int]"));
        assert_eq!(annotations.get(&3).map(String::as_str), Some("{str: int}"));
    }

    #[test]
    fn parses_annotation_text_and_skips_garbage() {
        let source = "a = 1 #:: int\nb = 2 #:: )(\n";
        let map = AnnotationMap::from_source(source);
        assert_eq!(map.len(), 1);
        let expression = map.get(1).expect("annotation on line 1");
        assert!(matches!(expression.kind, ExpressionKind::Identifier(_)));
        assert_eq!(expression.span.line, 1);
        assert!(map.get(2).is_none());
    }
}
