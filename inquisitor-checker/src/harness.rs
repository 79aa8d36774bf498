use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::diagnostics::{DiagnosticLevel, Diagnostics};
use crate::inquisitor::{CheckOptions, Inquisitor};
use crate::source::{SourceFile, SourceId};

fn marker_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"##ERROR\s+(.*)$").ok())
        .as_ref()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessEntry {
    pub line: usize,
    pub message: String,
}

/// Reported violations diffed against the `##ERROR` markers of a sample.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HarnessOutcome {
    pub caught: Vec<HarnessEntry>,
    pub false_alarms: Vec<HarnessEntry>,
    pub missed: Vec<HarnessEntry>,
}

impl HarnessOutcome {
    pub fn passed(&self) -> bool {
        self.false_alarms.is_empty() && self.missed.is_empty()
    }

    /// Human-readable report lines; caught errors are listed only when `verbose`.
    pub fn report_lines(&self, verbose: bool) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.false_alarms {
            lines.push(format!(
                "False alarm on line {}: {}",
                entry.line, entry.message
            ));
        }
        if verbose {
            for entry in &self.caught {
                lines.push(format!(
                    "Caught error on line {}: {}",
                    entry.line, entry.message
                ));
            }
        }
        for entry in &self.missed {
            lines.push(format!("Didn't catch line {}: {}", entry.line, entry.message));
        }
        lines
    }
}

/// Expected violations from `##ERROR <text>` markers, keyed by 1-based line.
pub fn expected_errors(source: &str) -> BTreeMap<usize, String> {
    let Some(pattern) = marker_pattern() else {
        return BTreeMap::new();
    };

    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let captures = pattern.captures(line)?;
            let text = captures.get(1)?.as_str().trim_end();
            Some((index + 1, text.to_string()))
        })
        .collect()
}

pub fn compare(expected: &BTreeMap<usize, String>, diagnostics: &Diagnostics) -> HarnessOutcome {
    let mut outcome = HarnessOutcome::default();
    let mut reported_lines = Vec::new();

    for diagnostic in diagnostics {
        let message = match diagnostic.level {
            DiagnosticLevel::Heresy => diagnostic.message.clone(),
            DiagnosticLevel::Suspicion => format!("suspicious: {}", diagnostic.message),
        };
        let entry = HarnessEntry {
            line: diagnostic.line(),
            message,
        };
        reported_lines.push(diagnostic.line());
        if expected.contains_key(&diagnostic.line()) {
            outcome.caught.push(entry);
        } else {
            outcome.false_alarms.push(entry);
        }
    }

    for (line, message) in expected {
        if !reported_lines.contains(line) {
            outcome.missed.push(HarnessEntry {
                line: *line,
                message: message.clone(),
            });
        }
    }

    outcome
}

/// Checks one sample file and diffs the result against its markers.
pub fn run_sample(path: &Path, options: &CheckOptions) -> Result<HarnessOutcome> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let source = SourceFile::new(SourceId(0), path.to_path_buf(), contents);
    let report = Inquisitor::new(options.clone()).check(&source)?;
    Ok(compare(&expected_errors(&source.contents), &report.diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceSpan;

    #[test]
    fn markers_are_keyed_by_one_based_line() {
        let source = "x = 1\ny = z  ##ERROR z is undefined\n\nreturn 1 ##ERROR   return outside\n";
        let expected = expected_errors(source);
        assert_eq!(expected.len(), 2);
        assert_eq!(expected.get(&2).map(String::as_str), Some("z is undefined"));
        assert_eq!(expected.get(&4).map(String::as_str), Some("return outside"));
    }

    #[test]
    fn compare_splits_caught_false_alarms_and_misses() {
        let expected = BTreeMap::from([(2, "expected".to_string()), (5, "missed".to_string())]);
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_heresy("real", SourceSpan::single_point(2, 1));
        diagnostics.push_suspicion("noise", SourceSpan::single_point(3, 1));

        let outcome = compare(&expected, &diagnostics);
        assert!(!outcome.passed());
        assert_eq!(outcome.caught.len(), 1);
        assert_eq!(outcome.false_alarms[0].message, "suspicious: noise");
        assert_eq!(outcome.missed[0].line, 5);

        let lines = outcome.report_lines(true);
        assert_eq!(
            lines,
            vec![
                "False alarm on line 3: suspicious: noise".to_string(),
                "Caught error on line 2: real".to_string(),
                "Didn't catch line 5: missed".to_string(),
            ]
        );
    }
}
