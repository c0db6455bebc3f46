//! Pattern Tester (`spec.md` §4.3).
//!
//! Turns a `(source, regex)` pair into an optimized predicate. A handful of
//! very common param-constraint sources are recognized and given hand-coded
//! character-class scans instead of going through the regex engine at all;
//! everything else falls back to the compiled regex, optionally wrapped with
//! a wall-clock execution guard. Grounded on the spec only -- the teacher
//! compiles every segment to `[^/]+` and has no constrained-param concept.

use std::time::Instant;

use regex::Regex;

use crate::error::MatchError;

#[derive(Clone)]
enum PatternKind {
    Digits,
    AsciiAlpha,
    AsciiAlphaNumericUnderscoreDash,
    NotSlash,
    Regex(Regex),
}

/// A compiled, optimized predicate for one `(source, flags)` pattern.
#[derive(Clone)]
pub struct PatternTester {
    kind: PatternKind,
    source: String,
    max_execution_ms: Option<u64>,
}

impl PatternTester {
    /// Compiles `source` into a tester. Recognized well-known sources bypass
    /// the regex engine entirely; anything else is compiled and anchored to
    /// match an entire segment.
    pub fn compile(source: &str, max_execution_ms: Option<u64>) -> Result<Self, regex::Error> {
        let kind = match source {
            r"\d+" => PatternKind::Digits,
            "[A-Za-z]+" => PatternKind::AsciiAlpha,
            r"[A-Za-z0-9_\-]+" => PatternKind::AsciiAlphaNumericUnderscoreDash,
            "[^/]+" => PatternKind::NotSlash,
            other => PatternKind::Regex(Regex::new(&anchor_full_match(other))?),
        };
        Ok(Self {
            kind,
            source: source.to_string(),
            max_execution_ms,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tests `input` (a single, already percent-decoded-as-needed path
    /// segment) against this pattern.
    pub fn test(&self, input: &str) -> Result<bool, MatchError> {
        match &self.kind {
            PatternKind::Digits => Ok(!input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())),
            PatternKind::AsciiAlpha => {
                Ok(!input.is_empty() && input.bytes().all(|b| b.is_ascii_alphabetic()))
            }
            PatternKind::AsciiAlphaNumericUnderscoreDash => Ok(!input.is_empty()
                && input
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')),
            PatternKind::NotSlash => Ok(!input.is_empty() && !input.contains('/')),
            PatternKind::Regex(re) => self.test_regex(re, input),
        }
    }

    fn test_regex(&self, re: &Regex, input: &str) -> Result<bool, MatchError> {
        match self.max_execution_ms {
            None => Ok(re.is_match(input)),
            Some(max_ms) => {
                let start = Instant::now();
                let matched = re.is_match(input);
                let elapsed_ms = start.elapsed().as_millis() as u64;
                if elapsed_ms > max_ms {
                    return Err(MatchError::RegexTimeout {
                        pattern: self.source.clone(),
                        duration_ms: elapsed_ms,
                    });
                }
                Ok(matched)
            }
        }
    }
}

/// Wraps `source` so it must match an entire segment, unless it already
/// declares its own anchors. The `(?:...)` grouping and the `^`/`$` anchors
/// are always added or omitted together, so a source anchored on only one
/// side (e.g. `^abc` or `abc$`) never ends up with an unbalanced group.
fn anchor_full_match(source: &str) -> String {
    let needs_start = !source.starts_with('^');
    let needs_end = !source.ends_with('$');
    let start = if needs_start { "^" } else { "" };
    let end = if needs_end { "$" } else { "" };
    format!("{start}(?:{source}){end}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_well_known_source_bypasses_regex() {
        let tester = PatternTester::compile(r"\d+", None).unwrap();
        assert!(tester.test("42").unwrap());
        assert!(!tester.test("4a").unwrap());
        assert!(!tester.test("").unwrap());
    }

    #[test]
    fn ascii_alpha_well_known_source() {
        let tester = PatternTester::compile("[A-Za-z]+", None).unwrap();
        assert!(tester.test("hello").unwrap());
        assert!(!tester.test("hello1").unwrap());
    }

    #[test]
    fn slug_well_known_source() {
        let tester = PatternTester::compile(r"[A-Za-z0-9_\-]+", None).unwrap();
        assert!(tester.test("hello-world_1").unwrap());
        assert!(!tester.test("hello/world").unwrap());
    }

    #[test]
    fn not_slash_well_known_source() {
        let tester = PatternTester::compile("[^/]+", None).unwrap();
        assert!(tester.test("anything").unwrap());
        assert!(!tester.test("a/b").unwrap());
    }

    #[test]
    fn general_regex_is_anchored_to_full_segment() {
        let tester = PatternTester::compile("ab|cd", None).unwrap();
        assert!(tester.test("ab").unwrap());
        assert!(!tester.test("xaby").unwrap());
    }

    #[test]
    fn already_anchored_source_is_left_alone() {
        let tester = PatternTester::compile("^[a-z]{3}$", None).unwrap();
        assert!(tester.test("abc").unwrap());
        assert!(!tester.test("abcd").unwrap());
    }
}
