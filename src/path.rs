//! Path Processor (`spec.md` §4.1).
//!
//! A configurable pipeline of pure segment transforms, run once per incoming
//! path: strip query, drop the leading slash, split on `/`, optionally
//! resolve `.`/`..`, collapse or trim trailing empty segments, optionally
//! fold case, then validate. No teacher equivalent exists (the teacher's
//! `Router::route` trims the path with two `str::trim_start_matches`/`split`
//! calls inline and does nothing else); this module generalizes that into
//! the full pipeline the spec requires.

use crate::error::MatchError;

/// Behavior for an encoded slash (`%2F`) found inside a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodedSlashBehavior {
    Decode,
    Preserve,
    Reject,
}

impl Default for EncodedSlashBehavior {
    fn default() -> Self {
        EncodedSlashBehavior::Decode
    }
}

/// Configuration for the path-processing pipeline. Field defaults match the
/// options table in `spec.md` §6.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub ignore_trailing_slash: bool,
    pub collapse_slashes: bool,
    pub case_sensitive: bool,
    pub block_traversal: bool,
    pub max_segment_length: usize,
    pub fail_fast_on_bad_encoding: bool,
    pub encoded_slash_behavior: EncodedSlashBehavior,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            ignore_trailing_slash: true,
            collapse_slashes: true,
            case_sensitive: true,
            block_traversal: true,
            max_segment_length: 256,
            fail_fast_on_bad_encoding: false,
            encoded_slash_behavior: EncodedSlashBehavior::Decode,
        }
    }
}

/// Output of [`process`]: the normalized path, its segments, and a
/// per-segment "might need percent-decoding" bitmap the matcher uses to
/// avoid decoding segments that plainly contain no `%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedPath {
    pub normalized: String,
    pub segments: Vec<String>,
    pub decode_hints: Vec<bool>,
}

/// Runs the full pipeline against a raw request path (which may still carry
/// a query string).
pub fn process(raw_path: &str, config: &PathConfig) -> Result<ProcessedPath, MatchError> {
    let stripped = strip_query(raw_path);
    let unleaded = remove_leading_slash(stripped);
    let mut segments = split_path(unleaded);

    if config.block_traversal {
        segments = resolve_dot_segments(segments);
    }

    if config.collapse_slashes {
        segments.retain(|s| !s.is_empty());
    } else if config.ignore_trailing_slash {
        handle_trailing_slash(&mut segments);
    }

    if !config.case_sensitive {
        for segment in &mut segments {
            *segment = segment.to_lowercase();
        }
    }

    let decode_hints = validate_segments(&segments, config)?;
    let normalized = format!("/{}", segments.join("/"));

    Ok(ProcessedPath {
        normalized,
        segments,
        decode_hints,
    })
}

fn strip_query(path: &str) -> &str {
    match path.split_once('?') {
        Some((before, _)) => before,
        None => path,
    }
}

fn remove_leading_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/').map(str::to_string).collect()
}

/// Case-insensitive `.`/`..` detection, treating `%2e`/`%2E` the same as a
/// literal dot (`spec.md` §4.1). Only used to classify the segment; the
/// segment's own text is otherwise untouched.
fn dot_kind(segment: &str) -> DotKind {
    let decoded = lossy_decode_dots(segment);
    match decoded.as_str() {
        "." => DotKind::Current,
        ".." => DotKind::Parent,
        _ => DotKind::Other,
    }
}

enum DotKind {
    Current,
    Parent,
    Other,
}

/// Decodes only `%2e`/`%2E` sequences (case-insensitively) to `.`, leaving
/// everything else alone -- enough to recognize disguised dot-segments
/// without fully percent-decoding (which happens later, per-segment, only
/// when a param/wildcard actually captures the segment).
fn lossy_decode_dots(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = String::with_capacity(segment.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = &segment[i + 1..i + 3];
            if hex.eq_ignore_ascii_case("2e") {
                out.push('.');
                i += 3;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn resolve_dot_segments(segments: Vec<String>) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        match dot_kind(&segment) {
            DotKind::Current => {}
            DotKind::Parent => {
                resolved.pop();
            }
            DotKind::Other => resolved.push(segment),
        }
    }
    resolved
}

fn handle_trailing_slash(segments: &mut Vec<String>) {
    if segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }
}

fn validate_segments(segments: &[String], config: &PathConfig) -> Result<Vec<bool>, MatchError> {
    let mut hints = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.len() > config.max_segment_length {
            return Err(MatchError::SegmentTooLong);
        }
        let has_percent = segment.contains('%');
        if has_percent {
            if matches!(config.encoded_slash_behavior, EncodedSlashBehavior::Reject)
                && contains_encoded_slash(segment)
            {
                return Err(MatchError::EncodedSlashRejected);
            }
            if config.fail_fast_on_bad_encoding && !has_well_formed_percent_encoding(segment) {
                return Err(MatchError::BadEncoding);
            }
        }
        hints.push(has_percent);
    }
    Ok(hints)
}

fn contains_encoded_slash(segment: &str) -> bool {
    segment
        .as_bytes()
        .windows(3)
        .any(|w| w[0] == b'%' && w[1..].eq_ignore_ascii_case(b"2f"))
}

fn has_well_formed_percent_encoding(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Percent-decodes a single segment, honoring [`EncodedSlashBehavior`] and
/// `fail_fast_on_bad_encoding`. Used by the matcher when a param/wildcard
/// child actually captures it.
///
/// Malformed `%xx` encoding is only an error when `fail_fast` is set; per
/// `spec.md` §7's failure-semantics table, with `fail_fast` off the raw
/// segment text is used as-is instead (`spec.md` §8's matched-route
/// properties still hold -- the caller gets a match, not an error).
pub fn decode_segment(
    segment: &str,
    behavior: EncodedSlashBehavior,
    fail_fast: bool,
) -> Result<String, MatchError> {
    if matches!(behavior, EncodedSlashBehavior::Preserve) {
        return Ok(segment.to_string());
    }
    if matches!(behavior, EncodedSlashBehavior::Reject) && contains_encoded_slash(segment) {
        return Err(MatchError::EncodedSlashRejected);
    }
    if !has_well_formed_percent_encoding(segment) {
        return if fail_fast {
            Err(MatchError::BadEncoding)
        } else {
            Ok(segment.to_string())
        };
    }
    match percent_encoding::percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => Ok(decoded.into_owned()),
        Err(_) if fail_fast => Err(MatchError::BadEncoding),
        Err(_) => Ok(segment.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PathConfig {
        PathConfig::default()
    }

    #[test]
    fn strips_query_and_leading_slash() {
        let out = process("/health?verbose=1", &cfg()).unwrap();
        assert_eq!(out.normalized, "/health");
        assert_eq!(out.segments, vec!["health"]);
    }

    #[test]
    fn empty_path_yields_root() {
        let out = process("/", &cfg()).unwrap();
        assert!(out.segments.is_empty());
        assert_eq!(out.normalized, "/");
    }

    #[test]
    fn collapses_repeated_slashes() {
        let out = process("/a//b///c", &cfg()).unwrap();
        assert_eq!(out.segments, vec!["a", "b", "c"]);
    }

    #[test]
    fn trims_single_trailing_slash_when_not_collapsing() {
        let mut config = cfg();
        config.collapse_slashes = false;
        let out = process("/a/b/", &config).unwrap();
        assert_eq!(out.segments, vec!["a", "b"]);
    }

    #[test]
    fn resolves_dot_segments_with_underflow_ignored() {
        let out = process("/../a/./b/../../c", &cfg()).unwrap();
        assert_eq!(out.segments, vec!["c"]);
    }

    #[test]
    fn resolves_percent_encoded_dot_segments() {
        let out = process("/a/%2e%2e/b", &cfg()).unwrap();
        assert_eq!(out.segments, vec!["b"]);
    }

    #[test]
    fn case_folds_when_insensitive() {
        let mut config = cfg();
        config.case_sensitive = false;
        let out = process("/Users/ABC", &config).unwrap();
        assert_eq!(out.segments, vec!["users", "abc"]);
    }

    #[test]
    fn rejects_oversized_segment() {
        let mut config = cfg();
        config.max_segment_length = 4;
        let err = process("/toolong", &config).unwrap_err();
        assert_eq!(err, MatchError::SegmentTooLong);
    }

    #[test]
    fn flags_segments_with_percent() {
        let out = process("/hello%20world/plain", &cfg()).unwrap();
        assert_eq!(out.decode_hints, vec![true, false]);
    }

    #[test]
    fn fail_fast_rejects_malformed_percent_sequence() {
        let mut config = cfg();
        config.fail_fast_on_bad_encoding = true;
        let err = process("/a%2", &config).unwrap_err();
        assert_eq!(err, MatchError::BadEncoding);
    }

    #[test]
    fn decode_segment_respects_reject_policy() {
        let err = decode_segment("a%2Fb", EncodedSlashBehavior::Reject, false).unwrap_err();
        assert_eq!(err, MatchError::EncodedSlashRejected);
    }

    #[test]
    fn decode_segment_decodes_spaces() {
        let out = decode_segment("hello%20world", EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn decode_segment_falls_back_to_raw_text_on_malformed_encoding_by_default() {
        let out = decode_segment("a%2zb", EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(out, "a%2zb");
    }

    #[test]
    fn decode_segment_errors_on_malformed_encoding_when_fail_fast() {
        let err = decode_segment("a%2zb", EncodedSlashBehavior::Decode, true).unwrap_err();
        assert_eq!(err, MatchError::BadEncoding);
    }
}
