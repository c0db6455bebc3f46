//! Matcher (`spec.md` §4.6).
//!
//! Walks the flattened [`crate::layout::Layout`] against a processed path's
//! segments using an explicit frame stack instead of recursion, so matching
//! a path never grows the call stack and is bounded by [`MAX_STACK_DEPTH`].
//! Static children are preferred over parameter children over the wildcard
//! child at every node, matching the teacher's own `RadixNode::find` priority
//! (`router/radix.rs`); parameter children are tried in the builder's
//! specificity order, so the first full match the walk finds is also the
//! most specific one -- no separate ranking pass is needed.

use smallvec::SmallVec;

use crate::error::MatchError;
use crate::layout::{Layout, MAX_EDGE_LINEAR_SCAN};
use crate::method::MethodMask;
use crate::path::{decode_segment, EncodedSlashBehavior};

pub const MAX_STACK_DEPTH: usize = 64;
pub const MAX_PARAMS: usize = 32;

pub type ParamVec = SmallVec<[(String, String); MAX_PARAMS]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { handler_index: u32, params: ParamVec },
    MethodNotAllowed { allowed: MethodMask },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Static,
    Param(u32),
    Wildcard,
    Exhausted,
}

struct Frame {
    node: u32,
    segment_index: usize,
    stage: Stage,
    params_mark: usize,
}

/// Matches `segments` against `layout` for `method_code`, percent-decoding
/// captured segments lazily via `decode_hints`/`encoded_slash_behavior`.
/// `fail_fast_on_bad_encoding` governs what a malformed `%xx` sequence in a
/// captured segment does: error out, or fall back to the raw segment text.
pub fn match_path(
    layout: &Layout,
    segments: &[String],
    decode_hints: &[bool],
    method_code: u8,
    encoded_slash_behavior: EncodedSlashBehavior,
    fail_fast_on_bad_encoding: bool,
) -> Result<MatchOutcome, MatchError> {
    let mut stack: Vec<Frame> = Vec::with_capacity(segments.len() + 1);
    let mut params: ParamVec = ParamVec::new();
    let mut best_mismatch: Option<MethodMask> = None;

    stack.push(Frame {
        node: layout.root_index,
        segment_index: 0,
        stage: Stage::Static,
        params_mark: 0,
    });

    while let Some(frame_top) = stack.last().map(|f| (f.node, f.segment_index, f.stage)) {
        if stack.len() > MAX_STACK_DEPTH {
            return Err(MatchError::InternalFault(
                "matcher exceeded maximum stack depth".to_string(),
            ));
        }
        let (node_idx, segment_index, stage) = frame_top;
        let node = &layout.nodes[node_idx as usize];

        match stage {
            Stage::Static => {
                stack.last_mut().unwrap().stage = Stage::Param(0);
                if segment_index < segments.len() {
                    if let Some(child) = find_static_child(layout, node, &segments[segment_index]) {
                        stack.push(Frame {
                            node: child,
                            segment_index: segment_index + 1,
                            stage: Stage::Static,
                            params_mark: params.len(),
                        });
                    }
                }
            }
            Stage::Param(i) => {
                let i = i as usize;
                if segment_index < segments.len() && i < node.param_count as usize {
                    stack.last_mut().unwrap().stage = Stage::Param((i + 1) as u32);
                    let child_idx = layout.param_children[node.param_start as usize + i];
                    let child = &layout.nodes[child_idx as usize];
                    let raw = &segments[segment_index];
                    let matched = match child.pattern {
                        Some(pattern_idx) => layout.patterns[pattern_idx as usize].test(raw)?,
                        None => !raw.is_empty(),
                    };
                    if matched {
                        let decoded = if decode_hints.get(segment_index).copied().unwrap_or(false) {
                            decode_segment(raw, encoded_slash_behavior, fail_fast_on_bad_encoding)?
                        } else {
                            raw.clone()
                        };
                        let params_mark = params.len();
                        if !child.name_suppressed {
                            if let Some((offset, len)) = child.name {
                                params.push((layout.string_at(offset, len).to_string(), decoded));
                            }
                        }
                        stack.push(Frame {
                            node: child_idx,
                            segment_index: segment_index + 1,
                            stage: Stage::Static,
                            params_mark,
                        });
                    }
                } else {
                    stack.last_mut().unwrap().stage = Stage::Wildcard;
                }
            }
            Stage::Wildcard => {
                stack.last_mut().unwrap().stage = Stage::Exhausted;
                if let Some(child_idx) = node.wildcard_child {
                    let child = &layout.nodes[child_idx as usize];
                    let remaining = &segments[segment_index..];
                    let origin = child.wildcard_origin.expect("wildcard node carries its origin");
                    if !remaining.is_empty() || origin.allows_empty() {
                        let params_mark = params.len();
                        if let Some((offset, len)) = child.name {
                            let mut joined = String::new();
                            for (i, seg) in remaining.iter().enumerate() {
                                if i > 0 {
                                    joined.push('/');
                                }
                                let decoded = if decode_hints.get(segment_index + i).copied().unwrap_or(false)
                                {
                                    decode_segment(seg, encoded_slash_behavior, fail_fast_on_bad_encoding)?
                                } else {
                                    seg.clone()
                                };
                                joined.push_str(&decoded);
                            }
                            params.push((layout.string_at(offset, len).to_string(), joined));
                        }
                        stack.push(Frame {
                            node: child_idx,
                            segment_index: segments.len(),
                            stage: Stage::Exhausted,
                            params_mark,
                        });
                    }
                }
            }
            Stage::Exhausted => {
                if segment_index == segments.len() && node.methods_count > 0 {
                    if node.method_mask.contains(method_code) {
                        let handler = layout.methods
                            [node.methods_start as usize..(node.methods_start + node.methods_count) as usize]
                            .iter()
                            .find(|(code, _)| *code == method_code)
                            .map(|(_, handler)| *handler);
                        if let Some(handler_index) = handler {
                            return Ok(MatchOutcome::Matched {
                                handler_index,
                                params,
                            });
                        }
                    }
                    best_mismatch = Some(match best_mismatch {
                        Some(existing) => union_mask(existing, node.method_mask),
                        None => node.method_mask,
                    });
                }
                let popped = stack.pop().expect("frame present in Exhausted stage");
                params.truncate(popped.params_mark);
            }
        }
    }

    match best_mismatch {
        Some(allowed) => Ok(MatchOutcome::MethodNotAllowed { allowed }),
        None => Ok(MatchOutcome::NotFound),
    }
}

fn union_mask(a: MethodMask, b: MethodMask) -> MethodMask {
    MethodMask::from_u32(a.as_u32() | b.as_u32())
}

fn find_static_child(
    layout: &Layout,
    node: &crate::layout::FlatNode,
    segment: &str,
) -> Option<u32> {
    let start = node.static_start as usize;
    let count = node.static_count as usize;
    let edges = &layout.static_edges[start..start + count];
    if count >= MAX_EDGE_LINEAR_SCAN {
        edges
            .binary_search_by(|edge| layout.string_at(edge.segment.0, edge.segment.1).cmp(segment))
            .ok()
            .map(|i| edges[i].child)
    } else {
        edges
            .iter()
            .find(|edge| layout.string_at(edge.segment.0, edge.segment.1) == segment)
            .map(|edge| edge.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodSpec;
    use crate::trie::builder::{BuilderConfig, TrieBuilder};
    use crate::layout::flatten;

    fn build(routes: &[(&str, &str, u32)]) -> Layout {
        let mut builder = TrieBuilder::new();
        let config = BuilderConfig::default();
        for (method, pattern, handler) in routes {
            let method_spec = MethodSpec::One(method_from_str(method));
            builder.add(&method_spec, pattern, *handler, &config).unwrap();
        }
        flatten(&builder, None).unwrap()
    }

    fn method_from_str(m: &str) -> http::Method {
        match m {
            "GET" => http::Method::GET,
            "POST" => http::Method::POST,
            _ => panic!("unsupported method in test"),
        }
    }

    fn segments(path: &str) -> Vec<String> {
        path.trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn matches_static_route() {
        let layout = build(&[("GET", "/health", 1)]);
        let segs = segments("/health");
        let hints = vec![false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                handler_index: 1,
                params: ParamVec::new()
            }
        );
    }

    #[test]
    fn matches_param_route_and_extracts_value() {
        let layout = build(&[("GET", "/users/:id(\\d+)", 2)]);
        let segs = segments("/users/42");
        let hints = vec![false, false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::Matched { handler_index, params } => {
                assert_eq!(handler_index, 2);
                assert_eq!(params.as_slice(), &[("id".to_string(), "42".to_string())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn prefers_static_over_param_at_same_depth() {
        let layout = build(&[
            ("GET", "/users/me", 1),
            ("GET", "/users/:id", 2),
        ]);
        let segs = segments("/users/me");
        let hints = vec![false, false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                handler_index: 1,
                params: ParamVec::new()
            }
        );
    }

    #[test]
    fn falls_back_to_param_when_static_does_not_match() {
        let layout = build(&[
            ("GET", "/users/me", 1),
            ("GET", "/users/:id", 2),
        ]);
        let segs = segments("/users/99");
        let hints = vec![false, false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::Matched { handler_index, .. } => assert_eq!(handler_index, 2),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_captures_remaining_segments_joined() {
        let layout = build(&[("GET", "/files/*rest", 3)]);
        let segs = segments("/files/a/b/c");
        let hints = vec![false, false, false, false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::Matched { handler_index, params } => {
                assert_eq!(handler_index, 3);
                assert_eq!(params.as_slice(), &[("rest".to_string(), "a/b/c".to_string())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn zero_wildcard_matches_empty_remainder() {
        let layout = build(&[("GET", "/files/**rest", 4)]);
        let segs = segments("/files");
        let hints = vec![false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::Matched { handler_index, params } => {
                assert_eq!(handler_index, 4);
                assert_eq!(params.as_slice(), &[("rest".to_string(), String::new())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn star_wildcard_rejects_empty_remainder() {
        let layout = build(&[("GET", "/files/*", 5)]);
        let segs = segments("/files");
        let hints = vec![false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(outcome, MatchOutcome::NotFound);
    }

    #[test]
    fn reports_method_not_allowed_when_path_matches_other_method() {
        let layout = build(&[("POST", "/users", 1)]);
        let segs = segments("/users");
        let hints = vec![false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::MethodNotAllowed { allowed } => assert!(allowed.contains(1)),
            other => panic!("expected method-not-allowed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        let layout = build(&[("GET", "/health", 1)]);
        let segs = segments("/missing");
        let hints = vec![false];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        assert_eq!(outcome, MatchOutcome::NotFound);
    }

    #[test]
    fn malformed_encoding_falls_back_to_raw_segment_when_not_fail_fast() {
        let layout = build(&[("GET", "/files/:name", 1)]);
        let segs = segments("/files/a%2zb");
        let hints = vec![false, true];
        let outcome =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, false).unwrap();
        match outcome {
            MatchOutcome::Matched { params, .. } => {
                assert_eq!(params.as_slice(), &[("name".to_string(), "a%2zb".to_string())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn malformed_encoding_errors_when_fail_fast() {
        let layout = build(&[("GET", "/files/:name", 1)]);
        let segs = segments("/files/a%2zb");
        let hints = vec![false, true];
        let err =
            match_path(&layout, &segs, &hints, 0, EncodedSlashBehavior::Decode, true).unwrap_err();
        assert_eq!(err, MatchError::BadEncoding);
    }
}
