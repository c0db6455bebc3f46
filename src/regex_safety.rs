//! Regex Safety Validator (`spec.md` §4.2).
//!
//! A linear scan over a regex source string that rejects patterns likely to
//! cause catastrophic backtracking (ReDoS): nested unbounded quantifiers,
//! backreferences, and oversized sources. No teacher equivalent exists --
//! `router/core.rs::path_to_regex` builds every pattern as a literal
//! `[^/]+` segment and never compiles a user-supplied regex source at all.
//! This is new code, in the teacher's plain-function-over-`&str` idiom.

use tracing::warn;

/// What to do when the validator finds an unsafe pattern at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyMode {
    Error,
    Warn,
}

/// What to do when a pattern source is not anchored (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorPolicy {
    Warn,
    Error,
    Silent,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        AnchorPolicy::Silent
    }
}

#[derive(Debug, Clone)]
pub struct RegexSafetyConfig {
    pub max_length: usize,
    pub forbid_backtracking_tokens: bool,
    pub forbid_backreferences: bool,
    pub mode: SafetyMode,
    pub anchor_policy: AnchorPolicy,
    pub max_execution_ms: Option<u64>,
}

impl Default for RegexSafetyConfig {
    fn default() -> Self {
        Self {
            max_length: 256,
            forbid_backtracking_tokens: true,
            forbid_backreferences: true,
            mode: SafetyMode::Error,
            anchor_policy: AnchorPolicy::Silent,
            max_execution_ms: None,
        }
    }
}

/// Result of a safety scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyViolation {
    pub reason: String,
}

/// Runs the ReDoS/length scan. Does not evaluate the anchor policy --
/// callers check that separately with [`check_anchors`] since it is a
/// distinct, independently-configured warning axis (`spec.md` §4.2).
pub fn validate(source: &str, config: &RegexSafetyConfig) -> Result<(), SafetyViolation> {
    if source.len() > config.max_length {
        return Err(SafetyViolation {
            reason: format!(
                "pattern length {} exceeds maximum {}",
                source.len(),
                config.max_length
            ),
        });
    }

    if config.forbid_backreferences && has_backreference(source) {
        return Err(SafetyViolation {
            reason: "pattern contains a backreference".to_string(),
        });
    }

    if config.forbid_backtracking_tokens {
        if let Some(reason) = find_nested_unbounded_quantifier(source) {
            return Err(SafetyViolation { reason });
        }
    }

    Ok(())
}

/// Detects `\1`..`\9` and `\k<name>` backreference syntax. Rust's `regex`
/// crate does not itself support backreferences (they would fail to
/// compile), but the validator runs before compilation so a clear
/// registration-time reason can be surfaced instead of an opaque compile
/// error, and so the same scan can be reused against engines that do
/// support them.
fn has_backreference(source: &str) -> bool {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if next.is_ascii_digit() && next != b'0' {
                return true;
            }
            if next == b'k' && source[i + 2..].starts_with('<') {
                return true;
            }
            i += 2;
            continue;
        }
        i += 1;
    }
    false
}

/// Scans for a group that both contains an unbounded quantifier (`*`, `+`,
/// `{n,}`) and is itself wrapped in another unbounded quantifier -- the
/// classic `(a+)+` / `(a*)*` shape that backtracks exponentially.
fn find_nested_unbounded_quantifier(source: &str) -> Option<String> {
    let chars: Vec<char> = source.chars().collect();
    // One flag per currently-open group: whether its content contains an
    // unbounded quantifier seen so far.
    let mut group_stack: Vec<bool> = Vec::new();
    let mut last_group_had_unbounded = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '(' => {
                group_stack.push(false);
                last_group_had_unbounded = false;
                i += 1;
            }
            ')' => {
                let flag = group_stack.pop().unwrap_or(false);
                last_group_had_unbounded = flag;
                if let Some(parent) = group_stack.last_mut() {
                    *parent = *parent || flag;
                }
                i += 1;
            }
            '*' | '+' => {
                if last_group_had_unbounded {
                    return Some(format!(
                        "unbounded quantifier '{}' applied to a group that already contains one",
                        chars[i]
                    ));
                }
                if let Some(top) = group_stack.last_mut() {
                    *top = true;
                }
                last_group_had_unbounded = false;
                i += 1;
            }
            '{' => {
                if let Some(end) = chars[i..].iter().position(|c| *c == '}') {
                    let body: String = chars[i + 1..i + end].iter().collect();
                    if is_unbounded_repetition(&body) {
                        if last_group_had_unbounded {
                            return Some(
                                "unbounded {n,} quantifier applied to a group that already contains one"
                                    .to_string(),
                            );
                        }
                        if let Some(top) = group_stack.last_mut() {
                            *top = true;
                        }
                    }
                    i += end + 1;
                } else {
                    i += 1;
                }
                last_group_had_unbounded = false;
            }
            _ => {
                last_group_had_unbounded = false;
                i += 1;
            }
        }
    }
    None
}

/// `{n,}` with no upper bound is unbounded; `{n,m}` and `{n}` are not.
fn is_unbounded_repetition(body: &str) -> bool {
    body.ends_with(',') && body[..body.len() - 1].chars().all(|c| c.is_ascii_digit())
}

/// Checks whether `source` is anchored (starts with `^` and/or ends with
/// `$`), returning a human-readable warning if `policy` cares and it isn't.
#[must_use]
pub fn check_anchors(source: &str, policy: AnchorPolicy) -> Option<String> {
    if matches!(policy, AnchorPolicy::Silent) {
        return None;
    }
    let anchored_start = source.starts_with('^');
    let anchored_end = source.ends_with('$') && !source.ends_with("\\$");
    if anchored_start && anchored_end {
        return None;
    }
    let message = format!("pattern `{source}` is not fully anchored");
    if matches!(policy, AnchorPolicy::Warn) {
        warn!(pattern = source, "{}", message);
    }
    Some(message)
}
