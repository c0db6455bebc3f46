//! Trie Builder (`spec.md` §4.4).
//!
//! Parses path patterns into segments, walks/grows the arena from the root,
//! validates regex safety and reserved parameter names, materializes
//! optional-parameter path variants, and sorts parameter children by
//! specificity. Grounded on `RadixNode::insert` in the teacher's
//! `router/radix.rs` (find-or-create static/param child, recurse on the
//! remaining segments) generalized to wildcards, regex constraints, and
//! index-based children.
//!
//! **Scope note** (recorded in `DESIGN.md`): `spec.md` §3/§4.4 describe an
//! optional static-chain compression ("a chain of single-Static children...
//! *may* be collapsed") with a conflict-driven `splitStaticChain`. Because
//! the spec itself frames this as discretionary ("may"), and no testable
//! property in §8 depends on the physical node shape, this builder keeps one
//! segment per Static node. Chain compression is a memory optimization over
//! an already-correct tree, not a correctness requirement, and is left
//! unimplemented here the same way `spec.md` §9 leaves `suffixPlan` et al.
//! unimplemented: named, understood, deliberately not wired up.

use crate::error::RegistrationError;
use crate::method::{method_code, MethodSpec};
use crate::regex_safety::{self, AnchorPolicy, RegexSafetyConfig, SafetyMode};
use crate::trie::node::{Node, NodeKind, WildcardOrigin};

use tracing::warn;

pub const MAX_PARAMS: usize = 32;

const RESERVED_PARAM_NAMES: [&str; 5] = [
    "__proto__",
    "constructor",
    "prototype",
    "__defineGetter__",
    "__defineSetter__",
];

#[must_use]
pub fn is_reserved_param_name(name: &str) -> bool {
    RESERVED_PARAM_NAMES.contains(&name)
}

#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub strict_param_names: bool,
    pub regex_safety: RegexSafetyConfig,
    pub anchor_policy: AnchorPolicy,
    pub max_params: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            strict_param_names: false,
            regex_safety: RegexSafetyConfig::default(),
            anchor_policy: AnchorPolicy::default(),
            max_params: MAX_PARAMS,
        }
    }
}

/// One segment of a parsed path pattern, before insertion into the trie.
#[derive(Debug, Clone)]
pub(crate) enum ParsedSegment {
    Static(String),
    Param {
        name: String,
        pattern_source: Option<String>,
        optional: bool,
    },
    Wildcard {
        name: Option<String>,
        origin: WildcardOrigin,
    },
}

/// A route as registered: which optional param names it declares (for
/// post-match default-fill) and the handler it resolves to.
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    pub handler_index: u32,
    pub pattern: String,
    pub optional_param_names: Vec<String>,
}

pub struct TrieBuilder {
    pub(crate) nodes: Vec<Node>,
    registered: Vec<RegisteredRoute>,
}

impl TrieBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::root()],
            registered: Vec::new(),
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn registered_routes(&self) -> &[RegisteredRoute] {
        &self.registered
    }

    /// Registers `pattern` for every method in `method_spec`, pointing at
    /// `handler_index`.
    pub fn add(
        &mut self,
        method_spec: &MethodSpec,
        pattern: &str,
        handler_index: u32,
        config: &BuilderConfig,
    ) -> Result<(), RegistrationError> {
        let segments = parse_pattern(pattern)?;
        validate_wildcard_position(&segments, pattern)?;

        let param_count = segments
            .iter()
            .filter(|s| !matches!(s, ParsedSegment::Static(_)))
            .count();
        if param_count > config.max_params {
            return Err(RegistrationError::TooManyParams {
                pattern: pattern.to_string(),
                max: config.max_params,
            });
        }

        for segment in &segments {
            if let ParsedSegment::Param {
                pattern_source: Some(source),
                ..
            } = segment
            {
                validate_regex(source, pattern, config)?;
            }
        }

        let optional_names: Vec<String> = segments
            .iter()
            .filter_map(|s| match s {
                ParsedSegment::Param {
                    name, optional: true, ..
                } => Some(name.clone()),
                _ => None,
            })
            .collect();

        let methods = method_spec.expand();
        let mut codes = Vec::with_capacity(methods.len());
        for method in &methods {
            let code = method_code(method).ok_or_else(|| RegistrationError::InvalidOption {
                option: "method".to_string(),
                reason: format!("{method} is not a supported routing method"),
            })?;
            codes.push(code);
        }

        for variant in expand_optional_variants(&segments) {
            let mut node_idx = 0u32;
            for segment in &variant {
                node_idx = self.descend(node_idx, segment, pattern, config)?;
            }
            for &code in &codes {
                if self.nodes[node_idx as usize].has_method(code) {
                    return Err(RegistrationError::DuplicateRoute {
                        method: methods_display(&methods, code),
                        pattern: pattern.to_string(),
                    });
                }
                self.nodes[node_idx as usize].methods.push((code, handler_index));
            }
        }

        self.registered.push(RegisteredRoute {
            handler_index,
            pattern: pattern.to_string(),
            optional_param_names: optional_names,
        });

        Ok(())
    }

    fn descend(
        &mut self,
        from: u32,
        segment: &ParsedSegment,
        pattern: &str,
        config: &BuilderConfig,
    ) -> Result<u32, RegistrationError> {
        match segment {
            ParsedSegment::Static(literal) => {
                if let Some(idx) = self.nodes[from as usize].find_static_child(literal) {
                    return Ok(idx);
                }
                let idx = self.push_node(Node::new(NodeKind::Static {
                    segment: literal.clone(),
                }));
                self.nodes[from as usize]
                    .static_children
                    .push((literal.clone(), idx));
                self.nodes[from as usize].static_children.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(idx)
            }
            ParsedSegment::Param {
                name,
                pattern_source,
                ..
            } => {
                let suppressed = is_reserved_param_name(name);
                if suppressed && config.strict_param_names {
                    return Err(RegistrationError::ReservedParamName {
                        name: name.clone(),
                        pattern: pattern.to_string(),
                    });
                }
                if let Some(idx) =
                    self.nodes[from as usize].find_param_child(&self.nodes, name, pattern_source.as_deref())
                {
                    return Ok(idx);
                }
                let idx = self.push_node(Node::new(NodeKind::Param {
                    name: name.clone(),
                    pattern_source: pattern_source.clone(),
                    name_suppressed: suppressed,
                }));
                self.nodes[from as usize].param_children.push(idx);
                sort_param_children(&mut self.nodes, from);
                Ok(idx)
            }
            ParsedSegment::Wildcard { name, origin } => {
                if let Some(idx) = self.nodes[from as usize].wildcard_child {
                    return Ok(idx);
                }
                let idx = self.push_node(Node::new(NodeKind::Wildcard {
                    name: name.clone(),
                    origin: *origin,
                }));
                self.nodes[from as usize].wildcard_child = Some(idx);
                Ok(idx)
            }
        }
    }

    fn push_node(&mut self, node: Node) -> u32 {
        self.nodes.push(node);
        (self.nodes.len() - 1) as u32
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn methods_display(methods: &[http::Method], code: u8) -> String {
    methods
        .iter()
        .find(|m| method_code(m) == Some(code))
        .map(|m| m.to_string())
        .unwrap_or_default()
}

fn validate_regex(
    source: &str,
    pattern: &str,
    config: &BuilderConfig,
) -> Result<(), RegistrationError> {
    if let Err(violation) = regex_safety::validate(source, &config.regex_safety) {
        match config.regex_safety.mode {
            SafetyMode::Error => {
                return Err(RegistrationError::UnsafeRegex {
                    pattern: pattern.to_string(),
                    reason: violation.reason,
                })
            }
            SafetyMode::Warn => {
                warn!(pattern, reason = %violation.reason, "unsafe regex accepted under warn mode");
            }
        }
    }
    if let Some(warning) = regex_safety::check_anchors(source, config.anchor_policy) {
        if matches!(config.anchor_policy, AnchorPolicy::Error) {
            return Err(RegistrationError::UnsafeRegex {
                pattern: pattern.to_string(),
                reason: warning,
            });
        }
    }
    Ok(())
}

fn validate_wildcard_position(
    segments: &[ParsedSegment],
    pattern: &str,
) -> Result<(), RegistrationError> {
    if let Some(pos) = segments
        .iter()
        .position(|s| matches!(s, ParsedSegment::Wildcard { .. }))
    {
        if pos != segments.len() - 1 {
            return Err(RegistrationError::MalformedPattern {
                pattern: pattern.to_string(),
                reason: "a wildcard segment must be the last segment in a pattern".to_string(),
            });
        }
    }
    Ok(())
}

/// Sorts `node.param_children` by specificity (`spec.md` §4.4): regex-
/// constrained before unconstrained, longer regex source before shorter,
/// ascending segment name as the final tiebreak.
pub(crate) fn sort_param_children(nodes: &mut [Node], node_idx: u32) {
    let mut children = std::mem::take(&mut nodes[node_idx as usize].param_children);
    children.sort_by(|&a, &b| {
        let (name_a, pattern_a) = param_identity(nodes, a);
        let (name_b, pattern_b) = param_identity(nodes, b);
        let constrained_a = pattern_a.is_some();
        let constrained_b = pattern_b.is_some();
        constrained_b
            .cmp(&constrained_a)
            .then_with(|| {
                let len_a = pattern_a.map_or(0, str::len);
                let len_b = pattern_b.map_or(0, str::len);
                len_b.cmp(&len_a)
            })
            .then_with(|| name_a.cmp(name_b))
    });
    nodes[node_idx as usize].param_children = children;
}

fn param_identity(nodes: &[Node], idx: u32) -> (&str, Option<&str>) {
    match &nodes[idx as usize].kind {
        NodeKind::Param {
            name,
            pattern_source,
            ..
        } => (name.as_str(), pattern_source.as_deref()),
        _ => ("", None),
    }
}

/// Produces the powerset of "optional param included / entirely omitted"
/// variants for a pattern (`spec.md` §4.4: "Optional params register both
/// the with and without path variants"). Most patterns have zero or one
/// optional param, so this is never more than a couple of variants in
/// practice.
fn expand_optional_variants(segments: &[ParsedSegment]) -> Vec<Vec<ParsedSegment>> {
    let optional_positions: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter_map(|(i, s)| match s {
            ParsedSegment::Param { optional: true, .. } => Some(i),
            _ => None,
        })
        .collect();

    if optional_positions.is_empty() {
        return vec![segments.to_vec()];
    }

    let mut variants = Vec::with_capacity(1 << optional_positions.len());
    for mask in 0..(1u32 << optional_positions.len()) {
        let mut variant = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            if let Some(bit) = optional_positions.iter().position(|&p| p == i) {
                if mask & (1 << bit) == 0 {
                    continue; // omit this optional segment in this variant
                }
            }
            variant.push(segment.clone());
        }
        variants.push(variant);
    }
    variants
}

/// Splits a pattern (without base path) on `/` into [`ParsedSegment`]s.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<ParsedSegment>, RegistrationError> {
    let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed.split('/').map(parse_segment).collect()
}

fn parse_segment(raw: &str) -> Result<ParsedSegment, RegistrationError> {
    if let Some(rest) = raw.strip_prefix("**") {
        let name = if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        };
        return Ok(ParsedSegment::Wildcard {
            name,
            origin: WildcardOrigin::Zero,
        });
    }
    if raw == "*" {
        return Ok(ParsedSegment::Wildcard {
            name: None,
            origin: WildcardOrigin::Star,
        });
    }
    if let Some(rest) = raw.strip_prefix('*') {
        return Ok(ParsedSegment::Wildcard {
            name: Some(rest.to_string()),
            origin: WildcardOrigin::Multi,
        });
    }
    if let Some(rest) = raw.strip_prefix(':') {
        let optional = rest.ends_with('?');
        let body = if optional { &rest[..rest.len() - 1] } else { rest };
        if let Some(open) = body.find('(') {
            if !body.ends_with(')') {
                return Err(RegistrationError::MalformedPattern {
                    pattern: raw.to_string(),
                    reason: "unterminated regex constraint".to_string(),
                });
            }
            let name = body[..open].to_string();
            let pattern_source = body[open + 1..body.len() - 1].to_string();
            if name.is_empty() {
                return Err(RegistrationError::MalformedPattern {
                    pattern: raw.to_string(),
                    reason: "parameter name must not be empty".to_string(),
                });
            }
            return Ok(ParsedSegment::Param {
                name,
                pattern_source: Some(pattern_source),
                optional,
            });
        }
        if body.is_empty() {
            return Err(RegistrationError::MalformedPattern {
                pattern: raw.to_string(),
                reason: "parameter name must not be empty".to_string(),
            });
        }
        return Ok(ParsedSegment::Param {
            name: body.to_string(),
            pattern_source: None,
            optional,
        });
    }
    Ok(ParsedSegment::Static(raw.to_string()))
}
