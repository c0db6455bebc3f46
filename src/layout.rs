//! Flattener / binary layout (`spec.md` §3/§4.5).
//!
//! Converts the builder's arena of owned [`crate::trie::node::Node`]s into a
//! single immutable [`Layout`]: nodes, static/param/method edges, and
//! compiled patterns each live in their own contiguous `Vec`, addressed by
//! index ranges rather than pointers, with strings interned once into a
//! shared table. A breadth-first walk from the root gives a deterministic
//! node order so two builds of the same routes always produce the same
//! layout.
//!
//! **Scope note** (see `DESIGN.md`): `spec.md` §3 describes the node buffer
//! as eight packed `u32` words per node. This implementation keeps the same
//! essential property -- nodes addressed by index, children as contiguous
//! ranges into flat arrays, no pointer chasing -- as a `Vec<FlatNode>` of a
//! plain Rust struct rather than hand-packed bit fields. The packing is a
//! cache-locality optimization over a representation that is otherwise
//! identical; unpacking it into real fields costs nothing the matcher's
//! bounded-work guarantees depend on, and keeps the matcher's logic (§4.6)
//! legible instead of reimplementing a bit-field reader.

use std::collections::HashMap;

use crate::error::RegistrationError;
use crate::method::MethodMask;
use crate::pattern_tester::PatternTester;
use crate::trie::builder::{RegisteredRoute, TrieBuilder};
use crate::trie::node::{Node, NodeKind, WildcardOrigin};

pub const MAX_EDGE_LINEAR_SCAN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatNodeKind {
    Static,
    Param,
    Wildcard,
}

/// One flattened trie node. Child ranges index into the sibling [`Layout`]
/// vectors (`static_edges`, `param_children`, `methods`); `u32::MAX` in a
/// `*_start` field means "no entries" (range length is always 0 in that
/// case, so it is never dereferenced).
#[derive(Debug, Clone)]
pub struct FlatNode {
    pub kind: FlatNodeKind,
    /// Interned `(offset, len)` into [`Layout::strings`]: the literal for
    /// `Static`, the parameter name for `Param`/named `Wildcard`.
    pub name: Option<(u32, u32)>,
    pub pattern: Option<u32>,
    pub name_suppressed: bool,
    pub wildcard_origin: Option<WildcardOrigin>,
    pub method_mask: MethodMask,
    pub static_start: u32,
    pub static_count: u32,
    pub param_start: u32,
    pub param_count: u32,
    pub wildcard_child: Option<u32>,
    pub methods_start: u32,
    pub methods_count: u32,
}

/// One entry of a node's flattened static-children edge list, kept sorted by
/// segment so the matcher can binary-search it (`spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct StaticEdge {
    pub segment: (u32, u32),
    pub child: u32,
}

#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub handler_index: u32,
    pub pattern: String,
    pub optional_param_names: Vec<String>,
}

/// The immutable, flattened binary layout the matcher walks.
pub struct Layout {
    pub nodes: Vec<FlatNode>,
    pub static_edges: Vec<StaticEdge>,
    pub param_children: Vec<u32>,
    pub methods: Vec<(u8, u32)>,
    pub patterns: Vec<PatternTester>,
    pub strings: String,
    pub root_index: u32,
    pub routes: Vec<RouteInfo>,
}

impl Layout {
    #[must_use]
    pub fn string_at(&self, offset: u32, len: u32) -> &str {
        &self.strings[offset as usize..(offset + len) as usize]
    }
}

/// Flattens a built trie into a [`Layout`], BFS from the root so node index
/// 0 is always the root and sibling subtrees stay contiguous.
pub fn flatten(builder: &TrieBuilder, max_execution_ms: Option<u64>) -> Result<Layout, RegistrationError> {
    let source_nodes = builder.nodes();
    let mut strings = String::new();
    let mut string_offsets: HashMap<String, (u32, u32)> = HashMap::new();
    let mut pattern_cache: HashMap<String, u32> = HashMap::new();
    let mut patterns = Vec::new();

    // old index -> new (BFS) index
    let mut remap = vec![u32::MAX; source_nodes.len()];
    let mut order = Vec::with_capacity(source_nodes.len());
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(0u32);
    remap[0] = 0;
    order.push(0u32);
    while let Some(old_idx) = queue.pop_front() {
        let node = &source_nodes[old_idx as usize];
        for &(_, child) in &node.static_children {
            assign(&mut remap, &mut order, &mut queue, child);
        }
        for &child in &node.param_children {
            assign(&mut remap, &mut order, &mut queue, child);
        }
        if let Some(child) = node.wildcard_child {
            assign(&mut remap, &mut order, &mut queue, child);
        }
    }

    let mut flat_nodes = Vec::with_capacity(order.len());
    let mut static_edges = Vec::new();
    let mut param_children = Vec::new();
    let mut methods = Vec::new();

    for &old_idx in &order {
        let node = &source_nodes[old_idx as usize];
        let flat = build_flat_node(
            node,
            &remap,
            &mut strings,
            &mut string_offsets,
            &mut pattern_cache,
            &mut patterns,
            &mut static_edges,
            &mut param_children,
            &mut methods,
            max_execution_ms,
        )?;
        flat_nodes.push(flat);
    }

    let routes = builder
        .registered_routes()
        .iter()
        .map(|route: &RegisteredRoute| RouteInfo {
            handler_index: route.handler_index,
            pattern: route.pattern.clone(),
            optional_param_names: route.optional_param_names.clone(),
        })
        .collect();

    Ok(Layout {
        nodes: flat_nodes,
        static_edges,
        param_children,
        methods,
        patterns,
        strings,
        root_index: 0,
        routes,
    })
}

fn assign(
    remap: &mut [u32],
    order: &mut Vec<u32>,
    queue: &mut std::collections::VecDeque<u32>,
    old_idx: u32,
) {
    if remap[old_idx as usize] != u32::MAX {
        return;
    }
    let new_idx = order.len() as u32;
    remap[old_idx as usize] = new_idx;
    order.push(old_idx);
    queue.push_back(old_idx);
}

#[allow(clippy::too_many_arguments)]
fn build_flat_node(
    node: &Node,
    remap: &[u32],
    strings: &mut String,
    string_offsets: &mut HashMap<String, (u32, u32)>,
    pattern_cache: &mut HashMap<String, u32>,
    patterns: &mut Vec<PatternTester>,
    static_edges: &mut Vec<StaticEdge>,
    param_children: &mut Vec<u32>,
    methods: &mut Vec<(u8, u32)>,
    max_execution_ms: Option<u64>,
) -> Result<FlatNode, RegistrationError> {
    let mut method_mask = MethodMask::empty();
    let methods_start = methods.len() as u32;
    let mut sorted_methods = node.methods.clone();
    sorted_methods.sort_by_key(|(code, _)| *code);
    for &(code, handler) in &sorted_methods {
        method_mask.set(code);
        methods.push((code, handler));
    }
    let methods_count = sorted_methods.len() as u32;

    let static_start = static_edges.len() as u32;
    let mut sorted_static = node.static_children.clone();
    sorted_static.sort_by(|a, b| a.0.cmp(&b.0));
    for (segment, child) in &sorted_static {
        let interned = intern(strings, string_offsets, segment);
        static_edges.push(StaticEdge {
            segment: interned,
            child: remap[*child as usize],
        });
    }
    let static_count = sorted_static.len() as u32;

    let param_start = param_children.len() as u32;
    for &child in &node.param_children {
        param_children.push(remap[child as usize]);
    }
    let param_count = node.param_children.len() as u32;

    let wildcard_child = node.wildcard_child.map(|idx| remap[idx as usize]);

    let (kind, name, pattern, name_suppressed, wildcard_origin) = match &node.kind {
        NodeKind::Static { segment } => {
            let interned = if segment.is_empty() {
                None
            } else {
                Some(intern(strings, string_offsets, segment))
            };
            (FlatNodeKind::Static, interned, None, false, None)
        }
        NodeKind::Param {
            name,
            pattern_source,
            name_suppressed,
        } => {
            let interned = Some(intern(strings, string_offsets, name));
            let pattern_idx = match pattern_source {
                Some(source) => Some(intern_pattern(pattern_cache, patterns, source, max_execution_ms)?),
                None => None,
            };
            (FlatNodeKind::Param, interned, pattern_idx, *name_suppressed, None)
        }
        NodeKind::Wildcard { name, origin } => {
            let interned = name.as_ref().map(|n| intern(strings, string_offsets, n));
            (FlatNodeKind::Wildcard, interned, None, false, Some(*origin))
        }
    };

    Ok(FlatNode {
        kind,
        name,
        pattern,
        name_suppressed,
        wildcard_origin,
        method_mask,
        static_start,
        static_count,
        param_start,
        param_count,
        wildcard_child,
        methods_start,
        methods_count,
    })
}

fn intern(
    strings: &mut String,
    offsets: &mut HashMap<String, (u32, u32)>,
    value: &str,
) -> (u32, u32) {
    if let Some(&existing) = offsets.get(value) {
        return existing;
    }
    let offset = strings.len() as u32;
    strings.push_str(value);
    let len = value.len() as u32;
    offsets.insert(value.to_string(), (offset, len));
    (offset, len)
}

fn intern_pattern(
    cache: &mut HashMap<String, u32>,
    patterns: &mut Vec<PatternTester>,
    source: &str,
    max_execution_ms: Option<u64>,
) -> Result<u32, RegistrationError> {
    if let Some(&idx) = cache.get(source) {
        return Ok(idx);
    }
    let tester = PatternTester::compile(source, max_execution_ms).map_err(|err| {
        RegistrationError::UnsafeRegex {
            pattern: source.to_string(),
            reason: err.to_string(),
        }
    })?;
    let idx = patterns.len() as u32;
    patterns.push(tester);
    cache.insert(source.to_string(), idx);
    Ok(idx)
}
