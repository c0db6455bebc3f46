//! Trie node types (`spec.md` §3/§4.4).
//!
//! The builder works over an arena (`Vec<Node>`, indexed by `u32`) rather
//! than owned child pointers -- "Structural sharing of children via typed
//! indices" (`spec.md` §9 Design Notes) -- so the same index scheme carries
//! straight through into the flattener's binary layout without a pointer
//! rewrite pass. Grounded on the shape of the teacher's `RadixNode`
//! (`router/radix.rs`: `segment`, `param_name`, `children`, `param_children`,
//! `routes: HashMap<Method, _>`), generalized to also carry Wildcard nodes,
//! regex-constrained Param nodes, and index-based children.

/// How a wildcard segment was written (`spec.md` §3): bare `*` forbids an
/// empty match, `*name` is the same but named, `**name` is the only form
/// that matches zero remaining segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardOrigin {
    Star,
    Multi,
    Zero,
}

impl WildcardOrigin {
    #[must_use]
    pub fn allows_empty(self) -> bool {
        matches!(self, WildcardOrigin::Zero)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Static {
        segment: String,
    },
    Param {
        name: String,
        pattern_source: Option<String>,
        /// Reserved/unsafe name (`__proto__` and friends) registered under
        /// non-strict mode: the node still matches structurally, but its
        /// binding is dropped from the returned params (`spec.md` §4.4).
        name_suppressed: bool,
    },
    Wildcard {
        name: Option<String>,
        origin: WildcardOrigin,
    },
}

/// A single trie node. Children are referenced by arena index, never owned
/// directly, matching the binary layout's own indexing scheme.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Lexically-ordered `(segment, child_index)` pairs. Builder-time
    /// lookups are a linear scan -- registration happens once, off the hot
    /// path; the flattener's `staticChildrenBuffer` is what the matcher
    /// binary-searches at request time (`spec.md` §4.6).
    pub static_children: Vec<(String, u32)>,
    /// Sorted per [`crate::trie::builder::sort_param_children`]: regex-constrained
    /// before unconstrained, longer regex source before shorter, ascending
    /// name.
    pub param_children: Vec<u32>,
    pub wildcard_child: Option<u32>,
    /// `(method_code, handler_index)`, at most one entry per method code.
    pub methods: Vec<(u8, u32)>,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            static_children: Vec::new(),
            param_children: Vec::new(),
            wildcard_child: None,
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn root() -> Self {
        Self::new(NodeKind::Static {
            segment: String::new(),
        })
    }

    #[must_use]
    pub fn find_static_child(&self, segment: &str) -> Option<u32> {
        self.static_children
            .iter()
            .find(|(s, _)| s == segment)
            .map(|(_, idx)| *idx)
    }

    #[must_use]
    pub fn find_param_child<'a>(
        &'a self,
        nodes: &'a [Node],
        name: &str,
        pattern_source: Option<&str>,
    ) -> Option<u32> {
        self.param_children.iter().copied().find(|&idx| {
            if let NodeKind::Param {
                name: n,
                pattern_source: p,
                ..
            } = &nodes[idx as usize].kind
            {
                n == name && p.as_deref() == pattern_source
            } else {
                false
            }
        })
    }

    #[must_use]
    pub fn has_method(&self, code: u8) -> bool {
        self.methods.iter().any(|(c, _)| *c == code)
    }
}
