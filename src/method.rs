//! Shared HTTP method representation.
//!
//! The router accepts `http::Method` at its boundary (the teacher's own
//! representation throughout `router/core.rs`) but the binary layout packs
//! methods into a dense 0..=6 code space (`spec.md` §3). This module is the
//! bridge between the two.

use http::Method;

/// Method codes as packed into `methodsBuffer`/`method_mask` (`spec.md` §3).
/// Order matters: it is the canonical code assignment, not alphabetical.
pub const CODED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
];

/// Maps an `http::Method` to its binary-layout code, if it has one.
///
/// Methods outside the 7-method code space (e.g. `TRACE`, `CONNECT`) are not
/// representable in the flattened layout and are rejected at registration.
#[must_use]
pub fn method_code(method: &Method) -> Option<u8> {
    CODED_METHODS
        .iter()
        .position(|m| m == method)
        .map(|i| i as u8)
}

/// Inverse of [`method_code`].
#[must_use]
pub fn code_method(code: u8) -> Option<Method> {
    CODED_METHODS.get(code as usize).cloned()
}

/// A bitset over the 7 method codes, cached per trie node so a terminal can
/// be rejected in O(1) before scanning `methodsBuffer` (`spec.md` §4.5).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MethodMask(u32);

impl MethodMask {
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn set(&mut self, code: u8) {
        self.0 |= 1 << code;
    }

    #[must_use]
    pub fn contains(&self, code: u8) -> bool {
        self.0 & (1 << code) != 0
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn from_u32(bits: u32) -> Self {
        Self(bits)
    }
}

/// A registration's method spec: one method, an explicit set, or `*` (any of
/// the 7 coded methods).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSpec {
    One(Method),
    Set(Vec<Method>),
    Any,
}

impl MethodSpec {
    /// Expands to the concrete list of methods this registration applies to.
    #[must_use]
    pub fn expand(&self) -> Vec<Method> {
        match self {
            MethodSpec::One(m) => vec![m.clone()],
            MethodSpec::Set(set) => set.clone(),
            MethodSpec::Any => CODED_METHODS.to_vec(),
        }
    }
}

impl From<Method> for MethodSpec {
    fn from(method: Method) -> Self {
        MethodSpec::One(method)
    }
}
