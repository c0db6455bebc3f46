//! # radixgate
//!
//! A radix-trie HTTP router: registration-time compilation of path patterns
//! into a flat, cache-friendly binary layout, and bounded-work matching
//! against it at request time.
//!
//! ## Architecture
//!
//! Routing is split into two phases:
//!
//! 1. **Registration** ([`trie::builder`]): path patterns are parsed into
//!    static/param/wildcard segments and inserted into a mutable, arena-
//!    indexed trie ([`trie::node`]). Regex constraints are validated for
//!    ReDoS risk ([`regex_safety`]) and compiled into optimized testers
//!    ([`pattern_tester`]) up front, never at match time.
//! 2. **Build** ([`layout`]): the trie is flattened, breadth-first, into a
//!    single immutable [`layout::Layout`] -- nodes, edges, and patterns each
//!    in their own contiguous `Vec`, strings interned once.
//!
//! Matching ([`matcher`]) walks the flattened layout with an explicit frame
//! stack instead of recursion, bounded by [`matcher::MAX_STACK_DEPTH`], and
//! extracts parameters into a stack-allocated [`matcher::ParamVec`].
//!
//! [`router::Router`] ties the phases together: path normalization
//! ([`path`]), a static-only fast path, an LRU result cache ([`cache`]),
//! then the full trie walk, in that priority order.
//!
//! ## External collaborators
//!
//! [`query`] and [`cors`] are not part of the routing core -- they are
//! small, router-adjacent utilities a host embedding this crate would
//! otherwise have to pull in a second dependency for.

pub mod cache;
pub mod cors;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod method;
pub mod path;
pub mod pattern_tester;
pub mod query;
pub mod regex_safety;
pub mod router;
pub mod status;
pub mod trie;

pub use error::{HostError, MatchError, RegistrationError, RouterResult};
pub use method::MethodSpec;
pub use router::{MatchSource, OptionalParamBehavior, ParamVec, Router, RouterOptions, RouteOutcome};
