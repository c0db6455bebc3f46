//! Router façade (`spec.md` §3/§5/§6).
//!
//! The public entry point: register routes against a generic handler type
//! `H`, `build()` the mutable trie into its flattened layout, then
//! `match_request` a method+path against it. Matching tries, in order, a
//! static-only fast path (exact method+path, no trie walk at all), the LRU
//! result cache, then the full [`crate::matcher`] walk -- the same priority
//! the teacher's `Router::route` gives its own `static_routes` map before
//! falling into `RadixRouter::find` (`router/core.rs`).

use std::collections::HashMap;

use http::Method;
use tracing::{debug, trace};

use crate::cache::{cache_key, CacheValue, MatchCache};
use crate::error::{MatchError, RegistrationError};
use crate::layout::{self, Layout};
use crate::matcher::{self, MatchOutcome};
use crate::method::{method_code, MethodMask, MethodSpec};
use crate::path::{self, PathConfig};
use crate::regex_safety::{AnchorPolicy, RegexSafetyConfig};
use crate::trie::builder::{BuilderConfig, TrieBuilder};

pub use crate::matcher::ParamVec;

/// Re-exported so [`crate::query`] and [`crate::cache`] share the matcher's
/// stack-allocated parameter storage instead of defining their own.
pub const MAX_INLINE_PARAMS: usize = crate::matcher::MAX_PARAMS;

/// How to fill path parameters an optional segment (`:name?`) didn't
/// capture (`spec.md` §4.4/§6).
///
/// The distilled spec names a third variant, "set undefined" -- Rust's
/// `(String, String)` param pairs have no undefined value to set, so that
/// variant collapses into [`OptionalParamBehavior::Omit`] here; a host that
/// wants to distinguish "never declared" from "declared but absent" should
/// consult [`Router::optional_param_names`] directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalParamBehavior {
    Omit,
    EmptyString,
}

impl Default for OptionalParamBehavior {
    fn default() -> Self {
        OptionalParamBehavior::Omit
    }
}

/// Full option set governing registration and matching, per the options
/// table in `spec.md` §6. Field defaults mirror [`PathConfig`]'s own
/// defaults plus the router-level additions (cache size, regex safety).
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub path: PathConfig,
    pub strict_param_names: bool,
    pub regex_safety: RegexSafetyConfig,
    pub anchor_policy: AnchorPolicy,
    pub max_params: usize,
    pub max_regex_execution_ms: Option<u64>,
    /// Whether the LRU match-result cache is consulted/populated at all
    /// (`spec.md` §6's `enableCache`). Off by default -- `cache_capacity`
    /// only takes effect once this is set.
    pub enable_cache: bool,
    pub cache_capacity: usize,
    pub optional_param_behavior: OptionalParamBehavior,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            path: PathConfig::default(),
            strict_param_names: false,
            regex_safety: RegexSafetyConfig::default(),
            anchor_policy: AnchorPolicy::default(),
            max_params: crate::trie::builder::MAX_PARAMS,
            max_regex_execution_ms: None,
            enable_cache: false,
            cache_capacity: 1024,
            optional_param_behavior: OptionalParamBehavior::default(),
        }
    }
}

impl RouterOptions {
    fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            strict_param_names: self.strict_param_names,
            regex_safety: self.regex_safety.clone(),
            anchor_policy: self.anchor_policy,
            max_params: self.max_params,
        }
    }
}

/// Which phase of matching produced a result, surfaced for observability
/// only -- the outcome is identical regardless of source (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    StaticFast,
    Cache,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<'a, H> {
    Matched {
        handler: &'a H,
        params: ParamVec,
        source: MatchSource,
    },
    MethodNotAllowed {
        allowed: MethodMask,
    },
    NotFound,
}

struct StaticFastEntry {
    handler_index: u32,
}

/// A radix-trie HTTP router generic over an opaque handler payload `H`.
pub struct Router<H> {
    options: RouterOptions,
    builder: TrieBuilder,
    layout: Option<Layout>,
    handlers: Vec<H>,
    optional_param_names: Vec<Vec<String>>,
    static_fast_paths: HashMap<(u8, String), StaticFastEntry>,
    cache: MatchCache,
}

impl<H> Router<H> {
    /// Validates `options` against the matcher's fixed-size parameter stack
    /// before constructing the router, rather than failing later at the
    /// first registration (`spec.md` §6: explicit `Result`-returning
    /// constructors over panicking configuration).
    pub fn new(options: RouterOptions) -> Result<Self, RegistrationError> {
        if options.max_params > crate::matcher::MAX_PARAMS {
            return Err(RegistrationError::InvalidOption {
                option: "max_params".to_string(),
                reason: format!(
                    "cannot exceed the matcher's fixed parameter capacity of {}",
                    crate::matcher::MAX_PARAMS
                ),
            });
        }
        let cache_capacity = options.cache_capacity;
        Ok(Self {
            options,
            builder: TrieBuilder::new(),
            layout: None,
            handlers: Vec::new(),
            optional_param_names: Vec::new(),
            static_fast_paths: HashMap::new(),
            cache: MatchCache::new(cache_capacity),
        })
    }

    /// Registers `pattern` for `method` against `handler`. Must be called
    /// before [`Router::build`]; `build()` consumes the registration phase.
    pub fn add(
        &mut self,
        method: impl Into<MethodSpec>,
        pattern: &str,
        handler: H,
    ) -> Result<(), RegistrationError> {
        let method_spec = method.into();
        let handler_index = self.handlers.len() as u32;
        let config = self.options.builder_config();
        self.builder.add(&method_spec, pattern, handler_index, &config)?;
        self.handlers.push(handler);
        self.optional_param_names.push(Vec::new());

        if is_pure_static(pattern) {
            let processed = path::process(pattern, &self.options.path)
                .map_err(|err| RegistrationError::MalformedPattern {
                    pattern: pattern.to_string(),
                    reason: err.to_string(),
                })?;
            for method in method_spec.expand() {
                if let Some(code) = method_code(&method) {
                    self.static_fast_paths.insert(
                        (code, processed.normalized.clone()),
                        StaticFastEntry { handler_index },
                    );
                }
            }
        }

        Ok(())
    }

    /// Registers a sequence of `(method, pattern, handler)` entries via
    /// [`Router::add`], in order. Stops at, and returns, the first failing
    /// add (`spec.md` §6's `addAll`); routes added before the failing entry
    /// remain registered.
    pub fn add_all<'p, M>(
        &mut self,
        entries: impl IntoIterator<Item = (M, &'p str, H)>,
    ) -> Result<(), RegistrationError>
    where
        M: Into<MethodSpec>,
    {
        for (method, pattern, handler) in entries {
            self.add(method, pattern, handler)?;
        }
        Ok(())
    }

    /// Flattens the registered trie into its immutable matching layout.
    /// Matching before `build()` is called is a programming error, reported
    /// via [`MatchError::InternalFault`].
    pub fn build(&mut self) -> Result<(), RegistrationError> {
        let layout = layout::flatten(&self.builder, self.options.max_regex_execution_ms)?;
        for (i, route) in layout.routes.iter().enumerate() {
            if let Some(slot) = self.optional_param_names.get_mut(i) {
                *slot = route.optional_param_names.clone();
            }
        }
        debug!(nodes = layout.nodes.len(), routes = layout.routes.len(), "router built");
        self.layout = Some(layout);
        Ok(())
    }

    /// Matches `method`/`raw_path` against the built router.
    pub fn match_request(
        &mut self,
        method: &Method,
        raw_path: &str,
    ) -> Result<RouteOutcome<'_, H>, MatchError> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| MatchError::InternalFault("router has not been built".to_string()))?;

        let processed = path::process(raw_path, &self.options.path)?;

        let Some(code) = method_code(method) else {
            return Ok(RouteOutcome::NotFound);
        };

        if let Some(entry) = self.static_fast_paths.get(&(code, processed.normalized.clone())) {
            trace!(path = %processed.normalized, "static fast path hit");
            return Ok(RouteOutcome::Matched {
                handler: &self.handlers[entry.handler_index as usize],
                params: ParamVec::new(),
                source: MatchSource::StaticFast,
            });
        }

        let key = cache_key(method, &processed.normalized);
        if self.options.enable_cache {
            if let Some(cached) = self.cache.get(&key) {
                return Ok(match cached {
                    CacheValue::Miss => RouteOutcome::NotFound,
                    CacheValue::MethodNotAllowed { allowed } => RouteOutcome::MethodNotAllowed { allowed },
                    CacheValue::Hit { handler_index, params } => RouteOutcome::Matched {
                        handler: &self.handlers[handler_index as usize],
                        params,
                        source: MatchSource::Cache,
                    },
                });
            }
        }

        let outcome = matcher::match_path(
            layout,
            &processed.segments,
            &processed.decode_hints,
            code,
            self.options.path.encoded_slash_behavior,
            self.options.path.fail_fast_on_bad_encoding,
        )?;

        match outcome {
            MatchOutcome::Matched { handler_index, mut params } => {
                self.fill_optional_defaults(handler_index, &mut params);
                if self.options.enable_cache {
                    self.cache.put(
                        key,
                        CacheValue::Hit {
                            handler_index,
                            params: params.clone(),
                        },
                    );
                }
                Ok(RouteOutcome::Matched {
                    handler: &self.handlers[handler_index as usize],
                    params,
                    source: MatchSource::Dynamic,
                })
            }
            MatchOutcome::MethodNotAllowed { allowed } => {
                if self.options.enable_cache {
                    self.cache.put(key, CacheValue::MethodNotAllowed { allowed });
                }
                Ok(RouteOutcome::MethodNotAllowed { allowed })
            }
            MatchOutcome::NotFound => {
                if self.options.enable_cache {
                    self.cache.put(key, CacheValue::Miss);
                }
                Ok(RouteOutcome::NotFound)
            }
        }
    }

    fn fill_optional_defaults(&self, handler_index: u32, params: &mut ParamVec) {
        if self.options.optional_param_behavior != OptionalParamBehavior::EmptyString {
            return;
        }
        let Some(names) = self.optional_param_names.get(handler_index as usize) else {
            return;
        };
        for name in names {
            if !params.iter().any(|(k, _)| k == name) {
                params.push((name.clone(), String::new()));
            }
        }
    }

    /// The parameter names declared optional (`:name?`) for the route
    /// registered at `handler_index` (the index `add` returned implicitly,
    /// i.e. registration order). Empty if the route declared none.
    #[must_use]
    pub fn optional_param_names(&self, handler_index: u32) -> &[String] {
        self.optional_param_names
            .get(handler_index as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn is_pure_static(pattern: &str) -> bool {
    !pattern
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        Router::new(RouterOptions::default()).unwrap()
    }

    fn router_with_cache() -> Router<&'static str> {
        let mut options = RouterOptions::default();
        options.enable_cache = true;
        Router::new(options).unwrap()
    }

    #[test]
    fn matches_static_route_via_fast_path() {
        let mut r = router();
        r.add(Method::GET, "/health", "health-handler").unwrap();
        r.build().unwrap();
        match r.match_request(&Method::GET, "/health").unwrap() {
            RouteOutcome::Matched { handler, source, .. } => {
                assert_eq!(*handler, "health-handler");
                assert_eq!(source, MatchSource::StaticFast);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn cache_is_disabled_by_default() {
        let mut r = router();
        r.add(Method::GET, "/users/:id(\\d+)", "user-handler").unwrap();
        r.build().unwrap();
        r.match_request(&Method::GET, "/users/7").unwrap();
        r.match_request(&Method::GET, "/users/7").unwrap();
        assert_eq!(r.cache_len(), 0);
        match r.match_request(&Method::GET, "/users/7").unwrap() {
            RouteOutcome::Matched { source, .. } => assert_eq!(source, MatchSource::Dynamic),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn matches_dynamic_route_and_then_serves_from_cache() {
        let mut r = router_with_cache();
        r.add(Method::GET, "/users/:id(\\d+)", "user-handler").unwrap();
        r.build().unwrap();
        let first = r.match_request(&Method::GET, "/users/7").unwrap();
        match first {
            RouteOutcome::Matched { handler, source, params } => {
                assert_eq!(*handler, "user-handler");
                assert_eq!(source, MatchSource::Dynamic);
                assert_eq!(params.as_slice(), &[("id".to_string(), "7".to_string())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
        assert_eq!(r.cache_len(), 1);
        match r.match_request(&Method::GET, "/users/7").unwrap() {
            RouteOutcome::Matched { source, .. } => assert_eq!(source, MatchSource::Cache),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn negative_caches_unknown_path() {
        let mut r = router_with_cache();
        r.add(Method::GET, "/health", "health-handler").unwrap();
        r.build().unwrap();
        assert_eq!(r.match_request(&Method::GET, "/missing").unwrap(), RouteOutcome::NotFound);
        assert_eq!(r.match_request(&Method::GET, "/missing").unwrap(), RouteOutcome::NotFound);
        assert_eq!(r.cache_len(), 1);
    }

    #[test]
    fn add_all_registers_every_entry_in_order() {
        let mut r = router();
        r.add_all([
            (Method::GET, "/health", "health-handler"),
            (Method::GET, "/users/:id", "user-handler"),
            (Method::POST, "/users", "create-user"),
        ])
        .unwrap();
        r.build().unwrap();
        match r.match_request(&Method::GET, "/users/7").unwrap() {
            RouteOutcome::Matched { handler, .. } => assert_eq!(*handler, "user-handler"),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn add_all_stops_at_first_failing_entry() {
        let mut r = router();
        let err = r
            .add_all([
                (Method::GET, "/health", "health-handler"),
                (Method::GET, "/health", "duplicate-handler"),
                (Method::GET, "/never-reached", "unreachable-handler"),
            ])
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute { .. }));
        r.build().unwrap();
        assert_eq!(
            r.match_request(&Method::GET, "/never-reached").unwrap(),
            RouteOutcome::NotFound
        );
    }

    #[test]
    fn reports_method_not_allowed() {
        let mut r = router();
        r.add(Method::POST, "/users", "create-user").unwrap();
        r.build().unwrap();
        match r.match_request(&Method::GET, "/users").unwrap() {
            RouteOutcome::MethodNotAllowed { allowed } => assert!(allowed.contains(1)),
            other => panic!("expected method-not-allowed, got {other:?}"),
        }
    }

    #[test]
    fn optional_param_omitted_by_default() {
        let mut r = router();
        r.add(Method::GET, "/users/:id?", "users-handler").unwrap();
        r.build().unwrap();
        match r.match_request(&Method::GET, "/users").unwrap() {
            RouteOutcome::Matched { params, .. } => assert!(params.is_empty()),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn optional_param_fills_empty_string_when_configured() {
        let mut options = RouterOptions::default();
        options.optional_param_behavior = OptionalParamBehavior::EmptyString;
        let mut r: Router<&'static str> = Router::new(options).unwrap();
        r.add(Method::GET, "/users/:id?", "users-handler").unwrap();
        r.build().unwrap();
        match r.match_request(&Method::GET, "/users").unwrap() {
            RouteOutcome::Matched { params, .. } => {
                assert_eq!(params.as_slice(), &[("id".to_string(), String::new())]);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn rejects_max_params_beyond_matcher_capacity() {
        let mut options = RouterOptions::default();
        options.max_params = crate::matcher::MAX_PARAMS + 1;
        let err = Router::<&'static str>::new(options).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidOption { .. }));
    }

    #[test]
    fn matching_before_build_is_an_internal_fault() {
        let mut r = router();
        let err = r.match_request(&Method::GET, "/health").unwrap_err();
        assert!(matches!(err, MatchError::InternalFault(_)));
    }
}
