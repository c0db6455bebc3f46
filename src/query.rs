//! Query-string parsing.
//!
//! Out of scope for the router's core design (`spec.md` §1 lists it as an
//! external collaborator) -- the router's own path processing strips the
//! query string entirely (`stripQuery`, `spec.md` §4.1) before segmenting.
//! This module exists only so a host has somewhere to turn the discarded
//! query string into parameters without reaching for a second dependency.

use smallvec::SmallVec;

use crate::router::MAX_INLINE_PARAMS;

/// Query parameters, stack-allocated for the common case, same shape as the
/// matcher's path-parameter storage.
pub type QueryParams = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// Splits `path` at the first `?` and parses the remainder as
/// `application/x-www-form-urlencoded` pairs, percent-decoding both keys and
/// values via `url::form_urlencoded`.
#[must_use]
pub fn parse_query(path_and_query: &str) -> QueryParams {
    let query = match path_and_query.split_once('?') {
        Some((_, q)) => q,
        None => return QueryParams::new(),
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// "Last write wins" lookup, matching the router's own duplicate-parameter
/// convention (`RouteMatch::get_path_param` in the teacher).
#[must_use]
pub fn get<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
