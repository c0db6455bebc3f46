//! CORS policy evaluation.
//!
//! Listed in `spec.md` §1 as "a pure header-building state machine" external
//! collaborator. Grounded on the teacher's `middleware::cors::CorsMiddleware`
//! (`src/middleware/cors.rs`), but decoupled from its `HandlerRequest`/
//! `HandlerResponse` types -- those belonged to the dropped dispatcher -- and
//! reshaped into a pure function of (policy, request headers) -> headers to
//! emit, so it can sit next to the router without depending on any transport.

use http::Method;

/// A CORS policy: the set of origins, methods, and headers a host allows.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: Option<u64>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// Outcome of evaluating a request against a [`CorsPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsDecision {
    /// No `Origin` header present -- not a cross-origin request.
    NotApplicable,
    /// A preflight (`OPTIONS` + `Access-Control-Request-Method`) response.
    Preflight(Vec<(String, String)>),
    /// Headers to attach to the actual response of a cross-origin request.
    Actual(Vec<(String, String)>),
    /// The origin (or requested method) is not allowed by the policy.
    Rejected,
}

impl CorsPolicy {
    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    fn origin_header_value(&self, origin: &str) -> String {
        if self.allowed_origins.iter().any(|o| o == "*") && !self.allow_credentials {
            "*".to_string()
        } else {
            origin.to_string()
        }
    }

    /// Evaluates a request. `origin` is the `Origin` header value, if any;
    /// `is_preflight` distinguishes an `OPTIONS` preflight from an actual
    /// cross-origin request; `requested_method` is `Access-Control-Request-Method`
    /// on a preflight.
    #[must_use]
    pub fn evaluate(
        &self,
        origin: Option<&str>,
        is_preflight: bool,
        requested_method: Option<&Method>,
    ) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision::NotApplicable;
        };

        if !self.origin_allowed(origin) {
            return CorsDecision::Rejected;
        }

        if is_preflight {
            if let Some(method) = requested_method {
                if !self.allowed_methods.contains(method) {
                    return CorsDecision::Rejected;
                }
            }
            let mut headers = vec![
                (
                    "Access-Control-Allow-Origin".to_string(),
                    self.origin_header_value(origin),
                ),
                (
                    "Access-Control-Allow-Methods".to_string(),
                    join_methods(&self.allowed_methods),
                ),
                (
                    "Access-Control-Allow-Headers".to_string(),
                    self.allowed_headers.join(", "),
                ),
            ];
            if self.allow_credentials {
                headers.push((
                    "Access-Control-Allow-Credentials".to_string(),
                    "true".to_string(),
                ));
            }
            if let Some(max_age) = self.max_age_secs {
                headers.push(("Access-Control-Max-Age".to_string(), max_age.to_string()));
            }
            CorsDecision::Preflight(headers)
        } else {
            let mut headers = vec![(
                "Access-Control-Allow-Origin".to_string(),
                self.origin_header_value(origin),
            )];
            if self.allow_credentials {
                headers.push((
                    "Access-Control-Allow-Credentials".to_string(),
                    "true".to_string(),
                ));
            }
            CorsDecision::Actual(headers)
        }
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
