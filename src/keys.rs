//! Cache key derivation for HTTP requests
//!
//! A key is the sorted list of `METHOD`, path, every `name=value` query pair
//! (the no-cache parameter excluded) and `header:name=value` for each
//! configured vary header, joined with `|`. Sorting makes the key independent
//! of query parameter order, so `GET /` becomes `"/|GET"`.

use http::header::AUTHORIZATION;
use http::request::Parts;

use crate::ManagerConfig;

const SEPARATOR: &str = "|";

/// Decides how a request maps to a cache key and whether it may use the cache
#[derive(Debug, Clone)]
pub struct KeyPolicy {
    no_cache_param: String,
    vary_headers: Vec<String>,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::from(&ManagerConfig::default())
    }
}

impl From<&ManagerConfig> for KeyPolicy {
    fn from(config: &ManagerConfig) -> Self {
        Self::new(config.no_cache_param.clone(), config.vary_headers.clone())
    }
}

impl KeyPolicy {
    pub fn new(no_cache_param: impl Into<String>, vary_headers: Vec<String>) -> Self {
        Self {
            no_cache_param: no_cache_param.into(),
            vary_headers: vary_headers
                .into_iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn no_cache_param(&self) -> &str {
        &self.no_cache_param
    }

    /// Derive the cache key of a request.
    pub fn derive(&self, request: &Parts) -> String {
        self.derive_with_state(request, &[])
    }

    /// Derive the cache key of a request, mixing in extra `name=value` pairs
    /// taken from request state (tenant, locale, ...).
    pub fn derive_with_state(&self, request: &Parts, state: &[(&str, &str)]) -> String {
        let mut parts = vec![
            request.method.as_str().to_owned(),
            request.uri.path().to_owned(),
        ];

        parts.extend(
            query_pairs(request)
                .filter(|(name, _)| name != &self.no_cache_param)
                .map(|(name, value)| format!("{name}={value}")),
        );

        for name in &self.vary_headers {
            for value in request.headers.get_all(name.as_str()) {
                parts.push(format!(
                    "header:{}={}",
                    name,
                    String::from_utf8_lossy(value.as_bytes())
                ));
            }
        }

        parts.extend(state.iter().map(|(name, value)| format!("state:{name}={value}")));

        parts.sort();
        parts.join(SEPARATOR)
    }

    /// Requests carrying credentials must never be served from or stored in
    /// the shared cache.
    pub fn bypasses(&self, request: &Parts) -> bool {
        request.headers.contains_key(AUTHORIZATION)
    }

    /// Whether the request asks for a fresh response via the no-cache parameter.
    pub fn forces_refresh(&self, request: &Parts) -> bool {
        query_pairs(request).any(|(name, _)| name == self.no_cache_param)
    }
}

fn query_pairs(request: &Parts) -> impl Iterator<Item = (String, String)> + '_ {
    let query = request.uri.query().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn parts(method: &str, uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_root_request_key() {
        let policy = KeyPolicy::default();
        assert_eq!(policy.derive(&parts("GET", "/", &[])), "/|GET");
    }

    #[test]
    fn test_query_order_does_not_matter() {
        let policy = KeyPolicy::default();
        let a = policy.derive(&parts("GET", "/products?page=2&sort=name&tag=x", &[]));
        let b = policy.derive(&parts("GET", "/products?tag=x&page=2&sort=name", &[]));
        assert_eq!(a, b);
        assert_eq!(a, "/products|GET|page=2|sort=name|tag=x");
    }

    #[test]
    fn test_no_cache_param_is_excluded() {
        let policy = KeyPolicy::default();
        let plain = policy.derive(&parts("GET", "/products?page=2", &[]));
        let refreshed = policy.derive(&parts("GET", "/products?no-cache&page=2", &[]));
        let refreshed_valued = policy.derive(&parts("GET", "/products?page=2&no-cache=1", &[]));
        assert_eq!(plain, refreshed);
        assert_eq!(plain, refreshed_valued);
    }

    #[test]
    fn test_repeated_and_encoded_params_are_kept() {
        let policy = KeyPolicy::default();
        let key = policy.derive(&parts("GET", "/search?q=a%20b&id=2&id=1", &[]));
        assert_eq!(key, "/search|GET|id=1|id=2|q=a b");
    }

    #[test]
    fn test_method_is_part_of_the_key() {
        let policy = KeyPolicy::default();
        assert_ne!(
            policy.derive(&parts("GET", "/products", &[])),
            policy.derive(&parts("HEAD", "/products", &[]))
        );
    }

    #[test]
    fn test_vary_headers_and_state_contribute() {
        let policy = KeyPolicy::new("fresh", vec!["Accept-Language".to_owned()]);
        let en = policy.derive(&parts("GET", "/", &[("accept-language", "en")]));
        let sv = policy.derive(&parts("GET", "/", &[("accept-language", "sv")]));
        assert_ne!(en, sv);
        assert_eq!(en, "/|GET|header:accept-language=en");

        let unrelated = policy.derive(&parts("GET", "/", &[("x-trace", "1")]));
        assert_eq!(unrelated, "/|GET");

        let with_state = policy.derive_with_state(&parts("GET", "/", &[]), &[("tenant", "acme")]);
        assert_eq!(with_state, "/|GET|state:tenant=acme");
    }

    #[test]
    fn test_authorization_bypasses_cache() {
        let policy = KeyPolicy::default();
        assert!(policy.bypasses(&parts("GET", "/", &[("authorization", "Bearer x")])));
        assert!(!policy.bypasses(&parts("GET", "/", &[])));
    }

    #[test]
    fn test_detects_refresh_request() {
        let policy = KeyPolicy::new("fresh", Vec::new());
        assert!(policy.forces_refresh(&parts("GET", "/?fresh", &[])));
        assert!(!policy.forces_refresh(&parts("GET", "/?no-cache", &[])));
        assert!(!policy.forces_refresh(&parts("GET", "/", &[])));
    }
}
