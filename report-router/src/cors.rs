use crate::domain_policy::DomainPolicy;
use http::HeaderMap;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    HeaderValue, ORIGIN,
};
use url::Url;

/// Adds CORS headers to a response if the request's `Origin` host is allowed.
pub fn apply_cors_headers(
    policy: &DomainPolicy,
    request_headers: &HeaderMap,
    response_headers: &mut HeaderMap,
) {
    let Some(origin) = request_headers.get(ORIGIN) else {
        return;
    };

    let host = origin
        .to_str()
        .ok()
        .and_then(|origin| Url::parse(origin).ok())
        .and_then(|url| url.host_str().map(str::to_string));

    match host {
        Some(host) if policy.is_allowed_domain(&host) => {
            response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            response_headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, OPTIONS"),
            );
            response_headers.insert(
                ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            );
        }
        _ => tracing::info!(?origin, "Origin is not in the domain whitelist"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    fn request(origin: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static(origin));
        headers
    }

    #[test]
    fn test_allowed_origin() {
        let policy = DomainPolicy::new(["www.example.ru"], NONE);
        let mut response = HeaderMap::new();

        apply_cors_headers(&policy, &request("https://www.example.ru"), &mut response);

        assert_eq!(response[ACCESS_CONTROL_ALLOW_ORIGIN], "https://www.example.ru");
        assert_eq!(response[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(response[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
    }

    #[test]
    fn test_rejected_origins() {
        let policy = DomainPolicy::new(["www.example.ru"], NONE);

        for origin in ["https://evil.example.com", "null", "www.example.ru"] {
            let mut response = HeaderMap::new();
            apply_cors_headers(&policy, &request(origin), &mut response);
            assert!(response.is_empty(), "{origin}");
        }

        let mut response = HeaderMap::new();
        apply_cors_headers(&policy, &HeaderMap::new(), &mut response);
        assert!(response.is_empty());
    }

    #[test]
    fn test_empty_whitelist_allows_any_origin() {
        let mut response = HeaderMap::new();
        apply_cors_headers(
            &DomainPolicy::default(),
            &request("http://localhost:8080"),
            &mut response,
        );
        assert_eq!(response[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:8080");
    }
}
