//! Security response headers.
//!
//! Every response, including middleware rejections, carries the same fixed
//! header set: Content-Security-Policy, HSTS, and the usual hardening headers.

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{schema::CspDirective, HeadersConfig};

/// Render CSP directives as a header value.
pub fn content_security_policy(directives: &[CspDirective]) -> String {
    directives
        .iter()
        .map(|d| {
            if d.sources.is_empty() {
                d.name.clone()
            } else {
                format!("{} {}", d.name, d.sources.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Render the Strict-Transport-Security value.
pub fn strict_transport_security(config: &HeadersConfig) -> String {
    let mut value = format!("max-age={}", config.hsts_max_age_secs);
    if config.hsts_include_subdomains {
        value.push_str("; includeSubDomains");
    }
    value
}

/// The complete header set for `config`.
pub fn security_headers(config: &HeadersConfig) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = Vec::new();

    match HeaderValue::from_str(&content_security_policy(&config.csp)) {
        Ok(value) => headers.push((header::CONTENT_SECURITY_POLICY, value)),
        Err(e) => tracing::error!(error = %e, "Content-Security-Policy is not a valid header value"),
    }
    match HeaderValue::from_str(&strict_transport_security(config)) {
        Ok(value) => headers.push((header::STRICT_TRANSPORT_SECURITY, value)),
        Err(e) => tracing::error!(error = %e, "Strict-Transport-Security is not a valid header value"),
    }

    let fixed: [(&'static str, &'static str); 10] = [
        ("cross-origin-opener-policy", "same-origin"),
        ("cross-origin-resource-policy", "same-origin"),
        ("origin-agent-cluster", "?1"),
        ("referrer-policy", "no-referrer"),
        ("x-content-type-options", "nosniff"),
        ("x-dns-prefetch-control", "off"),
        ("x-download-options", "noopen"),
        ("x-frame-options", "SAMEORIGIN"),
        ("x-permitted-cross-domain-policies", "none"),
        ("x-xss-protection", "0"),
    ];
    headers.extend(
        fixed
            .into_iter()
            .map(|(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value))),
    );

    headers
}

/// Wrap `router` so every response carries the security headers.
pub fn apply_security_headers(router: Router, config: &HeadersConfig) -> Router {
    if !config.enabled {
        return router;
    }
    security_headers(config)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name, value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_csp_matches_site_policy() {
        let csp = content_security_policy(&HeadersConfig::default().csp);
        assert!(csp.starts_with("default-src 'self';script-src 'self' https://unpkg.com"));
        assert!(csp.contains("img-src 'self' data:"));
        assert!(csp.contains("object-src 'none'"));
        assert!(csp.ends_with(";upgrade-insecure-requests"));
    }

    #[test]
    fn hsts_is_one_year() {
        assert_eq!(
            strict_transport_security(&HeadersConfig::default()),
            "max-age=31536000; includeSubDomains"
        );
    }

    #[test]
    fn header_set_is_complete() {
        let headers = security_headers(&HeadersConfig::default());
        assert_eq!(headers.len(), 12);
        assert!(headers.iter().any(|(n, _)| *n == header::CONTENT_SECURITY_POLICY));
        assert!(headers
            .iter()
            .any(|(n, v)| n == "x-frame-options" && v == "SAMEORIGIN"));
    }
}
