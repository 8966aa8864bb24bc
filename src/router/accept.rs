//! Accept-header content negotiation.
//!
//! A route declares the content type it produces (default `*/*`). An entry
//! qualifies for a request only when that declared type negotiates against
//! the request's `Accept` header.

/// The wildcard media type, used as the default on both sides.
pub const WILDCARD_TYPE: &str = "*/*";

/// Strip media-type parameters (`;q=0.9`, `;charset=utf-8`) and whitespace.
fn media_token(value: &str) -> &str {
    value.split(';').next().unwrap_or("").trim()
}

/// Decide whether a route's declared content type satisfies an `Accept`
/// header value.
///
/// `*/*` on either side always matches. Otherwise the header is split on
/// `,` and each candidate is compared to the declared type for an exact,
/// case-insensitive match; the first match wins. A missing or empty header
/// is treated as `*/*`.
pub fn negotiates(declared: &str, header: Option<&str>) -> bool {
    let declared = media_token(declared);
    if declared.is_empty() || declared == WILDCARD_TYPE {
        return true;
    }
    let header = match header {
        Some(h) if !h.trim().is_empty() => h,
        _ => return true,
    };
    header.split(',').any(|candidate| {
        let candidate = media_token(candidate);
        candidate == WILDCARD_TYPE || candidate.eq_ignore_ascii_case(declared)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_always_matches() {
        assert!(negotiates("*/*", Some("text/html")));
        assert!(negotiates("application/json", Some("*/*")));
    }

    #[test]
    fn test_missing_header_treated_as_wildcard() {
        assert!(negotiates("application/json", None));
        assert!(negotiates("application/json", Some("   ")));
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        assert!(negotiates("application/json", Some("Application/JSON")));
        assert!(!negotiates("application/json", Some("text/html")));
    }

    #[test]
    fn test_header_list_first_match_wins() {
        assert!(negotiates(
            "application/json",
            Some("text/html, application/json;q=0.9")
        ));
        assert!(!negotiates("application/xml", Some("text/html, text/plain")));
    }

    #[test]
    fn test_declared_parameters_ignored() {
        assert!(negotiates("application/json; charset=utf-8", Some("application/json")));
    }
}
