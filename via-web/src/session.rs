//! Session-cookie minting (spec.md §6: "Sets session cookie (`via_session_id`,
//! HttpOnly, Path=/, 30-day expiry) if absent"), narrowed from the teacher's
//! `axum-login` + `tower-sessions` story to a single opaque id -- this
//! runtime has no authenticated identity to carry (auth is an explicit
//! non-goal, spec.md §1), only the stable id `scope::SESSION` signals key on.

use axum::http::{HeaderMap, HeaderValue};
use cookie::time::Duration as CookieDuration;
use cookie::Cookie;
use uuid::Uuid;

pub fn read_session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let parsed = Cookie::parse(pair.trim().to_string()).ok()?;
        if parsed.name() == cookie_name {
            Some(parsed.value().to_string())
        } else {
            None
        }
    })
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn set_cookie_header(cookie_name: &str, session_id: &str, max_age_days: i64) -> HeaderValue {
    let built = Cookie::build((cookie_name.to_string(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::days(max_age_days))
        .build();
    HeaderValue::from_str(&built.to_string()).expect("cookie header is always valid ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn read_session_id_finds_the_named_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("foo=bar; via_session_id=abc-123; baz=qux"));
        assert_eq!(read_session_id(&headers, "via_session_id").as_deref(), Some("abc-123"));
    }

    #[test]
    fn read_session_id_absent_returns_none() {
        let headers = HeaderMap::new();
        assert_eq!(read_session_id(&headers, "via_session_id"), None);
    }

    #[test]
    fn set_cookie_header_is_http_only_and_path_root() {
        let value = set_cookie_header("via_session_id", "abc-123", 30);
        let text = value.to_str().unwrap();
        assert!(text.contains("via_session_id=abc-123"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("Path=/"));
    }
}
